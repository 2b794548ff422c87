// src/utils/chromosome.rs: chromosome identifiers and per-chromosome file discovery

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use crate::config::defs::{CHROMOSOME_LENGTHS_B37, CHROMOSOME_PLACEHOLDER};
use crate::utils::file::glob_files;

/// One of the chromosomes 1-22, X or Y.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chromosome(String);

impl Chromosome {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in the GRCh37 build.
    pub fn length_b37(&self) -> u64 {
        CHROMOSOME_LENGTHS_B37
            .get(self.0.as_str())
            .copied()
            .unwrap_or_default()
    }

    pub fn all() -> Vec<Chromosome> {
        (1..=22)
            .map(|n| Chromosome(n.to_string()))
            .chain(["X", "Y"].into_iter().map(|c| Chromosome(c.to_string())))
            .collect()
    }
}

impl FromStr for Chromosome {
    type Err = String;

    // Nominal comparison: "07" or "23" are not chromosomes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if CHROMOSOME_LENGTHS_B37.contains_key(s) {
            Ok(Chromosome(s.to_string()))
        } else {
            Err(format!("Cannot recognize chromosome: {}", s))
        }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Substitutes the chromosome placeholder of a template.
pub fn fill_template(template: &str, chromosome: &Chromosome) -> String {
    template.replace(CHROMOSOME_PLACEHOLDER, chromosome.as_str())
}

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("path {0} is empty")]
    NoFiles(String),

    #[error("could not read {pattern}: {reason}")]
    Unreadable { pattern: String, reason: String },

    #[error("could not find chromosome identifier '%(chromosome)s' in template {0}")]
    MissingPlaceholder(String),

    #[error("do not know which of these two files is the proper file for chromosome {chromosome}: {first}, {second}")]
    Ambiguous {
        chromosome: String,
        first: String,
        second: String,
    },

    #[error("the '{template}' part should be in the same position for all the files. These are not the same: {}", .stems.join(", "))]
    InconsistentStems { template: String, stems: Vec<String> },

    #[error("could not find {template} in any file in path {pattern}")]
    NoChromosomes { template: String, pattern: String },
}

/// A set of per-chromosome files sharing one naming stem.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromosomeFiles {
    pub dir: PathBuf,
    pub stem: String,
    pub chromosomes: Vec<Chromosome>,
}

impl ChromosomeFiles {
    pub fn file_name(&self, chromosome: &Chromosome) -> String {
        fill_template(&self.stem, chromosome)
    }

    pub fn path(&self, chromosome: &Chromosome) -> PathBuf {
        self.dir.join(self.file_name(chromosome))
    }

    pub fn contains(&self, chromosome: &Chromosome) -> bool {
        self.chromosomes.contains(chromosome)
    }
}

/// Discovers per-chromosome files.
///
/// # Arguments
///
/// * `pattern` - Glob of candidate files, wildcards allowed in the file name only (e.g. `study/*.ped`).
/// * `template` - File name fragment holding the chromosome placeholder (e.g. `chr%(chromosome)s`).
///
/// # Returns
/// The shared stem (template applied to the file name) and the chromosomes found, in order of discovery.
pub fn get_chromosome_files(pattern: &Path, template: &str) -> Result<ChromosomeFiles, MatchError> {
    let pattern_str = pattern.to_string_lossy().into_owned();
    let files = glob_files(pattern).map_err(|e| MatchError::Unreadable {
        pattern: pattern_str.clone(),
        reason: e.to_string(),
    })?;
    if files.is_empty() {
        return Err(MatchError::NoFiles(pattern_str));
    }

    let (prefix, suffix) = template
        .split_once(CHROMOSOME_PLACEHOLDER)
        .ok_or_else(|| MatchError::MissingPlaceholder(template.to_string()))?;
    let chromosome_re = Regex::new(&format!(
        r"{}(\d+|X|Y){}",
        regex::escape(prefix),
        regex::escape(suffix)
    ))
    .map_err(|_| MatchError::MissingPlaceholder(template.to_string()))?;

    let mut claimed: HashMap<Chromosome, String> = HashMap::new();
    let mut chromosomes = Vec::new();
    let mut stems: Vec<String> = Vec::new();

    for file in &files {
        let file_name = match file.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let Some(caps) = chromosome_re.captures(&file_name) else {
            debug!("No chromosome identifier in {}", file_name);
            continue;
        };
        let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let chromosome = match token.as_str().parse::<Chromosome>() {
            Ok(c) => c,
            Err(_) => {
                warn!("Ignoring file: {} . Cannot recognize chromosome: {}", file_name, token.as_str());
                continue;
            }
        };

        if let Some(first) = claimed.get(&chromosome) {
            return Err(MatchError::Ambiguous {
                chromosome: chromosome.to_string(),
                first: first.clone(),
                second: file_name,
            });
        }

        let stem = format!("{}{}{}", &file_name[..whole.start()], template, &file_name[whole.end()..]);
        if !stems.contains(&stem) {
            stems.push(stem);
        }
        claimed.insert(chromosome.clone(), file_name);
        chromosomes.push(chromosome);
    }

    if stems.len() > 1 {
        return Err(MatchError::InconsistentStems {
            template: template.to_string(),
            stems,
        });
    }

    match stems.pop() {
        Some(stem) => Ok(ChromosomeFiles {
            dir: pattern.parent().map(Path::to_path_buf).unwrap_or_default(),
            stem,
            chromosomes,
        }),
        None => Err(MatchError::NoChromosomes {
            template: template.to_string(),
            pattern: pattern_str,
        }),
    }
}
