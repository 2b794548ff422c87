// src/utils/reference.rs: reference panel registry

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::defs::{
    InstallStep, PanelSpec, PipelineError, BUILTIN_PANELS, CHROMOSOME_PLACEHOLDER, DEFAULT_CHROMOSOME_TEMPLATE,
    HAPS_GZ_EXT, IMPUTATION_TOOLS, LEGEND_GZ_EXT, PANEL_INSTALL_STEPS, VCFTOOLS_TAG, VCF_GZ_EXT,
};
use crate::utils::chromosome::{fill_template, get_chromosome_files, Chromosome};
use crate::utils::command::{execute, ShellCommand};
use crate::utils::file::{gzip_file, mkdir};
use crate::utils::install::{install, InstallParams};

/// A reference panel and where its per-chromosome files live.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePanel {
    pub name: String,
    pub description: String,
    /// Download link and archive, absent for custom panels.
    pub link: Option<String>,
    pub file: Option<String>,
    /// Directory under the reference directory.
    pub dir: String,
    pub vcf_template: String,
    pub haps_template: Option<String>,
    pub legend_template: Option<String>,
    pub install_steps: Vec<InstallStep>,
}

impl From<&PanelSpec> for ReferencePanel {
    fn from(spec: &PanelSpec) -> Self {
        ReferencePanel {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            link: Some(spec.link.to_string()),
            file: Some(spec.file.to_string()),
            dir: spec.name.to_string(),
            vcf_template: spec.vcf_template.to_string(),
            haps_template: Some(spec.haps_template.to_string()),
            legend_template: Some(spec.legend_template.to_string()),
            install_steps: PANEL_INSTALL_STEPS.to_vec(),
        }
    }
}

fn derived_template(vcf_template: &str, ext: &str) -> String {
    vcf_template.replace(VCF_GZ_EXT, ext)
}

fn has_placeholder(template: &Option<String>) -> bool {
    template.as_deref().is_some_and(|t| t.contains(CHROMOSOME_PLACEHOLDER))
}

impl ReferencePanel {
    /// Panel discovered on disk from its vcf.gz stem.
    pub fn custom(name: &str, reference_dir: &Path, vcf_template: &str) -> Self {
        ReferencePanel {
            name: name.to_string(),
            description: format!("Custom panel added from {}", reference_dir.display()),
            link: None,
            file: None,
            dir: name.to_string(),
            vcf_template: vcf_template.to_string(),
            haps_template: Some(derived_template(vcf_template, HAPS_GZ_EXT)),
            legend_template: Some(derived_template(vcf_template, LEGEND_GZ_EXT)),
            install_steps: Vec::new(),
        }
    }

    pub fn vcf_path(&self, reference_dir: &Path, chromosome: &Chromosome) -> PathBuf {
        reference_dir.join(&self.dir).join(fill_template(&self.vcf_template, chromosome))
    }

    pub fn haps_path(&self, reference_dir: &Path, chromosome: &Chromosome) -> PathBuf {
        let template = self
            .haps_template
            .clone()
            .unwrap_or_else(|| derived_template(&self.vcf_template, HAPS_GZ_EXT));
        reference_dir.join(&self.dir).join(fill_template(&template, chromosome))
    }

    pub fn legend_path(&self, reference_dir: &Path, chromosome: &Chromosome) -> PathBuf {
        let template = self
            .legend_template
            .clone()
            .unwrap_or_else(|| derived_template(&self.vcf_template, LEGEND_GZ_EXT));
        reference_dir.join(&self.dir).join(fill_template(&template, chromosome))
    }
}

/// Known reference panels, built once per run and handed to whoever needs them.
#[derive(Debug, Clone)]
pub struct ReferenceRegistry {
    reference_dir: PathBuf,
    panels: BTreeMap<String, ReferencePanel>,
}

impl ReferenceRegistry {
    pub fn new(reference_dir: &Path) -> Self {
        let panels = BUILTIN_PANELS
            .iter()
            .map(|spec| (spec.name.to_string(), ReferencePanel::from(spec)))
            .collect();
        ReferenceRegistry {
            reference_dir: reference_dir.to_path_buf(),
            panels,
        }
    }

    pub fn reference_dir(&self) -> &Path {
        &self.reference_dir
    }

    pub fn names(&self) -> Vec<String> {
        self.panels.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&ReferencePanel, PipelineError> {
        self.panels.get(name).ok_or_else(|| PipelineError::UnknownReferencePanel {
            name: name.to_string(),
            available: self.names(),
        })
    }

    pub fn insert(&mut self, panel: ReferencePanel) {
        self.panels.insert(panel.name.clone(), panel);
    }

    /// Human readable listing of all panels.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for panel in self.panels.values() {
            out.push_str(&format!("name: {}\ndescription:\n{}\n{}\n", panel.name, panel.description, "*".repeat(30)));
        }
        out
    }

    /// Adds every unknown directory under the reference directory that holds a consistent set of
    /// per-chromosome vcf.gz files.
    ///
    /// # Returns
    /// Names of the panels added.
    pub fn add_custom_panels(&mut self) -> Result<Vec<String>, PipelineError> {
        let entries = match fs::read_dir(&self.reference_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dirs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut added = Vec::new();
        for dir in dirs {
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if self.panels.contains_key(&name) {
                continue;
            }
            match get_chromosome_files(&dir.join(format!("*.{}", VCF_GZ_EXT)), DEFAULT_CHROMOSOME_TEMPLATE) {
                Ok(found) => {
                    info!("Adding custom reference: {}", name);
                    self.insert(ReferencePanel::custom(&name, &self.reference_dir, &found.stem));
                    added.push(name);
                }
                Err(e) => warn!("Could not find usable *.{} files in {}: {}", VCF_GZ_EXT, dir.display(), e),
            }
        }
        Ok(added)
    }

    /// Downloads and unpacks a panel, then checks the installation.
    pub async fn install_panel(
        &mut self,
        name: &str,
        tools_dir: &Path,
        working_dir: &Path,
    ) -> Result<Vec<Chromosome>, PipelineError> {
        let panel = self.get(name)?.clone();
        let (Some(link), Some(file)) = (panel.link.clone(), panel.file.clone()) else {
            return Err(PipelineError::InvalidConfig(format!("Reference panel {} has no download link", name)));
        };

        let params = InstallParams {
            target_dir: self.reference_dir.clone(),
            tool_dir: Some(panel.dir.clone()),
            filename: file,
            link,
            working_dir: working_dir.to_path_buf(),
        };
        mkdir(&self.reference_dir, true)?;
        install(&panel.install_steps, &params).await?;

        self.check_installation(name, tools_dir).await
    }

    /// Makes sure every chromosome of a panel has vcf.gz, haps.gz and legend.gz files,
    /// converting the vcf when the others are missing.
    ///
    /// # Returns
    /// Chromosomes available in the panel.
    pub async fn check_installation(
        &mut self,
        name: &str,
        tools_dir: &Path,
    ) -> Result<Vec<Chromosome>, PipelineError> {
        let mut panel = self.get(name)?.clone();
        if !panel.vcf_template.contains(CHROMOSOME_PLACEHOLDER) {
            return Err(PipelineError::ReferencePanel {
                name: name.to_string(),
                reason: format!("{} does not have a '{}' part", panel.vcf_template, CHROMOSOME_PLACEHOLDER),
            });
        }

        let panel_dir = self.reference_dir.join(&panel.dir);
        let pattern = panel_dir.join(panel.vcf_template.replace(CHROMOSOME_PLACEHOLDER, "*"));
        let found = get_chromosome_files(&pattern, DEFAULT_CHROMOSOME_TEMPLATE).map_err(|e| {
            PipelineError::ReferencePanel {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        let templated = has_placeholder(&panel.haps_template) && has_placeholder(&panel.legend_template);
        let to_convert: Vec<Chromosome> = if templated {
            found
                .chromosomes
                .iter()
                .filter(|c| {
                    !panel.haps_path(&self.reference_dir, c).is_file()
                        || !panel.legend_path(&self.reference_dir, c).is_file()
                })
                .cloned()
                .collect()
        } else {
            panel.haps_template = Some(derived_template(&panel.vcf_template, HAPS_GZ_EXT));
            panel.legend_template = Some(derived_template(&panel.vcf_template, LEGEND_GZ_EXT));
            found.chromosomes.clone()
        };

        for chromosome in &to_convert {
            info!(
                "Converting: {} to hap and legend",
                panel.vcf_path(&self.reference_dir, chromosome).display()
            );
            convert_vcf_to_impute2(&panel, &self.reference_dir, tools_dir, chromosome).await?;
        }

        self.insert(panel);
        Ok(found.chromosomes)
    }
}

/// Path of the vcftools binary inside the tools directory.
pub fn vcftools_path(tools_dir: &Path) -> PathBuf {
    let dir = IMPUTATION_TOOLS
        .iter()
        .find(|t| t.name == VCFTOOLS_TAG)
        .and_then(|t| t.dir)
        .unwrap_or(VCFTOOLS_TAG);
    tools_dir.join(dir).join("bin").join(VCFTOOLS_TAG)
}

/// Produces the IMPUTE2 haps.gz and legend.gz files of one chromosome from its vcf.gz.
pub async fn convert_vcf_to_impute2(
    panel: &ReferencePanel,
    reference_dir: &Path,
    tools_dir: &Path,
    chromosome: &Chromosome,
) -> Result<(), PipelineError> {
    let vcf = panel.vcf_path(reference_dir, chromosome);
    let out_prefix = format!("{}.pyp", vcf.display());

    let cmd = ShellCommand::new(vcftools_path(tools_dir).to_string_lossy().into_owned())
        .arg("--gzvcf")
        .arg(vcf.to_string_lossy().into_owned())
        .arg("--IMPUTE")
        .arg("--out")
        .arg(out_prefix.as_str())
        .must_succeed();
    execute(&cmd).await?;

    let outputs = [
        (format!("{}.impute.hap", out_prefix), panel.haps_path(reference_dir, chromosome)),
        (format!("{}.impute.legend", out_prefix), panel.legend_path(reference_dir, chromosome)),
    ];
    for (produced, target) in outputs {
        let produced = PathBuf::from(produced);
        if !produced.is_file() {
            return Err(PipelineError::FileNotFound(produced));
        }
        gzip_file(&produced, &target)?;
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    const GIANT: &str = "GIANT.phase1_release_v3.20101123";

    fn touch(dir: &Path, names: &[String]) -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        for name in names {
            File::create(dir.join(name))?;
        }
        Ok(())
    }

    #[test]
    fn test_builtin_panels() {
        let registry = ReferenceRegistry::new(Path::new("/ref"));
        assert_eq!(registry.names().len(), 2);
        let panel = registry.get(GIANT).unwrap();
        let chr1: Chromosome = "1".parse().unwrap();
        assert_eq!(
            panel.haps_path(registry.reference_dir(), &chr1),
            PathBuf::from(format!(
                "/ref/{}/chr1.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.haps.gz",
                GIANT
            ))
        );
        assert!(registry.listing().contains("name: GIANT.metabo.phase1_release_v3.20101123"));
    }

    #[test]
    fn test_unknown_panel_lists_options() {
        let registry = ReferenceRegistry::new(Path::new("/ref"));
        match registry.get("hapmap") {
            Err(PipelineError::UnknownReferencePanel { name, available }) => {
                assert_eq!(name, "hapmap");
                assert!(available.contains(&GIANT.to_string()));
            }
            other => panic!("Expected unknown panel error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_panel_discovery() -> anyhow::Result<()> {
        let reference = tempdir()?;
        touch(
            &reference.path().join("hrc"),
            &["chr20.hrc.vcf.gz".to_string(), "chr21.hrc.vcf.gz".to_string()],
        )?;
        touch(&reference.path().join("empty"), &[])?;
        touch(&reference.path().join(GIANT), &["chr1.other.vcf.gz".to_string()])?;

        let mut registry = ReferenceRegistry::new(reference.path());
        let added = registry.add_custom_panels()?;
        assert_eq!(added, vec!["hrc".to_string()]);

        let panel = registry.get("hrc")?;
        assert_eq!(panel.vcf_template, "chr%(chromosome)s.hrc.vcf.gz");
        assert_eq!(panel.haps_template.as_deref(), Some("chr%(chromosome)s.hrc.haps.gz"));
        assert_eq!(panel.legend_template.as_deref(), Some("chr%(chromosome)s.hrc.legend.gz"));
        assert!(panel.link.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_check_complete_installation() -> anyhow::Result<()> {
        let reference = tempdir()?;
        let tools = tempdir()?;
        let files: Vec<String> = ["1", "X"]
            .iter()
            .flat_map(|c| {
                ["vcf.gz", "haps.gz", "legend.gz"].into_iter().map(move |ext| format!("chr{}.hrc.{}", c, ext))
            })
            .collect();
        touch(&reference.path().join("hrc"), &files)?;

        let mut registry = ReferenceRegistry::new(reference.path());
        registry.add_custom_panels()?;
        let chromosomes = registry.check_installation("hrc", tools.path()).await?;
        let names: Vec<&str> = chromosomes.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["1", "X"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_check_missing_panel_files() -> anyhow::Result<()> {
        let reference = tempdir()?;
        let tools = tempdir()?;
        let mut registry = ReferenceRegistry::new(reference.path());
        let err = registry.check_installation(GIANT, tools.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ReferencePanel { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_converter_is_fatal() -> anyhow::Result<()> {
        let reference = tempdir()?;
        let tools = tempdir()?;
        touch(&reference.path().join("hrc"), &["chr2.hrc.vcf.gz".to_string()])?;

        let mut registry = ReferenceRegistry::new(reference.path());
        registry.add_custom_panels()?;
        // haps/legend are missing and vcftools is not installed under the tools directory
        assert!(registry.check_installation("hrc", tools.path()).await.is_err());
        Ok(())
    }

    #[test]
    fn test_vcftools_path() {
        assert_eq!(
            vcftools_path(Path::new("/tools")),
            PathBuf::from("/tools/vcftools_0.1.11/bin/vcftools")
        );
    }
}
