use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use lazy_static::lazy_static;
use thiserror::Error;

use crate::cli::Arguments;
use crate::utils::chromosome::MatchError;

// External software
pub const SH_TAG: &str = "sh";
pub const TAR_TAG: &str = "tar";
pub const UNZIP_TAG: &str = "unzip";
pub const MAKE_TAG: &str = "make";
pub const CHMOD_TAG: &str = "chmod";
pub const GPP_TAG: &str = "g++";
pub const JAVA_TAG: &str = "java";
pub const WGET_TAG: &str = "wget";
pub const CURL_TAG: &str = "curl";
pub const VCFTOOLS_TAG: &str = "vcftools";

/// Tools that must be on PATH before anything is downloaded.
pub const INSTALL_PREREQUISITES: &[&str] = &[TAR_TAG, UNZIP_TAG, GPP_TAG, JAVA_TAG];

// Templates
pub const CHROMOSOME_PLACEHOLDER: &str = "%(chromosome)s";
pub const DEFAULT_CHROMOSOME_TEMPLATE: &str = "chr%(chromosome)s";
pub const VCF_GZ_EXT: &str = "vcf.gz";
pub const HAPS_GZ_EXT: &str = "haps.gz";
pub const LEGEND_GZ_EXT: &str = "legend.gz";

// Static paths, relative to the working directory unless overridden
pub const TOOLS_DIR: &str = "tools";
pub const REFERENCE_DIR: &str = "resources/imputationReference";
pub const GENETIC_MAP_TEMPLATE: &str = "resources/genetic_map/genetic_map_chr%(chromosome)s_combined_b37.txt";
pub const HG18_TO_HG19_CHAIN: &str = "resources/liftover/hg18ToHg19.over.chain";
pub const MOLGENIS_COMPUTE_SH: &str = "molgenis-compute/molgenis-compute-core-0.0.1-SNAPSHOT/molgenis_compute.sh";
pub const GENERATED_DIR: &str = "generated";
pub const SUBMIT_SCRIPT: &str = "submit.sh";

// Static parameters
pub const DEFAULT_SAMPLE_BATCH_SIZE: u64 = 500;
pub const DEFAULT_POSITION_BATCH_SIZE: u64 = 5_000_000;
pub const HAPS_LEADING_FIELDS: usize = 5;

lazy_static! {
    /// Chromosome lengths of the GRCh37 build.
    pub static ref CHROMOSOME_LENGTHS_B37: HashMap<&'static str, u64> = {
        let mut m = HashMap::new();
        m.insert("1", 249_250_621);
        m.insert("2", 243_199_373);
        m.insert("3", 198_022_430);
        m.insert("4", 191_154_276);
        m.insert("5", 180_915_260);
        m.insert("6", 171_115_067);
        m.insert("7", 159_138_663);
        m.insert("8", 146_364_022);
        m.insert("9", 141_213_431);
        m.insert("10", 135_534_747);
        m.insert("11", 134_996_516);
        m.insert("12", 133_851_895);
        m.insert("13", 115_169_878);
        m.insert("14", 107_349_540);
        m.insert("15", 102_531_392);
        m.insert("16", 90_354_753);
        m.insert("17", 81_195_210);
        m.insert("18", 78_077_248);
        m.insert("19", 59_128_983);
        m.insert("20", 63_025_520);
        m.insert("21", 48_129_895);
        m.insert("22", 51_304_566);
        m.insert("X", 155_270_560);
        m.insert("Y", 59_373_566);
        m
    };
}

/// Workflow stages known to the workflow generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Liftover,
    Phase,
    Impute,
}

impl Pipeline {
    pub fn name(&self) -> &'static str {
        match self {
            Pipeline::Liftover => "liftover",
            Pipeline::Phase => "phase",
            Pipeline::Impute => "impute",
        }
    }

    /// Workflow definition directory, relative to the tools directory.
    pub fn workflow_dir(&self) -> &'static str {
        match self {
            Pipeline::Liftover => "molgenis-pipelines-master/compute5/Liftover_genome_build_PEDMAP",
            Pipeline::Phase => "molgenis-pipelines-master/compute5/Imputation_shapeit_phasing",
            Pipeline::Impute => "molgenis-pipelines-master/compute5/Imputation_impute2",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pipeline {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "liftover" => Ok(Pipeline::Liftover),
            "phase" => Ok(Pipeline::Phase),
            "impute" => Ok(Pipeline::Impute),
            other => Err(PipelineError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStep {
    CdTargetDirectory,
    CdToolDirectory,
    CdWorkingDirectory,
    Mkdir,
    Download,
    DownloadInDirectory,
    Untar,
    UntarInDirectory,
    Unzip,
    Move,
    MakeExecutableInDirectory,
    Make,
    CheckFileExists,
}

impl fmt::Display for InstallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStep::CdTargetDirectory => "cd_target_directory",
            InstallStep::CdToolDirectory => "cd_tools_directory",
            InstallStep::CdWorkingDirectory => "cd_current_working_directory",
            InstallStep::Mkdir => "mkdir",
            InstallStep::Download => "download",
            InstallStep::DownloadInDirectory => "download_in_directory",
            InstallStep::Untar => "untar",
            InstallStep::UntarInDirectory => "untar_in_directory",
            InstallStep::Unzip => "unzip",
            InstallStep::Move => "mv",
            InstallStep::MakeExecutableInDirectory => "make_executable_in_directory",
            InstallStep::Make => "make",
            InstallStep::CheckFileExists => "check_if_file_exists",
        };
        f.write_str(name)
    }
}

/// A downloadable tool or dataset and the steps that install it.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub link: &'static str,
    pub file: &'static str,
    pub dir: Option<&'static str>,
    pub install_steps: &'static [InstallStep],
}

use InstallStep::*;

pub const IMPUTATION_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "prerequisites",
        link: "http://molgenis26.target.rug.nl/downloads/molgenis-impute-files.tgz",
        file: "molgenis-impute-files.tgz",
        dir: None,
        install_steps: &[Download, Untar],
    },
    ToolSpec {
        name: "molgenis-pipelines",
        link: "https://github.com/kantale/molgenis-pipelines/archive/master.zip",
        file: "molgenis-pipelines.zip",
        dir: Some("molgenis-pipelines-master"),
        install_steps: &[CdTargetDirectory, Download, Unzip, CdWorkingDirectory],
    },
    ToolSpec {
        name: "shapeit",
        link: "http://www.shapeit.fr/script/get.php?id=18",
        file: "shapeit.v2.r644.linux.x86_64.tgz",
        dir: Some("Shapeit-v2.644"),
        install_steps: &[CdTargetDirectory, Mkdir, DownloadInDirectory, UntarInDirectory, CdWorkingDirectory],
    },
    ToolSpec {
        name: "impute2",
        link: "http://mathgen.stats.ox.ac.uk/impute/impute_v2.3.0_x86_64_static.tgz",
        file: "impute_v2.3.0_x86_64_static.tgz",
        dir: Some("impute_v2.3.0_x86_64_static"),
        install_steps: &[CdTargetDirectory, Download, Untar, Move, CdWorkingDirectory],
    },
    ToolSpec {
        name: "liftover",
        link: "http://hgdownload.cse.ucsc.edu/admin/exe/linux.x86_64/liftOver",
        file: "liftOver",
        dir: Some("liftOverUcsc-20120905"),
        install_steps: &[CdTargetDirectory, Mkdir, DownloadInDirectory, MakeExecutableInDirectory, CdWorkingDirectory],
    },
    ToolSpec {
        name: "plink",
        link: "http://pngu.mgh.harvard.edu/~purcell/plink/dist/plink-1.07-x86_64.zip",
        file: "plink-1.07-x86_64.zip",
        dir: Some("plink-1.07-x86_64"),
        install_steps: &[CdTargetDirectory, Download, Unzip, Move, CdWorkingDirectory],
    },
    ToolSpec {
        name: VCFTOOLS_TAG,
        link: "http://downloads.sourceforge.net/project/vcftools/vcftools_0.1.11.tar.gz",
        file: "vcftools_0.1.11.tar.gz",
        dir: Some("vcftools_0.1.11"),
        install_steps: &[CdTargetDirectory, Download, Untar, Make, Move, CdWorkingDirectory],
    },
    ToolSpec {
        name: "genotype-aligner",
        link: "http://www.molgenis.org/jenkins/job/systemsgenetics/nl.systemsgenetics%24genotype-aligner/lastBuild/artifact/nl.systemsgenetics/genotype-aligner/1.1.0/genotype-aligner-1.1.1-jar-with-dependencies.jar",
        file: "GenotypeAligner.jar",
        dir: Some("genotype_aligner/GenotypeAligner-1.1.1"),
        install_steps: &[CdTargetDirectory, CdToolDirectory, CheckFileExists, CdWorkingDirectory],
    },
];

/// Statically declared reference panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub link: &'static str,
    pub file: &'static str,
    pub vcf_template: &'static str,
    pub haps_template: &'static str,
    pub legend_template: &'static str,
}

pub const PANEL_INSTALL_STEPS: &[InstallStep] =
    &[CdTargetDirectory, Mkdir, DownloadInDirectory, UntarInDirectory, CdWorkingDirectory];

pub const BUILTIN_PANELS: &[PanelSpec] = &[
    PanelSpec {
        name: "GIANT.phase1_release_v3.20101123",
        description: "Reduced GIANT all population panel (monomorphic and singleton sites, 1092 individuals).\n\
            Source: http://genome.sph.umich.edu/wiki/Minimac:_1000_Genomes_Imputation_Cookbook",
        link: "ftp://share.sph.umich.edu/1000genomes/fullProject/2012.03.14/GIANT.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.vcf.gz.tgz",
        file: "GIANT.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.vcf.gz.tgz",
        vcf_template: "chr%(chromosome)s.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.vcf.gz",
        haps_template: "chr%(chromosome)s.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.haps.gz",
        legend_template: "chr%(chromosome)s.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.legend.gz",
    },
    PanelSpec {
        name: "GIANT.metabo.phase1_release_v3.20101123",
        description: "Metabochip specific reference panel, focused on the well-imputable fine-mapping regions.\n\
            Source: http://genome.sph.umich.edu/wiki/Minimac:_1000_Genomes_Imputation_Cookbook",
        link: "ftp://share.sph.umich.edu/1000genomes/fullProject/2012.03.14/GIANT.metabo.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.vcf.gz.tgz",
        file: "GIANT.metabo.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.vcf.gz.tgz",
        vcf_template: "chr%(chromosome)s.metabo.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.vcf.gz",
        haps_template: "chr%(chromosome)s.metabo.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.haps.gz",
        legend_template: "chr%(chromosome)s.metabo.phase1_release_v3.20101123.snps_indels_svs.genotypes.refpanel.ALL.legend.gz",
    },
];


pub struct RunConfig {
    pub cwd: PathBuf,
    pub tools_dir: PathBuf,
    pub reference_dir: PathBuf,
    pub run_id: String,
    pub args: Arguments,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown action: {0}. Valid actions are: liftover, phase, impute")]
    UnknownAction(String),

    #[error("Unknown reference panel: {name}. Available panels: {}", .available.join(", "))]
    UnknownReferencePanel { name: String, available: Vec<String> },

    #[error("Could not find tool: {0}. Install and retry")]
    MissingTool(String),

    #[error("Could not find any of the download tools: {}", .0.join(", "))]
    NoDownloader(Vec<String>),

    #[error("Problem while running {tool}: {error}")]
    ToolExecution { tool: String, error: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Reference panel {name} is not installed properly: {reason}")]
    ReferencePanel { name: String, reason: String },

    #[error("Chromosome file discovery failed: {0}")]
    ChromosomeFiles(#[from] MatchError),

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
}
