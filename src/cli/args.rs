use clap::{Parser, ValueEnum};

use crate::config::defs::{DEFAULT_POSITION_BATCH_SIZE, DEFAULT_SAMPLE_BATCH_SIZE};

/// Execution environment for the generated scripts.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Local,
    Pbs,
    Grid,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Pbs => "pbs",
            Backend::Grid => "grid",
        }
    }
}

/// Study genotype format used for phasing.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum StudyDataType {
    /// Binary plink files (bed, bim, fam)
    #[default]
    Bed,
    /// Text plink files (ped, map)
    Ped,
}

impl StudyDataType {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            StudyDataType::Bed => &["bed", "bim", "fam"],
            StudyDataType::Ped => &["ped", "map"],
        }
    }

    /// Value the phasing workflow expects in its `studyDataType` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyDataType::Bed => "BED",
            StudyDataType::Ped => "PED",
        }
    }
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "imputation-pipelines", version, about = "Generate and submit liftover, phasing and imputation workflows")]
pub struct Arguments {

    #[arg(short = 'v', long = "verbose", action)]
    pub verbose: bool,

    #[arg(long, help = "Installation directory for imputation tools. Default: <cwd>/tools")]
    pub tools_dir: Option<String>,

    #[arg(long, help = "Installation directory for reference panels. Default: <cwd>/resources/imputationReference")]
    pub reference_dir: Option<String>,

    #[arg(long, help = "List all reference panels, downloaded or available for download")]
    pub list: bool,

    #[arg(long, help = "Download and install all imputation tools")]
    pub dl_tools: bool,

    #[arg(long, help = "Download and install a reference panel")]
    pub dl_reference: Option<String>,

    #[arg(long, help = "Action to perform: liftover, phase, impute")]
    pub action: Option<String>,

    #[arg(long, help = "Directory of the study panel")]
    pub study: Option<String>,

    #[arg(long, help = "Directory where results are stored")]
    pub output: Option<String>,

    #[arg(long, help = "Name of the imputation reference panel")]
    pub reference: Option<String>,

    #[arg(long, default_value = "local", value_enum)]
    pub backend: Backend,

    #[arg(long = "study-data-type", default_value = "bed", value_enum)]
    pub study_data_type: StudyDataType,

    #[arg(long, default_value = " ", allow_hyphen_values = true, help = "Extra command line arguments passed to shapeit")]
    pub additional_shapeit_parameters: String,

    #[arg(long, default_value = " ", allow_hyphen_values = true, help = "Extra command line arguments passed to impute2")]
    pub additional_impute2_parameters: String,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_BATCH_SIZE, value_parser = clap::value_parser!(u64).range(1..),
        help = "Minimum number of samples in imputation batches")]
    pub sample_batch_size: u64,

    #[arg(long, default_value_t = DEFAULT_POSITION_BATCH_SIZE, value_parser = clap::value_parser!(u64).range(1..),
        help = "Size of the chromosomal region of each imputation batch")]
    pub position_batch_size: u64,

    #[clap(
        long,
        value_delimiter = ',',
        help = "Comma-separated subset of chromosomes to impute (e.g., 1,2,X)"
    )]
    pub chromosomes: Vec<String>,

    #[arg(long, default_value_t = false, help = "Generate scripts without submitting them")]
    pub no_submit: bool,

    #[clap(long, help = "Optional fixed seed for the run identifier; defaults to OS entropy")]
    pub seed: Option<u64>,
}
