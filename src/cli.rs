//! Command line arguments for the `gender-predictor` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use gender_predictor::CsvFormat;

/// Predict gender from first names with a Naive Bayes classifier
#[derive(Parser, Debug, Clone)]
#[command(name = "gender-predictor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct PredictorArgs {
    /// Verbosity level (repeat for more output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl PredictorArgs {
    /// 0 = quiet, 1 = default, 2 = verbose, 3+ = debug.
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose.saturating_add(1)
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a model from a CSV file and save it
    Train(TrainArgs),

    /// Classify names given as arguments, or interactively
    Classify(ClassifyArgs),

    /// Show model statistics and the most informative features
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path of the model artifact
    #[arg(
        short,
        long,
        env = "GENDER_PREDICTOR_MODEL",
        default_value = "model.msgpack"
    )]
    pub model: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Training CSV
    #[arg(short, long)]
    pub data: PathBuf,

    /// CSV layout
    #[arg(short, long, value_enum, default_value_t = DataFormat::Counts)]
    pub format: DataFormat,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Fraction of each label held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    pub test_ratio: f64,

    /// Seed for the train/test shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reject examples whose label is not in this list
    #[arg(long, value_delimiter = ',')]
    pub labels: Option<Vec<String>>,

    /// Count features on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Number of informative features to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Names to classify; reads from stdin when empty
    pub names: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of informative features to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// name,male_count,female_count
    Counts,
    /// name,label
    Labeled,
}

impl From<DataFormat> for CsvFormat {
    fn from(format: DataFormat) -> Self {
        match format {
            DataFormat::Counts => CsvFormat::Counts,
            DataFormat::Labeled => CsvFormat::Labeled,
        }
    }
}
