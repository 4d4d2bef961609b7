//! Error types shared by every stage of the predictor.

use thiserror::Error;

/// Everything that can go wrong while extracting, training, classifying or
/// moving a model in and out of storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PredictorError {
    /// Empty or whitespace-only text handed to the feature extractor.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `train` was called without a single example.
    #[error("cannot train on an empty example set")]
    EmptyTrainingSet,

    /// Strict training saw a label outside the expected set.
    #[error("unknown label {label:?}, expected one of {expected:?}")]
    UnknownLabel { label: String, expected: Vec<String> },

    /// The classifier has seen zero training examples.
    #[error("classifier has not been trained")]
    UntrainedModel,

    /// Artifact was written by a different format version.
    #[error("incompatible model format: found version {found}, expected {expected}")]
    IncompatibleFormat { found: u32, expected: u32 },

    /// Artifact is unreadable, truncated or structurally invalid.
    #[error("corrupt model artifact: {0}")]
    CorruptArtifact(String),

    /// Training data could not be read.
    #[error("dataset error: {0}")]
    Dataset(String),
}

impl PredictorError {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        PredictorError::InvalidInput(msg.into())
    }

    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        PredictorError::CorruptArtifact(msg.into())
    }

    pub fn dataset<S: Into<String>>(msg: S) -> Self {
        PredictorError::Dataset(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PredictorError>;
