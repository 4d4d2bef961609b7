//! # gender-predictor 🧠🚻
//!
//! Predict gender from first names using a categorical Naive Bayes classifier.
//!
//! Each name is lower-cased and described by eleven substring features,
//! `suffix1..suffix6` and `prefix1..prefix5` (e.g. `suffix3=lex` for `Alex`).
//! Training counts how often every feature value occurs under every label;
//! classification combines label priors with Laplace-smoothed likelihoods in
//! log space and returns the best label plus a normalized posterior.
//!
//! ## Features
//! - Prefix/suffix feature extraction shared by training and inference
//! - Categorical Naive Bayes with add-one smoothing, any number of labels
//! - Label + probability prediction
//! - Versioned model persistence with `rmp-serde` (MessagePack)
//! - Parallel training with `rayon`
//! - Auto-retrain when the CSV is updated
//! - Benchmarkable with [Criterion](https://crates.io/crates/criterion)
//!
//! ## Example
//! ```rust
//! use gender_predictor::{Example, Label, train, store};
//!
//! let classifier = train(&[
//!     Example::new("anna", "female"),
//!     Example::new("john", "male"),
//! ])?;
//! assert_eq!(classifier.classify("Anna")?, Label::from("female"));
//!
//! let restored = store::load(&store::save(&classifier)?)?;
//! let probs = restored.classify_with_probabilities("Johanna")?;
//! let total: f64 = probs.values().sum();
//! assert!((total - 1.0).abs() < 1e-6);
//! # Ok::<(), gender_predictor::PredictorError>(())
//! ```

pub mod classifier;
pub mod dataset;
pub mod error;
pub mod features;
pub mod model;
pub mod store;
pub mod training;

pub use classifier::{InformativeFeature, NaiveBayesClassifier};
pub use dataset::{CsvFormat, DatasetSplit, NameRecord, load_csv, train_test_split};
pub use error::{PredictorError, Result};
pub use features::{FeatureSet, extract};
pub use model::{Example, FrequencyModel, Label};
pub use store::SharedClassifier;
pub use training::{TrainingPipeline, load_or_train_if_stale, train};
