//! Turning labeled examples into a classifier.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::SystemTime;

use log::{debug, info};
use rand::rng;
use rayon::prelude::*;

use crate::classifier::NaiveBayesClassifier;
use crate::dataset::{CsvFormat, load_csv, train_test_split};
use crate::error::{PredictorError, Result};
use crate::features::extract;
use crate::model::{Example, FrequencyModel, Label};
use crate::store;

/// Counts features of labeled examples and seals them into a classifier.
#[derive(Debug, Clone, Default)]
pub struct TrainingPipeline {
    expected_labels: Option<BTreeSet<Label>>,
}

impl TrainingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any example whose label is not in `labels`.
    pub fn with_expected_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.expected_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Builds the frequency tables for `examples`.
    pub fn count(&self, examples: &[Example]) -> Result<FrequencyModel> {
        if examples.is_empty() {
            return Err(PredictorError::EmptyTrainingSet);
        }
        let mut model = FrequencyModel::new();
        for example in examples {
            self.observe(&mut model, example)?;
        }
        Ok(model)
    }

    /// Same tables as [`Self::count`], built from partitions counted in
    /// parallel and merged.
    pub fn count_parallel(&self, examples: &[Example]) -> Result<FrequencyModel> {
        if examples.is_empty() {
            return Err(PredictorError::EmptyTrainingSet);
        }
        examples
            .par_iter()
            .try_fold(FrequencyModel::new, |mut model, example| -> Result<FrequencyModel> {
                self.observe(&mut model, example)?;
                Ok(model)
            })
            .try_reduce(FrequencyModel::new, |mut a, b| -> Result<FrequencyModel> {
                a.merge(b);
                Ok(a)
            })
    }

    /// Trains a classifier on `examples`.
    pub fn fit(&self, examples: &[Example]) -> Result<NaiveBayesClassifier> {
        let model = self.count(examples)?;
        Ok(self.seal(model))
    }

    /// Trains a classifier on `examples` using every available core.
    pub fn fit_parallel(&self, examples: &[Example]) -> Result<NaiveBayesClassifier> {
        let model = self.count_parallel(examples)?;
        Ok(self.seal(model))
    }

    fn observe(&self, model: &mut FrequencyModel, example: &Example) -> Result<()> {
        self.check_label(example.label())?;
        let features = extract(example.text())?;
        model.observe(&features, example.label());
        Ok(())
    }

    fn check_label(&self, label: &Label) -> Result<()> {
        match &self.expected_labels {
            Some(expected) if !expected.contains(label) => Err(PredictorError::UnknownLabel {
                label: label.to_string(),
                expected: expected.iter().map(Label::to_string).collect(),
            }),
            _ => Ok(()),
        }
    }

    fn seal(&self, model: FrequencyModel) -> NaiveBayesClassifier {
        info!(
            "trained on {} examples across {} labels",
            model.total_examples(),
            model.label_counts().len()
        );
        for (label, count) in model.label_counts() {
            debug!("  {label}: {count}");
        }
        NaiveBayesClassifier::new(model)
    }
}

/// Trains a classifier with no label restrictions.
pub fn train(examples: &[Example]) -> Result<NaiveBayesClassifier> {
    TrainingPipeline::new().fit(examples)
}

/// Loads the model at `model_path` unless the dataset is newer, in which case
/// the model is retrained on a fresh split, evaluated and saved.
pub fn load_or_train_if_stale(
    model_path: &Path,
    data_path: &Path,
    format: CsvFormat,
    test_ratio: f64,
    pipeline: &TrainingPipeline,
) -> Result<NaiveBayesClassifier> {
    let model_mtime = store::modified(model_path).unwrap_or(SystemTime::UNIX_EPOCH);
    let data_mtime = store::modified(data_path).unwrap_or(SystemTime::UNIX_EPOCH);

    if model_path.exists() && data_mtime <= model_mtime {
        info!("model {} is up to date", model_path.display());
        return store::load_from_file(model_path);
    }

    info!(
        "training model from {} (dataset is newer or model missing)",
        data_path.display()
    );
    let examples = load_csv(data_path, format)?;
    let split = train_test_split(&examples, test_ratio, &mut rng());
    let classifier = pipeline.fit(&split.train)?;
    if !split.test.is_empty() {
        info!(
            "held-out accuracy: {:.2}%",
            classifier.accuracy(&split.test)? * 100.0
        );
    }
    store::save_to_file(&classifier, model_path)?;
    Ok(classifier)
}
