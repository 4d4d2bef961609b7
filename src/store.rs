//! MessagePack persistence of trained classifiers.
//!
//! An artifact is a named-field MessagePack map:
//!
//! ```text
//! {
//!   format_version: u32,
//!   label_counts: { label: count },
//!   feature_counts: [ { feature, value, label, count } ],
//!   feature_value_domains: { feature: [value] },
//! }
//! ```
//!
//! Only the frequency tables are stored; log-probabilities are recomputed on
//! load, so a loaded classifier scores bit-identically to the saved one.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::{debug, info};
use rmp_serde::{decode::from_slice, encode::write_named};
use serde::{Deserialize, Serialize};

use crate::classifier::NaiveBayesClassifier;
use crate::error::{PredictorError, Result};
use crate::features::feature_names;
use crate::model::{FrequencyModel, Label};

/// Version written by [`save`] and the only one [`load`] accepts.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct FeatureCountEntry {
    feature: String,
    value: String,
    label: String,
    count: i64,
}

#[derive(Serialize, Deserialize)]
struct Artifact {
    format_version: u32,
    label_counts: BTreeMap<String, i64>,
    feature_counts: Vec<FeatureCountEntry>,
    feature_value_domains: BTreeMap<String, Vec<String>>,
}

impl Artifact {
    fn from_model(model: &FrequencyModel) -> Self {
        Artifact {
            format_version: FORMAT_VERSION,
            label_counts: model
                .label_counts()
                .iter()
                .map(|(label, &count)| (label.to_string(), count as i64))
                .collect(),
            feature_counts: model
                .feature_counts()
                .iter()
                .map(|((feature, value, label), &count)| FeatureCountEntry {
                    feature: feature.clone(),
                    value: value.clone(),
                    label: label.to_string(),
                    count: count as i64,
                })
                .collect(),
            feature_value_domains: model
                .feature_value_domains()
                .iter()
                .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
                .collect(),
        }
    }

    /// Rebuilds the frequency tables, rejecting anything a training run could
    /// not have produced.
    fn into_model(self) -> Result<FrequencyModel> {
        if self.label_counts.is_empty() {
            return Err(PredictorError::corrupt("artifact has no labels"));
        }

        let mut model = FrequencyModel::new();
        for (label, count) in &self.label_counts {
            if *count <= 0 {
                return Err(PredictorError::corrupt(format!(
                    "label {label:?} has non-positive count {count}"
                )));
            }
            model.add_label(&Label::new(label.as_str()), *count as u64);
        }

        let mut declared: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (name, values) in self.feature_value_domains {
            let set: BTreeSet<String> = values.into_iter().collect();
            if set.is_empty() {
                return Err(PredictorError::corrupt(format!(
                    "feature {name:?} has an empty value domain"
                )));
            }
            declared.insert(name, set);
        }

        let expected: BTreeSet<String> = feature_names().into_iter().collect();
        let found: BTreeSet<String> = declared.keys().cloned().collect();
        if found != expected {
            return Err(PredictorError::corrupt(format!(
                "artifact features {found:?} do not match {expected:?}"
            )));
        }

        for entry in &self.feature_counts {
            if entry.count <= 0 {
                return Err(PredictorError::corrupt(format!(
                    "feature {}={:?} has non-positive count {}",
                    entry.feature, entry.value, entry.count
                )));
            }
            if !self.label_counts.contains_key(&entry.label) {
                return Err(PredictorError::corrupt(format!(
                    "feature {}={:?} references unknown label {:?}",
                    entry.feature, entry.value, entry.label
                )));
            }
            let in_domain = declared
                .get(&entry.feature)
                .is_some_and(|domain| domain.contains(&entry.value));
            if !in_domain {
                return Err(PredictorError::corrupt(format!(
                    "feature {}={:?} is missing from its value domain",
                    entry.feature, entry.value
                )));
            }
            model.add_feature(
                &entry.feature,
                &entry.value,
                &Label::new(entry.label.as_str()),
                entry.count as u64,
            );
        }

        if *model.feature_value_domains() != declared {
            return Err(PredictorError::corrupt(
                "value domains disagree with the feature counts",
            ));
        }

        // Every example contributes exactly one value per feature name.
        for (name, domain) in model.feature_value_domains() {
            for label in model.labels() {
                let sum: u64 = domain
                    .iter()
                    .map(|value| model.feature_count(name, value, label))
                    .sum();
                if sum != model.label_count(label) {
                    return Err(PredictorError::corrupt(format!(
                        "feature {name:?} counts {sum} examples for label {label:?}, expected {}",
                        model.label_count(label)
                    )));
                }
            }
        }

        Ok(model)
    }
}

/// Serializes a trained classifier into artifact bytes.
pub fn save(classifier: &NaiveBayesClassifier) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_to(classifier, &mut bytes)?;
    Ok(bytes)
}

/// Reconstructs a classifier from artifact bytes.
pub fn load(bytes: &[u8]) -> Result<NaiveBayesClassifier> {
    let header: ArtifactHeader = from_slice(bytes)
        .map_err(|e| PredictorError::corrupt(format!("unreadable artifact header: {e}")))?;
    let found = header
        .format_version
        .ok_or_else(|| PredictorError::corrupt("artifact has no format version"))?;
    if found != FORMAT_VERSION {
        return Err(PredictorError::IncompatibleFormat {
            found,
            expected: FORMAT_VERSION,
        });
    }

    let artifact: Artifact = from_slice(bytes)
        .map_err(|e| PredictorError::corrupt(format!("malformed artifact: {e}")))?;
    let model = artifact.into_model()?;
    debug!(
        "loaded artifact with {} labels, {} feature counts",
        model.label_counts().len(),
        model.feature_counts().len()
    );
    Ok(NaiveBayesClassifier::new(model))
}

/// Writes the classifier to `path`, replacing any existing file.
pub fn save_to_file(classifier: &NaiveBayesClassifier, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        PredictorError::corrupt(format!("failed to create {}: {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    write_to(classifier, &mut writer)?;
    writer.flush().map_err(|e| {
        PredictorError::corrupt(format!("failed to write {}: {e}", path.display()))
    })?;
    info!("saved model to {}", path.display());
    Ok(())
}

/// Reads a classifier previously written by [`save_to_file`].
pub fn load_from_file(path: &Path) -> Result<NaiveBayesClassifier> {
    let file = File::open(path).map_err(|e| {
        PredictorError::corrupt(format!("failed to open {}: {e}", path.display()))
    })?;
    let mut bytes = Vec::new();
    BufReader::new(file).read_to_end(&mut bytes).map_err(|e| {
        PredictorError::corrupt(format!("failed to read {}: {e}", path.display()))
    })?;
    let classifier = load(&bytes)?;
    info!("loaded model from {}", path.display());
    Ok(classifier)
}

fn write_to<W: Write>(classifier: &NaiveBayesClassifier, writer: &mut W) -> Result<()> {
    if !classifier.is_trained() {
        return Err(PredictorError::UntrainedModel);
    }
    let artifact = Artifact::from_model(classifier.model());
    write_named(writer, &artifact)
        .map_err(|e| PredictorError::corrupt(format!("failed to encode artifact: {e}")))
}

/// A classifier loaded from disk on first use and shared read-only afterwards.
///
/// Create one at startup (or in a `LazyLock` static) and hand out references;
/// concurrent callers all observe the same instance.
pub struct SharedClassifier {
    path: PathBuf,
    cell: OnceLock<NaiveBayesClassifier>,
}

impl SharedClassifier {
    pub fn new(path: PathBuf) -> Self {
        SharedClassifier {
            path,
            cell: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the classifier, loading it if no call has succeeded yet.
    ///
    /// A failed load leaves the cell empty so a later call can retry, e.g.
    /// after the artifact has been replaced.
    pub fn get(&self) -> Result<&NaiveBayesClassifier> {
        if let Some(classifier) = self.cell.get() {
            return Ok(classifier);
        }
        let loaded = load_from_file(&self.path)?;
        // A concurrent loader may have won; either instance is equivalent.
        let _ = self.cell.set(loaded);
        self.cell
            .get()
            .ok_or_else(|| PredictorError::corrupt("shared classifier was not initialized"))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Modification time of `path`, if it exists.
pub(crate) fn modified(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract;
    use tempfile::TempDir;

    fn trained() -> NaiveBayesClassifier {
        let mut model = FrequencyModel::new();
        for (name, label) in [
            ("anna", "female"),
            ("maria", "female"),
            ("john", "male"),
            ("peter", "male"),
            ("oliver", "male"),
        ] {
            model.observe(&extract(name).unwrap(), &Label::from(label));
        }
        NaiveBayesClassifier::new(model)
    }

    fn encode(artifact: &Artifact) -> Vec<u8> {
        rmp_serde::to_vec_named(artifact).unwrap()
    }

    #[test]
    fn round_trip_preserves_behavior() {
        let original = trained();
        let restored = load(&save(&original).unwrap()).unwrap();

        assert_eq!(restored.model(), original.model());
        for name in ["anna", "Oliver", "zzz", "Marie", "j"] {
            assert_eq!(restored.classify(name), original.classify(name));
            assert_eq!(
                restored.log_scores(name).unwrap(),
                original.log_scores(name).unwrap()
            );
        }
    }

    #[test]
    fn file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.msgpack");
        let original = trained();

        save_to_file(&original, &path).unwrap();
        let restored = load_from_file(&path).unwrap();
        assert_eq!(restored.model(), original.model());
    }

    #[test]
    fn untrained_classifier_is_not_saved() {
        assert_eq!(
            save(&NaiveBayesClassifier::default()),
            Err(PredictorError::UntrainedModel)
        );
    }

    #[test]
    fn rejects_other_versions() {
        let mut artifact = Artifact::from_model(trained().model());
        artifact.format_version = FORMAT_VERSION + 1;
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::IncompatibleFormat { found, expected })
                if found == FORMAT_VERSION + 1 && expected == FORMAT_VERSION
        ));
    }

    #[test]
    fn rejects_truncated_and_garbage_bytes() {
        let bytes = save(&trained()).unwrap();
        assert!(matches!(
            load(&bytes[..bytes.len() / 2]),
            Err(PredictorError::CorruptArtifact(_))
        ));
        assert!(matches!(
            load(b"not a model"),
            Err(PredictorError::CorruptArtifact(_))
        ));
        assert!(matches!(load(&[]), Err(PredictorError::CorruptArtifact(_))));
    }

    #[test]
    fn rejects_missing_version() {
        #[derive(Serialize)]
        struct NoVersion {
            label_counts: BTreeMap<String, i64>,
        }
        let bytes = rmp_serde::to_vec_named(&NoVersion {
            label_counts: BTreeMap::from([("male".to_string(), 1)]),
        })
        .unwrap();
        assert!(matches!(
            load(&bytes),
            Err(PredictorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn rejects_negative_counts() {
        let mut artifact = Artifact::from_model(trained().model());
        artifact.feature_counts[0].count = -1;
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));

        let mut artifact = Artifact::from_model(trained().model());
        artifact.label_counts.insert("male".into(), -3);
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn rejects_inconsistent_tables() {
        let mut artifact = Artifact::from_model(trained().model());
        artifact.feature_counts[0].label = "other".into();
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));

        let mut artifact = Artifact::from_model(trained().model());
        artifact.feature_value_domains.clear();
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));

        let mut artifact = Artifact::from_model(trained().model());
        artifact.feature_counts.pop();
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));

        let mut artifact = Artifact::from_model(trained().model());
        artifact.label_counts.clear();
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn rejects_missing_feature_sections() {
        let mut artifact = Artifact::from_model(trained().model());
        artifact.feature_counts.clear();
        artifact.feature_value_domains.clear();
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(_))
        ));

        let mut artifact = Artifact::from_model(trained().model());
        artifact.feature_counts.retain(|e| e.feature != "prefix5");
        artifact.feature_value_domains.remove("prefix5");
        assert!(matches!(
            load(&encode(&artifact)),
            Err(PredictorError::CorruptArtifact(msg)) if msg.contains("do not match")
        ));
    }

    #[test]
    fn missing_file_is_reported_as_corrupt() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_from_file(&dir.path().join("absent.msgpack")),
            Err(PredictorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn shared_classifier_loads_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.msgpack");
        let shared = SharedClassifier::new(path.clone());

        assert!(shared.get().is_err());
        assert!(!shared.is_loaded());

        save_to_file(&trained(), &path).unwrap();
        let first = shared.get().unwrap() as *const NaiveBayesClassifier;
        fs::remove_file(&path).unwrap();
        let second = shared.get().unwrap() as *const NaiveBayesClassifier;

        assert!(shared.is_loaded());
        assert_eq!(first, second);
        assert_eq!(
            shared.get().unwrap().classify("anna").unwrap(),
            Label::from("female")
        );
    }
}
