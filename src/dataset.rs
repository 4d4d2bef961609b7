//! Loading labeled names from CSV and splitting them for evaluation.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use log::{debug, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::error::{PredictorError, Result};
use crate::model::{Example, Label};

pub const LABEL_MALE: &str = "male";
pub const LABEL_FEMALE: &str = "female";

/// Layout of a training CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvFormat {
    /// `name,male_count,female_count`; the majority decides the label.
    #[default]
    Counts,
    /// `name,label`.
    Labeled,
}

/// A name with how often it was given to boys and to girls.
#[derive(Debug, Deserialize, Clone)]
pub struct NameRecord {
    pub name: String,
    pub male_count: u32,
    pub female_count: u32,
}

impl NameRecord {
    /// The majority label, or `None` when both counts are equal.
    pub fn to_example(&self) -> Option<Example> {
        if self.male_count > self.female_count {
            Some(Example::new(self.name.clone(), LABEL_MALE))
        } else if self.female_count > self.male_count {
            Some(Example::new(self.name.clone(), LABEL_FEMALE))
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct LabeledRecord {
    name: String,
    label: String,
}

/// Train/test partition of a set of examples.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<Example>,
    pub test: Vec<Example>,
}

/// Reads every example from the CSV file at `path`.
pub fn load_csv(path: &Path, format: CsvFormat) -> Result<Vec<Example>> {
    let file = File::open(path)
        .map_err(|e| PredictorError::dataset(format!("failed to open {}: {e}", path.display())))?;
    read_csv(file, format)
}

/// Reads every example from CSV data.
pub fn read_csv<R: std::io::Read>(reader: R, format: CsvFormat) -> Result<Vec<Example>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut examples = Vec::new();
    let mut dropped = 0usize;

    match format {
        CsvFormat::Counts => {
            for result in rdr.deserialize() {
                let record: NameRecord = result
                    .map_err(|e| PredictorError::dataset(format!("invalid CSV row: {e}")))?;
                match record.to_example() {
                    Some(example) if !record.name.trim().is_empty() => examples.push(example),
                    _ => dropped += 1,
                }
            }
        }
        CsvFormat::Labeled => {
            for result in rdr.deserialize() {
                let record: LabeledRecord = result
                    .map_err(|e| PredictorError::dataset(format!("invalid CSV row: {e}")))?;
                let label = record.label.trim();
                if record.name.trim().is_empty() || label.is_empty() {
                    dropped += 1;
                    continue;
                }
                examples.push(Example::new(record.name, label));
            }
        }
    }

    if dropped > 0 {
        warn!("dropped {dropped} ambiguous or blank rows");
    }
    debug!("read {} examples", examples.len());
    Ok(examples)
}

/// Splits `examples` into train and test sets, keeping label proportions.
///
/// Each label's examples are shuffled with `rng` and the first
/// `round(n * test_ratio)` go to the test set, so a seeded RNG reproduces the
/// same split.
pub fn train_test_split<R: Rng + ?Sized>(
    examples: &[Example],
    test_ratio: f64,
    rng: &mut R,
) -> DatasetSplit {
    let test_ratio = test_ratio.clamp(0.0, 1.0);

    let mut by_label: BTreeMap<&Label, Vec<Example>> = BTreeMap::new();
    for example in examples {
        by_label
            .entry(example.label())
            .or_default()
            .push(example.clone());
    }

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut group) in by_label {
        group.shuffle(rng);
        let test_size = ((group.len() as f64) * test_ratio).round() as usize;
        let rest = group.split_off(test_size);
        test.extend(group);
        train.extend(rest);
    }

    debug!("split into {} train / {} test", train.len(), test.len());
    DatasetSplit { train, test }
}
