//! Prefix/suffix feature extraction.
//!
//! The exact same extractor runs at training and at inference time. A trained
//! model is only meaningful for the features produced here, so any change to
//! the windows or the normalization invalidates existing artifacts.

use std::collections::BTreeMap;

use crate::error::{PredictorError, Result};

/// Longest suffix window, `suffix1..=suffix6`.
pub const MAX_SUFFIX: usize = 6;

/// Longest prefix window, `prefix1..=prefix5`.
pub const MAX_PREFIX: usize = 5;

/// Named categorical features of one name, e.g. `suffix3 -> "lex"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    features: BTreeMap<String, String>,
}

impl FeatureSet {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(String::as_str)
    }

    /// Iterates `(feature-name, feature-value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.features
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Names of every feature [`extract`] produces, suffixes first.
pub fn feature_names() -> Vec<String> {
    (1..=MAX_SUFFIX)
        .map(|k| format!("suffix{k}"))
        .chain((1..=MAX_PREFIX).map(|k| format!("prefix{k}")))
        .collect()
}

/// Extracts the suffix and prefix features of `text`.
///
/// The text is lower-cased as given; surrounding whitespace is part of the
/// name. Windows count characters, not bytes. A window longer than the name
/// falls back to the name's first character, so `suffix5` of `"alex"` is
/// `"a"`.
pub fn extract(text: &str) -> Result<FeatureSet> {
    if text.trim().is_empty() {
        return Err(PredictorError::invalid_input(
            "name must contain at least one non-whitespace character",
        ));
    }

    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let len = chars.len();
    let first = chars[0].to_string();
    let mut features = BTreeMap::new();

    for k in 1..=MAX_SUFFIX {
        let value = if k <= len {
            chars[len - k..].iter().collect::<String>()
        } else {
            first.clone()
        };
        features.insert(format!("suffix{k}"), value);
    }

    for k in 1..=MAX_PREFIX {
        let value = if k <= len {
            chars[..k].iter().collect::<String>()
        } else {
            first.clone()
        };
        features.insert(format!("prefix{k}"), value);
    }

    Ok(FeatureSet { features })
}
