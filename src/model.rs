//! Labels, examples and the count tables a classifier is built from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::features::FeatureSet;

/// A category tag such as `"male"` or `"female"`.
///
/// Labels order by their string value; that order breaks classification ties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

impl Label {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Label(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Label {
    fn from(tag: &str) -> Self {
        Label::new(tag)
    }
}

impl From<String> for Label {
    fn from(tag: String) -> Self {
        Label(tag)
    }
}

/// One labeled training name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    text: String,
    label: Label,
}

impl Example {
    pub fn new<T: Into<String>, L: Into<Label>>(text: T, label: L) -> Self {
        Example {
            text: text.into(),
            label: label.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn label(&self) -> &Label {
        &self.label
    }
}

/// Key of a single feature count: `(feature-name, feature-value, label)`.
pub type FeatureKey = (String, String, Label);

/// Label and feature frequencies collected from training examples.
///
/// All maps are ordered so two models built from the same examples compare
/// equal and serialize identically regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyModel {
    label_counts: BTreeMap<Label, u64>,
    feature_counts: BTreeMap<FeatureKey, u64>,
    feature_value_domains: BTreeMap<String, BTreeSet<String>>,
}

impl FrequencyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one example's features under `label`.
    pub fn observe(&mut self, features: &FeatureSet, label: &Label) {
        for (name, value) in features.iter() {
            self.add_feature(name, value, label, 1);
        }
        *self.label_counts.entry(label.clone()).or_insert(0) += 1;
    }

    /// Adds `count` occurrences of a feature value under `label`.
    ///
    /// Does not touch the label counts; callers rebuilding a model from stored
    /// tables use [`FrequencyModel::add_label`] for those.
    pub(crate) fn add_feature(&mut self, name: &str, value: &str, label: &Label, count: u64) {
        *self
            .feature_counts
            .entry((name.to_string(), value.to_string(), label.clone()))
            .or_insert(0) += count;
        self.feature_value_domains
            .entry(name.to_string())
            .or_default()
            .insert(value.to_string());
    }

    pub(crate) fn add_label(&mut self, label: &Label, count: u64) {
        *self.label_counts.entry(label.clone()).or_insert(0) += count;
    }

    /// Folds `other` into `self`: counts are summed and domains unioned.
    ///
    /// Merging is associative and commutative, so partitions of a training set
    /// can be counted independently and combined in any order.
    pub fn merge(&mut self, other: FrequencyModel) {
        for (label, count) in other.label_counts {
            *self.label_counts.entry(label).or_insert(0) += count;
        }
        for (key, count) in other.feature_counts {
            *self.feature_counts.entry(key).or_insert(0) += count;
        }
        for (name, values) in other.feature_value_domains {
            self.feature_value_domains
                .entry(name)
                .or_default()
                .extend(values);
        }
    }

    /// Number of examples observed.
    pub fn total_examples(&self) -> u64 {
        self.label_counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_examples() == 0
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.label_counts.keys()
    }

    pub fn label_count(&self, label: &Label) -> u64 {
        self.label_counts.get(label).copied().unwrap_or(0)
    }

    pub fn feature_count(&self, name: &str, value: &str, label: &Label) -> u64 {
        self.feature_counts
            .get(&(name.to_string(), value.to_string(), label.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Distinct values seen for `name` under any label.
    pub fn domain(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.feature_value_domains.get(name)
    }

    pub fn domain_size(&self, name: &str) -> usize {
        self.domain(name).map_or(0, BTreeSet::len)
    }

    pub fn label_counts(&self) -> &BTreeMap<Label, u64> {
        &self.label_counts
    }

    pub fn feature_counts(&self) -> &BTreeMap<FeatureKey, u64> {
        &self.feature_counts
    }

    pub fn feature_value_domains(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.feature_value_domains
    }
}
