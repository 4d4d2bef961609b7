//! Categorical Naive Bayes over prefix/suffix features.
//!
//! A [`NaiveBayesClassifier`] owns a sealed [`FrequencyModel`] and caches the
//! log-prior of every label plus, per feature name, a dense
//! `values x labels` table of Laplace-smoothed log-likelihoods:
//!
//! ```text
//! logscore(L) = ln(count(L) / N) + sum_f ln((count(f, v, L) + 1) / (count(L) + |domain(f)|))
//! ```
//!
//! Feature values never seen during training have no row and are skipped for
//! every label.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{PredictorError, Result};
use crate::features::extract;
use crate::model::{Example, FrequencyModel, Label};

/// Smoothed log-likelihoods of one feature name.
#[derive(Debug, Clone)]
struct FeatureTable {
    rows: HashMap<String, usize>,
    log_likelihood: Array2<f64>,
}

/// A feature value whose likelihood differs the most between labels.
#[derive(Debug, Clone, PartialEq)]
pub struct InformativeFeature {
    pub feature: String,
    pub value: String,
    /// Label with the highest likelihood for this value.
    pub favored: Label,
    /// Label with the lowest likelihood for this value.
    pub disfavored: Label,
    /// `P(value | favored) / P(value | disfavored)`, always `>= 1`.
    pub ratio: f64,
}

/// Trained, read-only name classifier.
#[derive(Debug, Clone)]
pub struct NaiveBayesClassifier {
    model: FrequencyModel,
    labels: Vec<Label>,
    log_priors: Array1<f64>,
    tables: HashMap<String, FeatureTable>,
}

impl Default for NaiveBayesClassifier {
    fn default() -> Self {
        Self::new(FrequencyModel::new())
    }
}

impl NaiveBayesClassifier {
    /// Seals `model` and precomputes its log-probability tables.
    ///
    /// An empty model yields an untrained classifier whose queries fail with
    /// [`PredictorError::UntrainedModel`].
    pub fn new(model: FrequencyModel) -> Self {
        let labels: Vec<Label> = model.labels().cloned().collect();
        let total = model.total_examples() as f64;

        let log_priors = Array1::from_iter(
            labels
                .iter()
                .map(|label| (model.label_count(label) as f64 / total).ln()),
        );

        let mut tables = HashMap::new();
        for (name, domain) in model.feature_value_domains() {
            let domain_size = domain.len() as f64;
            let mut rows = HashMap::with_capacity(domain.len());
            let mut log_likelihood = Array2::<f64>::zeros((domain.len(), labels.len()));

            for (row, value) in domain.iter().enumerate() {
                rows.insert(value.clone(), row);
                for (col, label) in labels.iter().enumerate() {
                    let count = model.feature_count(name, value, label) as f64;
                    let denom = model.label_count(label) as f64 + domain_size;
                    log_likelihood[[row, col]] = ((count + 1.0) / denom).ln();
                }
            }

            tables.insert(
                name.clone(),
                FeatureTable {
                    rows,
                    log_likelihood,
                },
            );
        }

        NaiveBayesClassifier {
            model,
            labels,
            log_priors,
            tables,
        }
    }

    /// Labels known to the classifier, in tie-breaking order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The frequency tables this classifier was built from.
    pub fn model(&self) -> &FrequencyModel {
        &self.model
    }

    pub fn is_trained(&self) -> bool {
        !self.labels.is_empty()
    }

    /// Unnormalized log posterior of every label, aligned with [`Self::labels`].
    pub fn log_scores(&self, text: &str) -> Result<Array1<f64>> {
        if !self.is_trained() {
            return Err(PredictorError::UntrainedModel);
        }
        let features = extract(text)?;

        let mut scores = self.log_priors.clone();
        for (name, value) in features.iter() {
            let Some(table) = self.tables.get(name) else {
                continue;
            };
            if let Some(&row) = table.rows.get(value) {
                scores += &table.log_likelihood.row(row);
            }
        }
        Ok(scores)
    }

    /// Most probable label for `text`.
    pub fn classify(&self, text: &str) -> Result<Label> {
        let scores = self.log_scores(text)?;
        let best = argmax(scores.view());
        Ok(self.labels[best].clone())
    }

    /// Posterior distribution over labels for `text`, summing to one.
    pub fn classify_with_probabilities(&self, text: &str) -> Result<BTreeMap<Label, f64>> {
        let scores = self.log_scores(text)?;
        let max = scores.fold(f64::NEG_INFINITY, |acc, &s| acc.max(s));
        let weights = scores.mapv(|s| (s - max).exp());
        let norm = weights.sum();

        Ok(self
            .labels
            .iter()
            .cloned()
            .zip(weights.iter().map(|w| w / norm))
            .collect())
    }

    /// Fraction of `examples` whose label is predicted correctly.
    pub fn accuracy(&self, examples: &[Example]) -> Result<f64> {
        if examples.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for example in examples {
            if self.classify(example.text())? == *example.label() {
                correct += 1;
            }
        }
        Ok(correct as f64 / examples.len() as f64)
    }

    /// The `n` feature values whose likelihood varies most across labels.
    pub fn most_informative_features(&self, n: usize) -> Vec<InformativeFeature> {
        if self.labels.len() < 2 {
            return Vec::new();
        }

        let mut features = Vec::new();
        for (name, table) in &self.tables {
            for (value, &row) in &table.rows {
                let lls = table.log_likelihood.row(row);
                let hi = argmax(lls);
                let lo = argmin(lls);
                features.push(InformativeFeature {
                    feature: name.clone(),
                    value: value.clone(),
                    favored: self.labels[hi].clone(),
                    disfavored: self.labels[lo].clone(),
                    ratio: (lls[hi] - lls[lo]).exp(),
                });
            }
        }

        features.sort_by(|a, b| {
            b.ratio
                .total_cmp(&a.ratio)
                .then_with(|| a.feature.cmp(&b.feature))
                .then_with(|| a.value.cmp(&b.value))
        });
        features.truncate(n);
        features
    }
}

// First index wins on ties, so the label that sorts first is chosen.
fn argmax(values: ArrayView1<f64>) -> usize {
    best_index(values, Ordering::Greater)
}

fn argmin(values: ArrayView1<f64>) -> usize {
    best_index(values, Ordering::Less)
}

fn best_index(values: ArrayView1<f64>, wanted: Ordering) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v.total_cmp(&values[best]) == wanted {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::feature_names;

    fn train(examples: &[(&str, &str)]) -> NaiveBayesClassifier {
        let mut model = FrequencyModel::new();
        for (name, label) in examples {
            model.observe(&extract(name).unwrap(), &Label::from(*label));
        }
        NaiveBayesClassifier::new(model)
    }

    fn sample() -> NaiveBayesClassifier {
        train(&[
            ("anna", "female"),
            ("maria", "female"),
            ("julia", "female"),
            ("sophia", "female"),
            ("john", "male"),
            ("peter", "male"),
            ("oliver", "male"),
        ])
    }

    #[test]
    fn two_example_scenario() {
        let clf = train(&[("anna", "female"), ("john", "male")]);
        assert_eq!(clf.classify("anna").unwrap(), Label::from("female"));
        assert_eq!(clf.classify("John").unwrap(), Label::from("male"));

        // No overlapping features: equal priors, tie goes to the first label.
        assert_eq!(clf.classify("zzz").unwrap(), Label::from("female"));
        let probs = clf.classify_with_probabilities("zzz").unwrap();
        assert!((probs[&Label::from("female")] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unseen_values_fall_back_to_priors() {
        let clf = train(&[("anna", "female"), ("maria", "female"), ("john", "male")]);
        assert_eq!(clf.classify("zzz").unwrap(), Label::from("female"));
        let probs = clf.classify_with_probabilities("zzz").unwrap();
        assert!((probs[&Label::from("female")] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn log_scores_match_the_formula() {
        let clf = train(&[("anna", "female"), ("john", "male")]);
        let scores = clf.log_scores("anna").unwrap();

        // Every anna feature is in the domain; each domain has two values.
        let female_ll = (2.0_f64 / 3.0).ln() * feature_names().len() as f64;
        let male_ll = (1.0_f64 / 3.0).ln() * feature_names().len() as f64;
        assert_eq!(clf.labels(), &[Label::from("female"), Label::from("male")]);
        assert!((scores[0] - (0.5_f64.ln() + female_ll)).abs() < 1e-9);
        assert!((scores[1] - (0.5_f64.ln() + male_ll)).abs() < 1e-9);
    }

    #[test]
    fn probabilities_are_normalized() {
        let clf = sample();
        for name in ["Anna", "Olivia", "Peter", "x", "Bartholomew", "Zoë"] {
            let probs = clf.classify_with_probabilities(name).unwrap();
            let total: f64 = probs.values().sum();
            assert!((total - 1.0).abs() < 1e-6, "{name}: {total}");
            assert_eq!(probs.len(), 2);
        }
    }

    #[test]
    fn classify_agrees_with_probabilities() {
        let clf = sample();
        for name in ["Mia", "Lena", "Oscar", "Pete"] {
            let label = clf.classify(name).unwrap();
            let probs = clf.classify_with_probabilities(name).unwrap();
            let top = probs
                .iter()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(l, _)| l.clone())
                .unwrap();
            assert_eq!(label, top);
        }
    }

    #[test]
    fn supports_more_than_two_labels() {
        let clf = train(&[
            ("anna", "a"),
            ("bob", "b"),
            ("carl", "c"),
            ("carla", "c"),
        ]);
        assert_eq!(clf.labels().len(), 3);
        assert_eq!(clf.classify("carlos").unwrap(), Label::from("c"));
        let probs = clf.classify_with_probabilities("bobby").unwrap();
        assert!((probs.values().sum::<f64>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn untrained_classifier_refuses() {
        let clf = NaiveBayesClassifier::default();
        assert!(!clf.is_trained());
        assert_eq!(clf.classify("anna"), Err(PredictorError::UntrainedModel));
        assert_eq!(
            clf.classify_with_probabilities("anna"),
            Err(PredictorError::UntrainedModel)
        );
    }

    #[test]
    fn blank_input_is_rejected() {
        let clf = sample();
        assert!(matches!(
            clf.classify("   "),
            Err(PredictorError::InvalidInput(_))
        ));
    }

    #[test]
    fn accuracy_on_training_names() {
        let clf = sample();
        let examples = vec![
            Example::new("anna", "female"),
            Example::new("john", "male"),
            Example::new("peter", "male"),
        ];
        assert_eq!(clf.accuracy(&examples).unwrap(), 1.0);
        assert_eq!(clf.accuracy(&[]).unwrap(), 0.0);
    }

    #[test]
    fn informative_features_are_ranked() {
        let clf = sample();
        let top = clf.most_informative_features(5);
        assert_eq!(top.len(), 5);
        for pair in top.windows(2) {
            assert!(pair[0].ratio >= pair[1].ratio);
        }
        let best = &top[0];
        assert!(best.ratio > 1.0);
        assert_ne!(best.favored, best.disfavored);

        assert!(
            train(&[("anna", "female")])
                .most_informative_features(3)
                .is_empty()
        );
    }

    #[test]
    fn classifier_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NaiveBayesClassifier>();

        let clf = sample();
        std::thread::scope(|s| {
            for name in ["anna", "john"] {
                let clf = &clf;
                s.spawn(move || clf.classify(name).unwrap());
            }
        });
    }
}
