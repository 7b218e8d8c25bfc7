//! Unsupervised anomaly detection over a close-price series.
//!
//! [`IsolationForest`] isolates points by recursive random partitioning:
//! outliers end up alone after fewer splits, so their average path length
//! across the ensemble is short and their score is close to 1.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use shared::models::{AnomalyLabel, AnomalyRecord, PricePoint};

use crate::config::settings::AnomalySettings;
use crate::analytics::statistics::quantile;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Trees in the ensemble used for every analysis run.
pub const N_ESTIMATORS: usize = 100;

// Common seam for outlier models: fit on the series, score every point, then label.
pub trait AnomalyDetector: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value;
    // One score per input point, higher = more anomalous. Fits a fresh model on every call.
    fn score(&self, data: &[f64]) -> Vec<f64>;
    fn label(&self, scores: &[f64]) -> Vec<AnomalyLabel>;

    fn detect(&self, data: &[f64]) -> Vec<AnomalyLabel> {
        self.label(&self.score(data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contamination {
    // Anomalous when the isolation score exceeds 0.5.
    Auto,
    // Expected share of outliers; the threshold is that percentile of the scores.
    Fraction(f64),
}

pub struct IsolationForest {
    name: String,
    n_estimators: usize,
    max_samples: usize,
    contamination: Contamination,
    seed: u64,
}

impl IsolationForest {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            name: format!("IsolationForest({})", n_estimators),
            n_estimators: n_estimators.max(1),
            max_samples: 256,
            contamination: Contamination::Auto,
            seed,
        }
    }

    pub fn with_contamination(mut self, contamination: Contamination) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(2);
        self
    }

    // Ensemble size and the automatic threshold are fixed; only sampling is configurable.
    pub fn from_settings(settings: &AnomalySettings) -> Self {
        Self::new(N_ESTIMATORS, settings.seed).with_max_samples(settings.max_samples)
    }
}

impl AnomalyDetector for IsolationForest {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        let contamination = match self.contamination {
            Contamination::Auto => Value::from("auto"),
            Contamination::Fraction(f) => Value::from(f),
        };
        serde_json::json!({
            "n_estimators": self.n_estimators,
            "max_samples": self.max_samples,
            "contamination": contamination,
            "seed": self.seed,
        })
    }

    fn score(&self, data: &[f64]) -> Vec<f64> {
        // Nothing can be isolated: every point sits at the expected path length.
        let constant = data.windows(2).all(|w| w[0] == w[1]);
        if data.len() < 2 || constant {
            return vec![0.5; data.len()];
        }

        let sample_size = self.max_samples.min(data.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees: Vec<IsolationTree> = (0..self.n_estimators)
            .map(|_| {
                let sample: Vec<f64> = rand::seq::index::sample(&mut rng, data.len(), sample_size)
                    .iter()
                    .map(|i| data[i])
                    .collect();
                IsolationTree::grow(sample, max_depth, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(sample_size);
        data.iter()
            .map(|&x| {
                let mean_path = trees.iter().map(|t| t.path_length(x)).sum::<f64>() / trees.len() as f64;
                2f64.powf(-mean_path / normalizer)
            })
            .collect()
    }

    fn label(&self, scores: &[f64]) -> Vec<AnomalyLabel> {
        let to_label = |anomalous: bool| if anomalous { AnomalyLabel::Anomalous } else { AnomalyLabel::Normal };
        match self.contamination {
            Contamination::Auto => scores.iter().map(|&s| to_label(s > 0.5)).collect(),
            Contamination::Fraction(fraction) => {
                let negated: Vec<f64> = scores.iter().map(|s| -s).collect();
                let offset = quantile(&negated, fraction);
                negated.iter().map(|&s| to_label(s < offset)).collect()
            }
        }
    }
}

/// One record per price point, in input order.
pub fn detect_anomalies(detector: &dyn AnomalyDetector, prices: &[PricePoint]) -> Vec<AnomalyRecord> {
    let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
    let scores = detector.score(&closes);
    let labels = detector.label(&scores);
    tracing::debug!(
        detector = detector.name(),
        parameters = %detector.parameters(),
        flagged = labels.iter().filter(|l| l.is_anomaly()).count(),
        points = prices.len(),
        "Anomaly detection finished"
    );

    prices
        .iter()
        .zip(scores)
        .zip(labels)
        .map(|((p, score), label)| AnomalyRecord {
            timestamp: p.timestamp,
            close: p.close,
            score,
            is_anomaly: label.is_anomaly(),
        })
        .collect()
}

// Average unsuccessful-search path length in a binary search tree of n points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

enum Node {
    Split { threshold: f64, left: usize, right: usize },
    Leaf { size: usize },
}

struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(sample: Vec<f64>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = IsolationTree { nodes: Vec::new() };
        tree.grow_node(sample, 0, max_depth, rng);
        tree
    }

    fn grow_node(&mut self, sample: Vec<f64>, depth: usize, max_depth: usize, rng: &mut StdRng) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { size: sample.len() });
        if depth >= max_depth || sample.len() <= 1 {
            return idx;
        }

        let (min, max) = sample
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if !(max > min) {
            return idx;
        }

        let threshold = rng.gen_range(min..max);
        let (left_sample, right_sample): (Vec<f64>, Vec<f64>) = sample.into_iter().partition(|&v| v <= threshold);
        let left = self.grow_node(left_sample, depth + 1, max_depth, rng);
        let right = self.grow_node(right_sample, depth + 1, max_depth, rng);
        self.nodes[idx] = Node::Split { threshold, left, right };
        idx
    }

    fn path_length(&self, x: f64) -> f64 {
        let mut idx = 0;
        let mut depth = 0usize;
        loop {
            match self.nodes[idx] {
                Node::Split { threshold, left, right } => {
                    idx = if x <= threshold { left } else { right };
                    depth += 1;
                }
                Node::Leaf { size } => return depth as f64 + average_path_length(size),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn prices(closes: &[f64]) -> Vec<PricePoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(start + chrono::Days::new(i as u64), c, c))
            .collect()
    }

    fn calm_series_with_spike() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + 2.0 * (i as f64 * 0.3).sin()).collect();
        closes[30] = 160.0;
        closes
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2448).abs() < 1e-3, "c(256) = {}", c256);
    }

    #[test]
    fn test_sharp_drop_is_flagged() {
        let closes = [100.0, 102.0, 101.0, 105.0, 50.0];
        let forest = IsolationForest::new(100, 42).with_contamination(Contamination::Fraction(0.2));
        let labels = forest.detect(&closes);
        assert_eq!(
            labels,
            vec![
                AnomalyLabel::Normal,
                AnomalyLabel::Normal,
                AnomalyLabel::Normal,
                AnomalyLabel::Normal,
                AnomalyLabel::Anomalous
            ]
        );
    }

    #[test]
    fn test_sharp_drop_scores_highest_with_auto_threshold() {
        let closes = [100.0, 102.0, 101.0, 105.0, 50.0];
        let forest = IsolationForest::new(100, 42);
        let scores = forest.score(&closes);
        assert!(scores[4] > 0.5, "score = {}", scores[4]);
        assert!(scores[..4].iter().all(|&s| s < scores[4]));
        assert_eq!(forest.detect(&closes)[4], AnomalyLabel::Anomalous);
    }

    #[test]
    fn test_spike_in_calm_series_is_flagged() {
        let closes = calm_series_with_spike();
        let forest = IsolationForest::new(100, 42);
        let scores = forest.score(&closes);
        let labels = forest.label(&scores);
        assert_eq!(labels[30], AnomalyLabel::Anomalous);
        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(30));
    }

    #[test]
    fn test_detection_is_deterministic_for_a_seed() {
        let closes = calm_series_with_spike();
        let first = IsolationForest::new(100, 42);
        let second = IsolationForest::new(100, 42);
        assert_eq!(first.score(&closes), second.score(&closes));
        assert_eq!(first.detect(&closes), second.detect(&closes));

        let other_seed = IsolationForest::new(100, 7);
        assert_ne!(first.score(&closes), other_seed.score(&closes));
    }

    #[test]
    fn test_constant_series_has_no_anomalies() {
        let closes = vec![3.3; 20];
        let forest = IsolationForest::new(50, 42);
        let scores = forest.score(&closes);
        assert!(scores.iter().all(|&s| (s - 0.5).abs() < 1e-12));
        assert!(forest.detect(&closes).iter().all(|l| !l.is_anomaly()));
        let fraction = IsolationForest::new(50, 42).with_contamination(Contamination::Fraction(0.1));
        assert!(fraction.detect(&closes).iter().all(|l| !l.is_anomaly()));
    }

    #[test]
    fn test_tiny_inputs() {
        let forest = IsolationForest::new(100, 42);
        assert!(forest.detect(&[]).is_empty());
        assert_eq!(forest.detect(&[10.0]), vec![AnomalyLabel::Normal]);
        assert_eq!(forest.detect(&[10.0, 11.0]).len(), 2);
    }

    #[test]
    fn test_detect_anomalies_records() {
        let points = prices(&[100.0, 102.0, 101.0, 105.0, 50.0]);
        let forest = IsolationForest::new(100, 42).with_contamination(Contamination::Fraction(0.2));
        let records = detect_anomalies(&forest, &points);
        assert_eq!(records.len(), points.len());
        assert_eq!(records[4].timestamp, points[4].timestamp);
        assert_eq!(records[4].close, 50.0);
        assert!(records[4].is_anomaly);
        assert_eq!(records.iter().filter(|r| r.is_anomaly).count(), 1);
    }

    #[test]
    fn test_parameters_and_settings() {
        let forest = IsolationForest::from_settings(&AnomalySettings::default());
        assert_eq!(forest.name(), "IsolationForest(100)");
        let params = forest.parameters();
        assert_eq!(params["n_estimators"], 100);
        assert_eq!(params["contamination"], "auto");
        assert_eq!(params["seed"], 42);
    }

    #[test]
    fn test_config_cannot_change_ensemble_or_threshold() {
        let settings: AnomalySettings =
            serde_json::from_str(r#"{ "n_estimators": 5, "contamination": 0.4, "seed": 42 }"#).unwrap();
        let forest = IsolationForest::from_settings(&settings);
        let params = forest.parameters();
        assert_eq!(params["n_estimators"], N_ESTIMATORS);
        assert_eq!(params["contamination"], "auto");

        let closes = [100.0, 102.0, 101.0, 105.0, 50.0];
        let reference = IsolationForest::new(100, 42);
        assert_eq!(forest.score(&closes), reference.score(&closes));
        assert_eq!(forest.detect(&closes), reference.detect(&closes));
        assert!(forest.detect(&closes)[4].is_anomaly());
    }
}
