use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One daily observation of an asset price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDate,
    pub open: f64,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDate, open: f64, close: f64) -> Self {
        Self { timestamp, open, close }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnKind {
    Simple,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub timestamp: NaiveDate,
    pub simple_return: f64,
    pub log_return: f64,
}

// Returns between consecutive price points; the first price contributes none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new(points: Vec<ReturnPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn simple(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.simple_return).collect()
    }

    pub fn log(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.log_return).collect()
    }

    pub fn values(&self, kind: ReturnKind) -> Vec<f64> {
        match kind {
            ReturnKind::Simple => self.simple(),
            ReturnKind::Log => self.log(),
        }
    }

    pub fn timestamps(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.timestamp).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalityVerdict {
    LikelyNormal,
    LikelyNotNormal,
}

impl NormalityVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalityVerdict::LikelyNormal => "likely normal",
            NormalityVerdict::LikelyNotNormal => "likely not normal",
        }
    }
}

impl fmt::Display for NormalityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub jarque_bera_stat: f64,
    pub jarque_bera_pvalue: f64,
    pub inter_quantile_05: f64,
    pub normality_verdict: NormalityVerdict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl AnomalyLabel {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, AnomalyLabel::Anomalous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub timestamp: NaiveDate,
    pub close: f64,
    pub score: f64,
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyMonthBucket {
    pub year: i32,
    pub month: u32,
    pub month_label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
    pub p_value: f64,
    pub std_err: f64,
    // Only set by the train/test variant: R² on the held-out partition.
    pub accuracy_score: Option<f64>,
}

// Market-wide figures reported by the chain explorer. Any field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub high_24h: Option<f64>,
    pub high_all: Option<f64>,
    pub low_24h: Option<f64>,
    pub low_all: Option<f64>,
    pub change_24: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsField {
    pub label: String,
    pub value: String,
}

/// Flat, already formatted record handed to the narrative generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub fields: Vec<FindingsField>,
}

impl FindingsSummary {
    pub fn push(&mut self, label: &str, value: String) {
        self.fields.push(FindingsField {
            label: label.to_string(),
            value,
        });
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    pub fn to_prompt_block(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("- {}: {}\n", f.label, f.value))
            .collect()
    }
}
