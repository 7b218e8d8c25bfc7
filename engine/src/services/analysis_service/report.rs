use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::models::{
    AnomalyMonthBucket, AnomalyRecord, FindingsSummary, NetworkMetrics, RegressionResult, StatsSummary,
};
use uuid::Uuid;

use crate::config::settings::AssetSettings;
use crate::error::{EngineError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    // Benchmark the asset's beta is measured against.
    pub market_symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisRequest {
    pub fn from_settings(asset: &AssetSettings, end: NaiveDate) -> Self {
        AnalysisRequest {
            symbol: asset.symbol.clone(),
            market_symbol: asset.market_symbol.clone(),
            start: asset.start_date,
            end,
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<(), EngineError> {
        if self.symbol.trim().is_empty() {
            return Err(EngineError::InvalidRequest("Symbol must not be empty".to_string()));
        }
        if self.start > self.end {
            return Err(EngineError::InvalidRequest(format!(
                "Start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if self.end > today {
            return Err(EngineError::InvalidRequest(format!(
                "End date {} is in the future (today is {})",
                self.end, today
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Load,
    Returns,
    Statistics,
    Beta,
    OpenCloseModel,
    NetworkMetrics,
    Narrative,
}

/// A stage that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl Notice {
    pub fn from_error(stage: Stage, error: &EngineError) -> Self {
        Notice {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

// Location and population scale of a normal distribution fitted to log returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalFit {
    pub mu: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub request: AnalysisRequest,
    pub points: usize,
    pub simple_stats: Option<StatsSummary>,
    pub log_stats: Option<StatsSummary>,
    pub normal_fit: Option<NormalFit>,
    pub anomalies: Vec<AnomalyRecord>,
    pub anomaly_months: Vec<AnomalyMonthBucket>,
    pub beta: Option<RegressionResult>,
    pub open_close: Option<RegressionResult>,
    pub network: Option<NetworkMetrics>,
    pub findings: Option<FindingsSummary>,
    pub findings_narrative: Option<String>,
    pub anomaly_narrative: Option<String>,
    pub notices: Vec<Notice>,
}

impl AnalysisReport {
    pub fn new(run_id: Uuid, request: AnalysisRequest) -> Self {
        AnalysisReport {
            run_id,
            request,
            points: 0,
            simple_stats: None,
            log_stats: None,
            normal_fit: None,
            anomalies: Vec::new(),
            anomaly_months: Vec::new(),
            beta: None,
            open_close: None,
            network: None,
            findings: None,
            findings_narrative: None,
            anomaly_narrative: None,
            notices: Vec::new(),
        }
    }

    /// Keeps the value on success; on failure logs the error and records a notice for `stage`.
    pub fn record<T>(&mut self, stage: Stage, result: Result<T, EngineError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(?stage, kind = ?e.kind(), error = %e, "Stage skipped");
                self.notices.push(Notice::from_error(stage, &e));
                None
            }
        }
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.iter().filter(|r| r.is_anomaly).count()
    }
}
