// Statistical transforms over a price series
pub mod anomaly;
pub mod anomaly_summary;
pub mod findings;
pub mod regression;
pub mod returns;
pub mod statistics;

pub use anomaly::{detect_anomalies, AnomalyDetector, Contamination, IsolationForest};
pub use anomaly_summary::{group_by_month, parse_month_label, sort_chronologically, summarize_anomalies, MonthKey};
pub use findings::{aggregate_findings, FindingsInput};
pub use regression::{align_returns, linear_regression, market_sensitivity, open_close_model, predictive_fit};
pub use returns::compute_returns;
pub use statistics::{describe, describe_returns, normal_fit};
