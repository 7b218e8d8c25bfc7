// Engine library root
// Price-series statistics, anomaly detection and findings generation.

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod narrative;
pub mod services;
