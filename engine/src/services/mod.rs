// Request-level orchestration of the analysis pipeline
pub mod analysis_service;

pub use analysis_service::{AnalysisReport, AnalysisRequest, AnalysisService, Notice, Stage};
