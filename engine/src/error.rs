use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Narrative generation failed: {0}")]
    GenerationFailed(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Invalid analysis request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: reqwest::Error,
    },

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

/// What the caller should tell the user when a stage is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DataUnavailable,
    InsufficientData,
    GenerationFailed,
    Invalid,
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::DataUnavailable(_) | EngineError::HttpError { .. } => ErrorKind::DataUnavailable,
            EngineError::InsufficientData(_) | EngineError::DegenerateInput(_) => ErrorKind::InsufficientData,
            EngineError::GenerationFailed(_) => ErrorKind::GenerationFailed,
            EngineError::InvalidRequest(_) | EngineError::ConfigError(_) => ErrorKind::Invalid,
            EngineError::CsvSystemError { .. }
            | EngineError::IoError { .. }
            | EngineError::CsvDataFormatError(_)
            | EngineError::AnyhowError(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EngineError::DataUnavailable("x".into()).kind(), ErrorKind::DataUnavailable);
        assert_eq!(EngineError::InsufficientData("x".into()).kind(), ErrorKind::InsufficientData);
        assert_eq!(EngineError::DegenerateInput("x".into()).kind(), ErrorKind::InsufficientData);
        assert_eq!(EngineError::GenerationFailed("x".into()).kind(), ErrorKind::GenerationFailed);
        assert_eq!(EngineError::InvalidRequest("x".into()).kind(), ErrorKind::Invalid);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(EngineError::from(io).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::InsufficientData("need at least 2 prices, got 1".into());
        assert_eq!(err.to_string(), "Insufficient data: need at least 2 prices, got 1");
        let err = EngineError::CsvDataFormatError("bad row".into());
        assert_eq!(err.to_string(), "CSV data format error: bad row");
    }
}
