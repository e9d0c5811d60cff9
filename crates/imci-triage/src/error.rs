use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::triage::{RuleLoadError, TriageServiceError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Rules(RuleLoadError),
    Batch(csv::Error),
    Input(serde_json::Error),
    Triage(TriageServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Rules(err) => write!(f, "rule error: {}", err),
            AppError::Batch(err) => write!(f, "invalid patient batch: {}", err),
            AppError::Input(err) => write!(f, "invalid patient fields: {}", err),
            AppError::Triage(err) => write!(f, "triage error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Rules(err) => Some(err),
            AppError::Batch(err) => Some(err),
            AppError::Input(err) => Some(err),
            AppError::Triage(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<RuleLoadError> for AppError {
    fn from(value: RuleLoadError) -> Self {
        Self::Rules(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Batch(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Input(value)
    }
}

impl From<TriageServiceError> for AppError {
    fn from(value: TriageServiceError) -> Self {
        Self::Triage(value)
    }
}
