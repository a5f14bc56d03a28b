//! Error handling for visflow
//!
//! This module defines the crate-level error type and a Result alias used by
//! configuration, logging and the demo binary. Execution signals raised while
//! operations run live in [`crate::pipeline::ExecutionError`].

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for visflow operations
#[derive(Error, Debug)]
pub enum VisflowError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised while building or driving an operation graph
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to logging setup
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VisflowError>,
    },
}

impl VisflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VisflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for visflow operations
pub type Result<T> = std::result::Result<T, VisflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| VisflowError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VisflowError::from(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VisflowError::Config("missing queue capacity".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: missing queue capacity"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = VisflowError::Logging("bad filter".to_string());
        let with_ctx = err.with_context("Failed to start");
        assert!(with_ctx.to_string().contains("Failed to start"));
        assert!(with_ctx.to_string().contains("bad filter"));
    }

    #[test]
    fn test_pipeline_error_context() {
        let result: std::result::Result<(), PipelineError> = Err(PipelineError::CycleDetected);
        let err = result.context("Building graph").unwrap_err();
        assert!(err.to_string().starts_with("Building graph"));
        assert!(err.to_string().contains("Cycle"));
    }
}
