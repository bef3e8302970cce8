//! Errors of the conversion pipeline.
//!
//! Every failure aborts the whole conversion. The caller receives a
//! [`ConvertFailure`], which pairs the error with the trace collected up to
//! that point.

use schemagraph::PoolError;
use serde::Serialize;

use crate::storage::StoreError;

/// Why a conversion did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The schema or configuration document could not be located.
    #[error("{document} document is missing: {detail}")]
    MissingDocument {
        document: &'static str,
        detail: String,
    },

    /// The configuration document lacks a required field.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The estimator and the materializer disagreed about the schema.
    #[error("compilation aborted: {0}")]
    Compile(#[from] PoolError),

    /// The store refused the operation batch. Nothing was written.
    #[error("batch application failed: {0}")]
    BatchApplication(StoreError),

    /// Any other store call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConvertError {
    /// Short machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ConvertError::MissingDocument { .. } => "missing_document",
            ConvertError::InvalidConfiguration(_) => "invalid_configuration",
            ConvertError::Compile(_) => "pool_mismatch",
            ConvertError::BatchApplication(_) => "batch_application_failed",
            ConvertError::Store(_) => "store_error",
        }
    }
}

/// A failed conversion together with its trace.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ConvertFailure {
    #[source]
    pub error: ConvertError,
    pub logs: Vec<String>,
}

/// JSON body reported for a failed conversion.
///
/// ```json
/// { "error": "invalid configuration: ...", "code": "invalid_configuration", "logs": ["..."] }
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailureReport {
    pub error: String,
    pub code: String,
    pub logs: Vec<String>,
}

impl From<&ConvertFailure> for FailureReport {
    fn from(failure: &ConvertFailure) -> Self {
        Self {
            error: failure.error.to_string(),
            code: failure.error.code().to_string(),
            logs: failure.logs.clone(),
        }
    }
}
