//! Converter configuration.
//!
//! Two layers:
//!
//! - [`ConverterSettings`]: process-wide, from command-line flags or
//!   environment variables (see `main.rs`).
//! - [`ConversionConfig`]: per conversion, read from the JSON document on the
//!   triggering link's `from` end.

use std::sync::Arc;

use schemagraph::{LinkId, CORE_NAMESPACE};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ConvertError;
use crate::storage::{memory::MemoryStore, sqlite::SqliteStore, GraphStore, StoreError};

/// Depth to which trace entries render JSON values unless configured.
pub const DEFAULT_LOG_DEPTH: usize = 3;

/// Process-wide settings.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SCHEMAGRAPH_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `SCHEMAGRAPH_NAMESPACE` | `@deep-foundation/core` | Namespace of the kind vocabulary |
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on exit).
    pub db_path: Option<String>,

    /// Namespace under which the well-known kinds are resolved.
    pub namespace: String,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            namespace: CORE_NAMESPACE.to_string(),
        }
    }
}

impl ConverterSettings {
    /// Open the configured store.
    pub fn open_store(&self) -> Result<Arc<dyn GraphStore>, StoreError> {
        match &self.db_path {
            Some(path) => {
                tracing::info!("storage: SQLite at {path}");
                let store = SqliteStore::open(path).map_err(|e| {
                    StoreError::Internal(format!("failed to open SQLite database at {path}: {e}"))
                })?;
                Ok(Arc::new(store))
            }
            None => {
                tracing::info!("storage: in-memory (data will not survive exit)");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

/// Settings of one conversion, from the configuration document.
///
/// ```json
/// { "containerLinkId": 42, "logDepth": 5 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionConfig {
    /// Node that receives a Contain edge to everything the schema produces.
    pub container_link_id: LinkId,

    /// Depth to which trace entries render JSON values.
    #[serde(default = "default_log_depth")]
    pub log_depth: usize,
}

fn default_log_depth() -> usize {
    DEFAULT_LOG_DEPTH
}

impl ConversionConfig {
    /// Read the configuration document.
    ///
    /// Fails with [`ConvertError::InvalidConfiguration`] when
    /// `containerLinkId` is missing, not a positive integer, or when a field
    /// has the wrong type.
    pub fn from_document(value: &Value) -> Result<Self, ConvertError> {
        let config: Self = serde_json::from_value(value.clone())
            .map_err(|e| ConvertError::InvalidConfiguration(e.to_string()))?;
        if config.container_link_id == 0 {
            return Err(ConvertError::InvalidConfiguration(
                "containerLinkId must be a positive link id".into(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_container_and_depth() {
        let c = ConversionConfig::from_document(&json!({ "containerLinkId": 42, "logDepth": 1 }))
            .unwrap();
        assert_eq!(c.container_link_id, 42);
        assert_eq!(c.log_depth, 1);
    }

    #[test]
    fn log_depth_defaults() {
        let c = ConversionConfig::from_document(&json!({ "containerLinkId": 9 })).unwrap();
        assert_eq!(c.log_depth, DEFAULT_LOG_DEPTH);
    }

    #[test]
    fn missing_container_is_invalid() {
        let err = ConversionConfig::from_document(&json!({ "logDepth": 2 })).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfiguration(_)));
    }

    #[test]
    fn zero_or_negative_container_is_invalid() {
        for bad in [json!({ "containerLinkId": 0 }), json!({ "containerLinkId": -4 })] {
            let err = ConversionConfig::from_document(&bad).unwrap_err();
            assert!(matches!(err, ConvertError::InvalidConfiguration(_)), "{bad}");
        }
    }

    #[test]
    fn default_settings_are_in_memory() {
        let s = ConverterSettings::default();
        assert!(s.db_path.is_none());
        assert_eq!(s.namespace, CORE_NAMESPACE);
        assert!(s.open_store().is_ok());
    }
}
