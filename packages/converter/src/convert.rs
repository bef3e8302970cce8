//! The conversion pipeline.
//!
//! [`Converter::convert`] runs one conversion for a triggering link:
//!
//! 1. Fetch and parse the configuration document.
//! 2. Fetch the schema document and classify it.
//! 3. Resolve every well-known kind id once.
//! 4. Estimate the id demand and reserve exactly that many ids.
//! 5. Compile the schema into one operation batch.
//! 6. Apply the batch atomically.
//!
//! Any failure aborts the conversion. Nothing is written before step 6, and
//! step 6 is all-or-nothing, so a failed conversion leaves no partial graph.
//! There are no retries.

use std::collections::HashMap;
use std::sync::Arc;

use schemagraph::{
    compile, estimate, IdentifierPool, LinkId, SchemaNode, WellKnown, WellKnownIds,
    CORE_NAMESPACE,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{ConversionConfig, DEFAULT_LOG_DEPTH};
use crate::error::{ConvertError, ConvertFailure};
use crate::fetch;
use crate::storage::{GraphStore, StoreError};
use crate::trace::Trace;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Summary of a completed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertReport {
    /// Type node of the schema root; `None` for schemas with no materialized shape.
    pub root_link_id: Option<LinkId>,
    pub container_link_id: LinkId,
    /// Ids reserved, equal to the ids inserted.
    pub reserved: usize,
    /// Operations in the applied batch.
    pub operations: usize,
}

/// A completed conversion together with its trace.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertOutcome {
    pub result: ConvertReport,
    pub logs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Runs conversions against one store.
pub struct Converter {
    store: Arc<dyn GraphStore>,
    namespace: String,
}

impl Converter {
    /// A converter resolving kinds in [`CORE_NAMESPACE`].
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_namespace(store, CORE_NAMESPACE)
    }

    pub fn with_namespace(store: Arc<dyn GraphStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Convert the schema attached to `trigger`.
    pub async fn convert(&self, trigger: LinkId) -> Result<ConvertOutcome, ConvertFailure> {
        let mut trace = Trace::new(DEFAULT_LOG_DEPTH);
        match self.run(trigger, &mut trace).await {
            Ok(result) => {
                info!(
                    trigger,
                    operations = result.operations,
                    "conversion committed"
                );
                Ok(ConvertOutcome {
                    result,
                    logs: trace.into_entries(),
                })
            }
            Err(error) => {
                warn!(trigger, code = error.code(), "conversion failed: {error}");
                trace.log("convert", format!("failed: {error}"));
                Err(ConvertFailure {
                    error,
                    logs: trace.into_entries(),
                })
            }
        }
    }

    async fn run(&self, trigger: LinkId, trace: &mut Trace) -> Result<ConvertReport, ConvertError> {
        let store = self.store.as_ref();

        let config_doc = fetch::config_document(store, trigger, trace).await?;
        let config = ConversionConfig::from_document(&config_doc)?;
        trace.set_depth(config.log_depth);
        trace.log("config", format!("{config:?}"));

        let schema_doc = fetch::schema_document(store, trigger, trace).await?;
        let schema = SchemaNode::from(&schema_doc);

        let kinds = resolve_well_known_ids(store, &self.namespace).await?;
        trace.log("kinds", format!("{kinds:?}"));

        let count = estimate(&schema);
        trace.log("estimate", format!("{count} ids"));
        let ids = if count == 0 {
            Vec::new()
        } else {
            store.reserve_ids(count).await?
        };

        let compiled = compile(
            &schema,
            IdentifierPool::new(ids),
            config.container_link_id,
            &kinds,
        )?;
        trace.log(
            "compile",
            format!(
                "{} operations, root {:?}",
                compiled.operations.len(),
                compiled.root
            ),
        );

        if !compiled.operations.is_empty() {
            store
                .apply_batch(&compiled.operations)
                .await
                .map_err(ConvertError::BatchApplication)?;
        }
        trace.log("apply", "committed");

        Ok(ConvertReport {
            root_link_id: compiled.root,
            container_link_id: config.container_link_id,
            reserved: count,
            operations: compiled.operations.len(),
        })
    }
}

/// Look up every [`WellKnown`] kind in `namespace`, once each.
pub async fn resolve_well_known_ids(
    store: &dyn GraphStore,
    namespace: &str,
) -> Result<WellKnownIds, StoreError> {
    let mut resolved = HashMap::new();
    for kind in WellKnown::ALL {
        let id = store.resolve_well_known_id(namespace, kind.name()).await?;
        resolved.insert(kind, id);
    }
    WellKnownIds::try_from_fn(|kind| {
        resolved
            .get(&kind)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("{namespace}/{kind}")))
    })
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

/// Links created by [`stage_conversion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedConversion {
    pub trigger_link_id: LinkId,
    pub config_link_id: LinkId,
    pub schema_link_id: LinkId,
    pub container_link_id: LinkId,
}

/// Create the links a conversion reads: a container (unless `container` is
/// given), a configuration document pointing at it, the schema document, and
/// a trigger link from the configuration to the schema.
///
/// Staged nodes are plain `Type`-kind nodes of `namespace`.
pub async fn stage_conversion(
    store: &dyn GraphStore,
    namespace: &str,
    schema: &Value,
    container: Option<LinkId>,
) -> Result<StagedConversion, StoreError> {
    let type_id = store
        .resolve_well_known_id(namespace, WellKnown::Type.name())
        .await?;

    let container = match container {
        Some(id) => id,
        None => store.insert_link(type_id, None, None).await?,
    };

    let config = store.insert_link(type_id, None, None).await?;
    store
        .set_object_value(config, &serde_json::json!({ "containerLinkId": container }))
        .await?;

    let schema_link = store.insert_link(type_id, None, None).await?;
    store.set_object_value(schema_link, schema).await?;

    let trigger = store
        .insert_link(type_id, Some(config), Some(schema_link))
        .await?;

    Ok(StagedConversion {
        trigger_link_id: trigger,
        config_link_id: config,
        schema_link_id: schema_link,
        container_link_id: container,
    })
}
