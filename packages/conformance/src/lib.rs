//! Shared helpers for the schema conversion conformance suite.
//!
//! Every check runs once per bundled store. [`stores`] returns a fresh
//! instance of each, and [`Harness`] stages a schema in one of them, runs the
//! conversion, and reads the produced structure back through the
//! [`GraphStore`] trait only.

use std::collections::BTreeMap;
use std::sync::Arc;

use schemagraph::{LinkId, WellKnownIds, CORE_NAMESPACE};
use schemagraph_converter::{
    resolve_well_known_ids, stage_conversion, ConvertFailure, ConvertOutcome, Converter,
    GraphStore, MemoryStore, SqliteStore, StagedConversion,
};
use serde_json::Value;

/// A fresh instance of every bundled store, labelled for assertion messages.
///
/// # Panics
///
/// Panics if the in-memory SQLite database cannot be opened.
pub fn stores() -> Vec<(&'static str, Arc<dyn GraphStore>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new()) as Arc<dyn GraphStore>),
        (
            "sqlite",
            Arc::new(SqliteStore::open_in_memory().expect("open in-memory SQLite"))
                as Arc<dyn GraphStore>,
        ),
    ]
}

/// One store with a staged schema.
pub struct Harness {
    pub label: &'static str,
    pub store: Arc<dyn GraphStore>,
    pub staged: StagedConversion,
    pub kinds: WellKnownIds,
    /// Link count right after staging.
    pub baseline: usize,
}

impl Harness {
    /// Stage `schema` under a fresh container.
    pub async fn stage(label: &'static str, store: Arc<dyn GraphStore>, schema: &Value) -> Self {
        let staged = stage_conversion(store.as_ref(), CORE_NAMESPACE, schema, None)
            .await
            .unwrap_or_else(|e| panic!("[{label}] staging failed: {e}"));
        let kinds = resolve_well_known_ids(store.as_ref(), CORE_NAMESPACE)
            .await
            .unwrap_or_else(|e| panic!("[{label}] kind lookup failed: {e}"));
        let baseline = store.count_links().await.expect("count links");
        Self {
            label,
            store,
            staged,
            kinds,
            baseline,
        }
    }

    /// Run the conversion for the staged trigger.
    pub async fn convert(&self) -> Result<ConvertOutcome, ConvertFailure> {
        Converter::new(Arc::clone(&self.store))
            .convert(self.staged.trigger_link_id)
            .await
    }

    /// Links added since staging.
    pub async fn added(&self) -> usize {
        self.store.count_links().await.expect("count links") - self.baseline
    }

    /// Links of `kind` created after staging, ordered by id.
    pub async fn created_of_kind(&self, kind: LinkId) -> Vec<schemagraph_converter::storage::Link> {
        self.store
            .links_of_kind(kind)
            .await
            .expect("links of kind")
            .into_iter()
            .filter(|l| l.id > self.staged.trigger_link_id)
            .collect()
    }

    /// Annotation string of every Contain edge leaving the container, keyed
    /// by the annotation, mapped to the edge's target.
    pub async fn annotations(&self) -> BTreeMap<String, LinkId> {
        let mut out = BTreeMap::new();
        for link in self.created_of_kind(self.kinds.contain).await {
            if link.from != Some(self.staged.container_link_id) {
                continue;
            }
            if let (Some(value), Some(target)) = (
                self.store
                    .get_string_value(link.id)
                    .await
                    .expect("string value"),
                link.to,
            ) {
                out.insert(value, target);
            }
        }
        out
    }
}
