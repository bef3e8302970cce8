//! Document fetchers.
//!
//! A conversion is triggered by a link whose `from` end holds the
//! configuration document and whose `to` end holds the schema document.

use schemagraph::LinkId;
use serde_json::Value;

use crate::error::ConvertError;
use crate::storage::{GraphStore, Relationship};
use crate::trace::Trace;

/// The configuration document on the trigger's `from` end.
pub async fn config_document(
    store: &dyn GraphStore,
    trigger: LinkId,
    trace: &mut Trace,
) -> Result<Value, ConvertError> {
    fetch(store, trigger, Relationship::From, "configuration", trace).await
}

/// The schema document on the trigger's `to` end.
pub async fn schema_document(
    store: &dyn GraphStore,
    trigger: LinkId,
    trace: &mut Trace,
) -> Result<Value, ConvertError> {
    fetch(store, trigger, Relationship::To, "schema", trace).await
}

async fn fetch(
    store: &dyn GraphStore,
    trigger: LinkId,
    relationship: Relationship,
    document: &'static str,
    trace: &mut Trace,
) -> Result<Value, ConvertError> {
    let scope = "fetch";
    trace.log(
        scope,
        format!("{document} document via {relationship} end of #{trigger}"),
    );

    let found = store
        .fetch_by_relationship(trigger, relationship)
        .await?
        .ok_or_else(|| ConvertError::MissingDocument {
            document,
            detail: format!("link #{trigger} has no {relationship} end"),
        })?;

    match found.value {
        Some(value) if !value.is_null() => {
            let rendered = trace.inspect(&value);
            trace.log(scope, format!("#{} = {rendered}", found.link_id));
            Ok(value)
        }
        _ => Err(ConvertError::MissingDocument {
            document,
            detail: format!("link #{} must have a value", found.link_id),
        }),
    }
}
