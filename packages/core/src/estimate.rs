//! Identifier demand of a schema, computed before anything is reserved.
//!
//! The store hands out ids in one atomic reservation, so the number needed
//! must be known before materialization starts. [`estimate`] walks the same
//! shapes as [`crate::materialize`] and must agree with it exactly: a pool
//! sized by `estimate(s)` is drained to empty by materializing `s`.

use crate::schema::{Items, SchemaNode};

/// Ids consumed by one entity: Type node, its Contain edge, Value node, and
/// the Value node's Contain edge.
pub const K_LEAF: usize = 4;

/// Extra ids for a required property: Required node and its Contain edge.
pub const K_REQUIRED: usize = 2;

/// Number of ids materializing `schema` will consume.
pub fn estimate(schema: &SchemaNode) -> usize {
    match schema {
        SchemaNode::Boolean(_) | SchemaNode::String { .. } | SchemaNode::Number { .. } => K_LEAF,
        SchemaNode::Object {
            properties,
            required,
            ..
        } => {
            K_LEAF
                + properties
                    .iter()
                    .map(|(name, child)| estimate_slot(child, required.contains(name)))
                    .sum::<usize>()
        }
        SchemaNode::Array { items, .. } => match items {
            Items::Single(item) => estimate(item),
            Items::Tuple(list) => K_LEAF + list.iter().map(estimate).sum::<usize>(),
        },
        SchemaNode::Other => 0,
    }
}

/// Demand of a schema placed in a property slot.
///
/// A required marker is only emitted alongside a materialized entity.
fn estimate_slot(schema: &SchemaNode, required: bool) -> usize {
    let marker = if required && schema.materializes() {
        K_REQUIRED
    } else {
        0
    };
    estimate(schema) + marker
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn est(value: serde_json::Value) -> usize {
        estimate(&SchemaNode::from(value))
    }

    #[test]
    fn leaves() {
        assert_eq!(est(json!(true)), K_LEAF);
        assert_eq!(est(json!(false)), K_LEAF);
        assert_eq!(est(json!({ "type": "string" })), K_LEAF);
        assert_eq!(est(json!({ "type": "number" })), K_LEAF);
    }

    #[test]
    fn unknown_shapes_cost_nothing() {
        assert_eq!(est(json!({})), 0);
        assert_eq!(est(json!({ "type": "boolean" })), 0);
    }

    #[test]
    fn object_counts_required_markers() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "string" }, "b": { "type": "string" } },
            "required": ["a"]
        });
        assert_eq!(est(schema), K_LEAF + (K_LEAF + K_REQUIRED) + K_LEAF);
    }

    #[test]
    fn required_name_without_property_is_ignored() {
        let schema = json!({ "properties": { "a": true }, "required": ["missing"] });
        assert_eq!(est(schema), 2 * K_LEAF);
    }

    #[test]
    fn required_unmaterialized_property_has_no_marker() {
        let schema = json!({ "properties": { "a": { "type": "null" } }, "required": ["a"] });
        assert_eq!(est(schema), K_LEAF);
    }

    #[test]
    fn list_is_transparent() {
        assert_eq!(est(json!({ "items": { "type": "number" } })), K_LEAF);
        assert_eq!(est(json!({ "type": "array" })), K_LEAF);
    }

    #[test]
    fn tuple_counts_wrapper_and_items() {
        let schema = json!({ "type": "array", "items": [{ "type": "string" }, { "type": "number" }] });
        assert_eq!(est(schema), 3 * K_LEAF);
    }

    #[test]
    fn nested_objects() {
        let schema = json!({
            "type": "object",
            "properties": {
                "inner": {
                    "type": "object",
                    "properties": { "x": { "type": "number" } },
                    "required": ["x"]
                }
            },
            "required": ["inner"]
        });
        // root + (inner + marker) + (x + marker)
        assert_eq!(est(schema), K_LEAF + (K_LEAF + K_REQUIRED) + (K_LEAF + K_REQUIRED));
    }
}
