//! Mutation operations and the well-known kind vocabulary.
//!
//! A compiled schema is an ordered list of [`Operation`]s. The graph store
//! applies the list as one atomic batch. Operations serialise to JSON as
//! objects tagged by `"op"`:
//!
//! ```json
//! { "op": "insert-node", "id": 42, "kind": 1, "from": 7, "to": 7 }
//! { "op": "insert-value", "target": 43, "value": "address" }
//! ```

use serde::{Deserialize, Serialize};

/// Identifier of a node (or edge-like node) in the graph store.
pub type LinkId = u64;

/// Namespace that owns the built-in kind markers.
pub const CORE_NAMESPACE: &str = "@deep-foundation/core";

/// One unit of a mutation batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Operation {
    /// Insert a node tagged with `kind`. Edge-like nodes carry `from`/`to`.
    InsertNode {
        id: LinkId,
        kind: LinkId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<LinkId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<LinkId>,
    },
    /// Attach a string payload to a node inserted earlier.
    InsertValue { target: LinkId, value: String },
}

impl Operation {
    /// An unattached node.
    pub fn node(id: LinkId, kind: LinkId) -> Self {
        Operation::InsertNode {
            id,
            kind,
            from: None,
            to: None,
        }
    }

    /// An edge-like node from `from` to `to`.
    pub fn edge(id: LinkId, kind: LinkId, from: LinkId, to: LinkId) -> Self {
        Operation::InsertNode {
            id,
            kind,
            from: Some(from),
            to: Some(to),
        }
    }

    /// A node that loops on `anchor` when one is given, or stands alone.
    pub fn anchored(id: LinkId, kind: LinkId, anchor: Option<LinkId>) -> Self {
        Operation::InsertNode {
            id,
            kind,
            from: anchor,
            to: anchor,
        }
    }

    pub fn value(target: LinkId, value: impl Into<String>) -> Self {
        Operation::InsertValue {
            target,
            value: value.into(),
        }
    }

    /// The id this operation creates, if any.
    pub fn inserted_id(&self) -> Option<LinkId> {
        match self {
            Operation::InsertNode { id, .. } => Some(*id),
            Operation::InsertValue { .. } => None,
        }
    }

    /// Every existing id this operation refers to.
    pub fn references(&self) -> Vec<LinkId> {
        match self {
            Operation::InsertNode { kind, from, to, .. } => std::iter::once(*kind)
                .chain(*from)
                .chain(*to)
                .collect(),
            Operation::InsertValue { target, .. } => vec![*target],
        }
    }
}

/// The built-in kinds the compiler emits, by name within [`CORE_NAMESPACE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnown {
    Type,
    Contain,
    Required,
    Value,
    String,
    Number,
    Object,
}

impl WellKnown {
    pub const ALL: [WellKnown; 7] = [
        WellKnown::Type,
        WellKnown::Contain,
        WellKnown::Required,
        WellKnown::Value,
        WellKnown::String,
        WellKnown::Number,
        WellKnown::Object,
    ];

    /// The name under which the store registers this kind.
    pub fn name(self) -> &'static str {
        match self {
            WellKnown::Type => "Type",
            WellKnown::Contain => "Contain",
            WellKnown::Required => "Required",
            WellKnown::Value => "Value",
            WellKnown::String => "String",
            WellKnown::Number => "Number",
            WellKnown::Object => "Object",
        }
    }
}

impl std::fmt::Display for WellKnown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved ids of every [`WellKnown`] kind, looked up once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownIds {
    #[serde(rename = "type")]
    pub type_: LinkId,
    pub contain: LinkId,
    pub required: LinkId,
    pub value: LinkId,
    pub string: LinkId,
    pub number: LinkId,
    pub object: LinkId,
}

impl WellKnownIds {
    /// Build the table from a lookup function, failing on the first error.
    pub fn try_from_fn<E>(mut lookup: impl FnMut(WellKnown) -> Result<LinkId, E>) -> Result<Self, E> {
        Ok(Self {
            type_: lookup(WellKnown::Type)?,
            contain: lookup(WellKnown::Contain)?,
            required: lookup(WellKnown::Required)?,
            value: lookup(WellKnown::Value)?,
            string: lookup(WellKnown::String)?,
            number: lookup(WellKnown::Number)?,
            object: lookup(WellKnown::Object)?,
        })
    }

    pub fn get(&self, kind: WellKnown) -> LinkId {
        match kind {
            WellKnown::Type => self.type_,
            WellKnown::Contain => self.contain,
            WellKnown::Required => self.required,
            WellKnown::Value => self.value,
            WellKnown::String => self.string,
            WellKnown::Number => self.number,
            WellKnown::Object => self.object,
        }
    }

    /// Reverse lookup: which well-known kind has this id.
    pub fn kind_of(&self, id: LinkId) -> Option<WellKnown> {
        WellKnown::ALL.into_iter().find(|k| self.get(*k) == id)
    }

    /// Ids `1..=7` in [`WellKnown::ALL`] order. Matches the bootstrap
    /// vocabulary of the bundled stores.
    pub fn bootstrap() -> Self {
        Self {
            type_: 1,
            contain: 2,
            required: 3,
            value: 4,
            string: 5,
            number: 6,
            object: 7,
        }
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_node_wire_format() {
        let op = Operation::edge(42, 2, 7, 9);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "op": "insert-node", "id": 42, "kind": 2, "from": 7, "to": 9 })
        );
    }

    #[test]
    fn unattached_node_omits_ends() {
        let json = serde_json::to_value(Operation::node(5, 1)).unwrap();
        assert_eq!(json, serde_json::json!({ "op": "insert-node", "id": 5, "kind": 1 }));
    }

    #[test]
    fn insert_value_parses() {
        let op: Operation =
            serde_json::from_str(r#"{"op":"insert-value","target":3,"value":"name"}"#).unwrap();
        assert_eq!(op, Operation::value(3, "name"));
    }

    #[test]
    fn references_include_kind_and_ends() {
        assert_eq!(Operation::edge(10, 2, 3, 4).references(), vec![2, 3, 4]);
        assert_eq!(Operation::node(10, 1).references(), vec![1]);
        assert_eq!(Operation::value(10, "x").references(), vec![10]);
    }

    #[test]
    fn bootstrap_ids_follow_declaration_order() {
        let ids = WellKnownIds::bootstrap();
        assert_eq!(ids.type_, 1);
        assert_eq!(ids.object, 7);
        assert_eq!(ids.kind_of(3), Some(WellKnown::Required));
        assert_eq!(ids.kind_of(99), None);
    }
}
