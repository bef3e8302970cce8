//! JSON-Schema documents as a closed set of shapes.
//!
//! A schema is classified once, when it is read, into a [`SchemaNode`]. The
//! estimator and the materializer then dispatch on the variant instead of
//! probing the document for `properties` or `items` again.
//!
//! Only the draft-7 keywords the compiler consumes are read: `type`,
//! `properties`, `required`, `items` and `title`. Everything else is ignored,
//! and a document that fits none of the shapes becomes [`SchemaNode::Other`]
//! rather than an error.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

/// A schema document classified by shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum SchemaNode {
    /// The literal `true` or `false` schema.
    Boolean(bool),
    /// A schema with `properties` or `type: "object"`.
    Object {
        title: Option<String>,
        /// Properties in declared order.
        properties: Vec<(String, SchemaNode)>,
        required: BTreeSet<String>,
    },
    /// A schema with `items` or `type: "array"`.
    Array { title: Option<String>, items: Items },
    String { title: Option<String> },
    /// `type: "number"` or `type: "integer"`.
    Number { title: Option<String> },
    /// Any shape the compiler does not materialize.
    Other,
}

/// The `items` keyword of an array schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    /// Every element matches one schema (a list).
    Single(Box<SchemaNode>),
    /// Elements match positionally (a tuple).
    Tuple(Vec<SchemaNode>),
}

impl SchemaNode {
    /// Parse a schema from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The `title` keyword, if the shape carries one.
    pub fn title(&self) -> Option<&str> {
        match self {
            SchemaNode::Object { title, .. }
            | SchemaNode::Array { title, .. }
            | SchemaNode::String { title }
            | SchemaNode::Number { title } => title.as_deref(),
            SchemaNode::Boolean(_) | SchemaNode::Other => None,
        }
    }

    /// Whether materializing this schema produces a Type node.
    ///
    /// Lists are transparent, so they defer to their item schema.
    pub fn materializes(&self) -> bool {
        match self {
            SchemaNode::Other => false,
            SchemaNode::Array {
                items: Items::Single(item),
                ..
            } => item.materializes(),
            _ => true,
        }
    }
}

impl From<Value> for SchemaNode {
    fn from(value: Value) -> Self {
        SchemaNode::from(&value)
    }
}

impl From<&Value> for SchemaNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => SchemaNode::Boolean(*b),
            Value::Object(map) => classify(map),
            _ => SchemaNode::Other,
        }
    }
}

// --- helpers -----------------------------------------------------------------

fn classify(map: &Map<String, Value>) -> SchemaNode {
    let types = declared_types(map.get("type"));
    let title = map.get("title").and_then(Value::as_str).map(str::to_owned);

    if types.contains(&"object") || map.contains_key("properties") {
        return SchemaNode::Object {
            title,
            properties: properties(map.get("properties")),
            required: required(map.get("required")),
        };
    }

    if types.contains(&"array") || map.contains_key("items") {
        let items = match map.get("items") {
            Some(Value::Array(list)) => Items::Tuple(list.iter().map(SchemaNode::from).collect()),
            Some(item) => Items::Single(Box::new(SchemaNode::from(item))),
            // An absent `items` admits anything, like the `true` schema.
            None => Items::Single(Box::new(SchemaNode::Boolean(true))),
        };
        return SchemaNode::Array { title, items };
    }

    if types.contains(&"string") {
        return SchemaNode::String { title };
    }

    if types.contains(&"number") || types.contains(&"integer") {
        return SchemaNode::Number { title };
    }

    SchemaNode::Other
}

/// `type` as a list of names; a single string becomes a one-element list.
fn declared_types(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(list)) => list.iter().filter_map(Value::as_str).collect(),
        _ => vec![],
    }
}

fn properties(value: Option<&Value>) -> Vec<(String, SchemaNode)> {
    match value {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, schema)| (name.clone(), SchemaNode::from(schema)))
            .collect(),
        _ => vec![],
    }
}

fn required(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => BTreeSet::new(),
    }
}

// --- tests -------------------------------------------------------------------
