//! Per-conversion trace buffer.
//!
//! Every conversion collects a list of `scope: message` strings. The list is
//! returned with the result, or attached to the error when the conversion
//! fails, so the caller can see what happened without access to the process
//! logs. Each entry is also emitted as a `tracing` debug event.

use std::fmt::Display;

use serde_json::Value;

use crate::config::DEFAULT_LOG_DEPTH;

/// Ordered diagnostic entries for one conversion.
#[derive(Debug, Clone)]
pub struct Trace {
    entries: Vec<String>,
    depth: usize,
}

impl Trace {
    /// An empty trace rendering JSON values down to `depth` levels.
    pub fn new(depth: usize) -> Self {
        Self {
            entries: Vec::new(),
            depth,
        }
    }

    /// Change how deep [`Trace::inspect`] renders from now on.
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Append `scope: message`.
    pub fn log(&mut self, scope: &str, message: impl Display) {
        let entry = format!("{scope}: {message}");
        tracing::debug!(target: "schemagraph_converter::trace", "{entry}");
        self.entries.push(entry);
    }

    /// Render a JSON value at this trace's depth.
    pub fn inspect(&self, value: &Value) -> String {
        inspect(value, self.depth)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_DEPTH)
    }
}

/// Render `value` on one line, eliding containers nested deeper than `depth`.
///
/// The top-level value is at depth 0. An object or array below the limit is
/// shown as `[Object]` or `[Array]`; scalars are always shown.
///
/// ```text
/// depth 0: { a: [Object], b: 1 }
/// depth 1: { a: { c: [Array] }, b: 1 }
/// ```
pub fn inspect(value: &Value, depth: usize) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0, depth);
    out
}

fn write_value(out: &mut String, value: &Value, level: usize, depth: usize) {
    match value {
        Value::Object(map) if map.is_empty() => out.push_str("{}"),
        Value::Array(list) if list.is_empty() => out.push_str("[]"),
        Value::Object(_) if level > depth => out.push_str("[Object]"),
        Value::Array(_) if level > depth => out.push_str("[Array]"),
        Value::Object(map) => {
            out.push_str("{ ");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(key);
                out.push_str(": ");
                write_value(out, item, level + 1, depth);
            }
            out.push_str(" }");
        }
        Value::Array(list) => {
            out.push_str("[ ");
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, level + 1, depth);
            }
            out.push_str(" ]");
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_are_scoped() {
        let mut t = Trace::default();
        t.log("fetch", "schema document");
        t.log("compile", format_args!("{} ids", 4));
        assert_eq!(t.entries(), ["fetch: schema document", "compile: 4 ids"]);
        assert_eq!(t.depth(), DEFAULT_LOG_DEPTH);
    }

    #[test]
    fn inspect_elides_below_depth() {
        let v = json!({ "a": { "c": [1, 2] }, "b": 1 });
        assert_eq!(inspect(&v, 0), "{ a: [Object], b: 1 }");
        assert_eq!(inspect(&v, 1), "{ a: { c: [Array] }, b: 1 }");
        assert_eq!(inspect(&v, 2), "{ a: { c: [ 1, 2 ] }, b: 1 }");
    }

    #[test]
    fn inspect_scalars_and_empties() {
        assert_eq!(inspect(&json!("x"), 0), "\"x\"");
        assert_eq!(inspect(&json!({ "a": {}, "b": [] }), 0), "{ a: {}, b: [] }");
        assert_eq!(inspect(&json!(null), 3), "null");
    }

    #[test]
    fn set_depth_changes_rendering() {
        let mut t = Trace::new(0);
        let v = json!({ "a": { "b": true } });
        assert_eq!(t.inspect(&v), "{ a: [Object] }");
        t.set_depth(5);
        assert_eq!(t.inspect(&v), "{ a: { b: true } }");
    }
}
