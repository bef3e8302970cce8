//! Human-readable text rendering of operation batches.
//!
//! The output is stable plain text for terminals and logs. It is not a
//! canonical format; only the JSON serialisation of [`Operation`] is.

use crate::ops::{LinkId, Operation, WellKnownIds};

/// Render a batch, one operation per line.
///
/// Kind ids that belong to the well-known vocabulary are shown by name.
///
/// ```text
///   #12 Type
///   #11 Contain    #500 -> #12
///       = "Order"
///   #10 Value      #12 -> Object
/// ```
pub fn render_batch(ops: &[Operation], kinds: &WellKnownIds) -> String {
    let mut out = String::new();
    for op in ops {
        out.push_str(&render_operation(op, kinds));
        out.push('\n');
    }
    out
}

/// Render a single operation without a trailing newline.
pub fn render_operation(op: &Operation, kinds: &WellKnownIds) -> String {
    match op {
        Operation::InsertNode { id, kind, from, to } => {
            let head = format!("{:>5} {:<10}", format!("#{id}"), label(*kind, kinds));
            match (from, to) {
                (Some(f), Some(t)) if f == t => {
                    format!("{head} @ {}", label(*f, kinds))
                }
                (Some(f), Some(t)) => {
                    format!("{head} {} -> {}", label(*f, kinds), label(*t, kinds))
                }
                (Some(f), None) => format!("{head} {} ->", label(*f, kinds)),
                (None, Some(t)) => format!("{head} -> {}", label(*t, kinds)),
                (None, None) => head.trim_end().to_string(),
            }
        }
        Operation::InsertValue { value, .. } => {
            format!("      = {:?}", value)
        }
    }
}

/// Kind name for well-known ids, `#123` otherwise.
fn label(id: LinkId, kinds: &WellKnownIds) -> String {
    match kinds.kind_of(id) {
        Some(kind) => kind.name().to_string(),
        None => format!("#{id}"),
    }
}

// --- tests -------------------------------------------------------------------
