//! Schema-to-graph materialization.
//!
//! [`Materializer::materialize`] walks a [`SchemaNode`] depth-first and
//! returns the operations that build it, parents before children. It never
//! talks to a store: ids come from an [`IdentifierPool`] reserved up front,
//! and the returned batch is applied by the caller in one step.
//!
//! Every entity (object, tuple, or scalar leaf) becomes the same group of
//! operations, in this order:
//!
//! ```text
//! Type      T   from/to = parent (absent at the root)
//! Contain   C   container -> T        value: name
//! Value     V   T -> String|Number|Object
//! Contain   VC  container -> V        value: name + "Value"
//! Required  R   from/to = parent      (required slots only)
//! Contain   RC  container -> R        value: name + "Required"
//! ```
//!
//! Object properties and tuple items follow, each parented on `T`. A list
//! (`items` with a single schema) adds nothing of its own and materializes its
//! item in the list's slot.

use crate::estimate::estimate;
use crate::ops::{LinkId, Operation, WellKnownIds};
use crate::pool::{IdentifierPool, PoolError};
use crate::schema::{Items, SchemaNode};

/// Contain-edge annotation for a root schema without a `title`.
pub const DEFAULT_ROOT_NAME: &str = "Schema";

/// Where a schema is being placed: under which parent, with which name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<'a> {
    /// Type node of the enclosing object or tuple; `None` at the root.
    pub parent: Option<LinkId>,
    /// Property name, used for every Contain annotation of the entity.
    pub name: &'a str,
    /// Whether the enclosing object lists `name` in `required`.
    pub required: bool,
}

impl<'a> Slot<'a> {
    /// The slot of a top-level schema.
    pub fn root(name: &'a str) -> Self {
        Self {
            parent: None,
            name,
            required: false,
        }
    }
}

/// Immutable context of one materialization run.
#[derive(Debug, Clone, Copy)]
pub struct Materializer {
    container: LinkId,
    kinds: WellKnownIds,
}

impl Materializer {
    /// `container` receives a Contain edge to every node produced.
    pub fn new(container: LinkId, kinds: WellKnownIds) -> Self {
        Self { container, kinds }
    }

    /// Operations that build `schema` in `slot`, consuming ids from `pool`.
    pub fn materialize(
        &self,
        schema: &SchemaNode,
        pool: &mut IdentifierPool,
        slot: Slot<'_>,
    ) -> Result<Vec<Operation>, PoolError> {
        match schema {
            SchemaNode::Boolean(_) => Ok(self.entity(pool, slot, self.kinds.object)?.0),
            SchemaNode::String { .. } => Ok(self.entity(pool, slot, self.kinds.string)?.0),
            SchemaNode::Number { .. } => Ok(self.entity(pool, slot, self.kinds.number)?.0),
            SchemaNode::Object {
                properties,
                required,
                ..
            } => {
                let (mut ops, type_id) = self.entity(pool, slot, self.kinds.object)?;
                for (name, child) in properties {
                    let child_slot = Slot {
                        parent: Some(type_id),
                        name,
                        required: required.contains(name),
                    };
                    ops.extend(self.materialize(child, pool, child_slot)?);
                }
                Ok(ops)
            }
            SchemaNode::Array {
                items: Items::Single(item),
                ..
            } => self.materialize(item, pool, slot),
            SchemaNode::Array {
                items: Items::Tuple(list),
                ..
            } => {
                let (mut ops, type_id) = self.entity(pool, slot, self.kinds.object)?;
                for (index, item) in list.iter().enumerate() {
                    let name = format!("{}[{}]", slot.name, index);
                    let item_slot = Slot {
                        parent: Some(type_id),
                        name: &name,
                        required: false,
                    };
                    ops.extend(self.materialize(item, pool, item_slot)?);
                }
                Ok(ops)
            }
            SchemaNode::Other => Ok(vec![]),
        }
    }

    /// The operation group of one entity. Returns it with the Type node id.
    fn entity(
        &self,
        pool: &mut IdentifierPool,
        slot: Slot<'_>,
        value_type: LinkId,
    ) -> Result<(Vec<Operation>, LinkId), PoolError> {
        let kinds = &self.kinds;
        let type_id = pool.pop()?;
        let contain_id = pool.pop()?;
        let value_id = pool.pop()?;
        let value_contain_id = pool.pop()?;

        let mut ops = vec![
            Operation::anchored(type_id, kinds.type_, slot.parent),
            Operation::edge(contain_id, kinds.contain, self.container, type_id),
            Operation::value(contain_id, slot.name),
            Operation::edge(value_id, kinds.value, type_id, value_type),
            Operation::edge(value_contain_id, kinds.contain, self.container, value_id),
            Operation::value(value_contain_id, format!("{}Value", slot.name)),
        ];

        if slot.required {
            let required_id = pool.pop()?;
            let required_contain_id = pool.pop()?;
            ops.extend([
                Operation::anchored(required_id, kinds.required, slot.parent),
                Operation::edge(required_contain_id, kinds.contain, self.container, required_id),
                Operation::value(required_contain_id, format!("{}Required", slot.name)),
            ]);
        }

        Ok((ops, type_id))
    }
}

/// Result of compiling a whole schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Type node of the root entity; `None` if nothing was materialized.
    pub root: Option<LinkId>,
    pub operations: Vec<Operation>,
}

/// Materialize `schema` at the root of `container` and check that `pool`
/// was drained exactly.
///
/// The root entity is annotated with the schema's `title`, or
/// [`DEFAULT_ROOT_NAME`] when it has none.
pub fn compile(
    schema: &SchemaNode,
    mut pool: IdentifierPool,
    container: LinkId,
    kinds: &WellKnownIds,
) -> Result<Compilation, PoolError> {
    let name = schema.title().unwrap_or(DEFAULT_ROOT_NAME);
    let operations =
        Materializer::new(container, *kinds).materialize(schema, &mut pool, Slot::root(name))?;
    pool.finish()?;
    let root = if schema.materializes() {
        operations.first().and_then(Operation::inserted_id)
    } else {
        None
    };
    Ok(Compilation { root, operations })
}

/// Compile against a synthetic pool of consecutive ids starting at `first_id`.
///
/// Useful for previewing a batch without a store.
pub fn plan(
    schema: &SchemaNode,
    first_id: LinkId,
    container: LinkId,
    kinds: &WellKnownIds,
) -> Result<Compilation, PoolError> {
    let pool = IdentifierPool::sequential(first_id, estimate(schema));
    compile(schema, pool, container, kinds)
}

// --- tests -------------------------------------------------------------------
