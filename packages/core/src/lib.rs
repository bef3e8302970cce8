//! Schema-to-graph compiler.
//!
//! This crate turns a JSON-Schema document into an ordered batch of graph
//! mutations. It does no I/O: the caller reserves ids from its graph store,
//! hands them to the compiler as an [`IdentifierPool`], and applies the
//! resulting [`Operation`]s as one atomic batch.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`schema`] | [`SchemaNode`]: a schema document classified by shape |
//! | [`estimate`] | [`estimate()`]: how many ids a schema will consume |
//! | [`materialize`] | [`Materializer`] and [`compile`]: the operation batch |
//! | [`pool`] | [`IdentifierPool`]: the reserved ids, consumed in order |
//! | [`ops`] | [`Operation`] and the [`WellKnownIds`] kind vocabulary |
//! | [`verify`] | Referential ordering check via [`verify_batch`] |
//! | [`render`] | Human-readable text rendering of batches |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use schemagraph::{compile, estimate, IdentifierPool, SchemaNode, WellKnownIds};
//!
//! let schema = SchemaNode::from_json(r#"{"title":"Point","properties":{"x":{"type":"number"}}}"#)?;
//!
//! // Reserve exactly this many ids from the store.
//! let count = estimate(&schema);
//! let ids = store.reserve_ids(count).await?;
//!
//! let batch = compile(&schema, IdentifierPool::new(ids), container_id, &kinds)?;
//! store.apply_batch(&batch.operations).await?;
//! ```

pub mod estimate;
pub mod materialize;
pub mod ops;
pub mod pool;
pub mod render;
pub mod schema;
pub mod verify;

pub use estimate::{estimate, K_LEAF, K_REQUIRED};
pub use materialize::{compile, plan, Compilation, Materializer, Slot, DEFAULT_ROOT_NAME};
pub use ops::{LinkId, Operation, WellKnown, WellKnownIds, CORE_NAMESPACE};
pub use pool::{IdentifierPool, PoolError};
pub use schema::{Items, SchemaNode};
pub use verify::{verify_batch, BatchError};
