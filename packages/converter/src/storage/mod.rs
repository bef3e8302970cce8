//! Graph store abstraction for the converter.
//!
//! The [`GraphStore`] trait is the whole contract between the conversion
//! pipeline and persistence: atomic id reservation, well-known id lookup,
//! atomic batch application, and document lookup along a link's ends. The
//! compiler never calls it directly; the pipeline in [`crate::convert`] does.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStore`] | Tests, conformance suite, dry runs |
//! | [`SqliteStore`] | Durable single-file graph |
//!
//! Both bootstrap the built-in vocabulary of [`WellKnown`] kinds under
//! [`CORE_NAMESPACE`] with ids `1..=7` on creation.
//!
//! [`MemoryStore`]: memory::MemoryStore
//! [`SqliteStore`]: sqlite::SqliteStore
//! [`WellKnown`]: schemagraph::WellKnown
//! [`CORE_NAMESPACE`]: schemagraph::CORE_NAMESPACE

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use schemagraph::{LinkId, Operation};
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors that store operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An item with the same key already exists (e.g. an id inserted twice).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request is malformed or refers to ids the store cannot accept.
    /// Nothing was written.
    #[error("rejected: {0}")]
    Rejected(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Links and documents
// ---------------------------------------------------------------------------

/// Which end of a link to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    From,
    To,
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relationship::From => write!(f, "from"),
            Relationship::To => write!(f, "to"),
        }
    }
}

/// A stored node. Edge-like nodes carry `from`/`to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub id: LinkId,
    pub kind: LinkId,
    pub from: Option<LinkId>,
    pub to: Option<LinkId>,
}

/// A JSON document attached to a link.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The link holding the document.
    pub link_id: LinkId,
    /// `None` when the link exists but carries no object value.
    pub value: Option<Value>,
}

// ---------------------------------------------------------------------------
// GraphStore trait
// ---------------------------------------------------------------------------

/// The persistence contract for schema conversion.
///
/// All methods are `async` and return `Result<_, StoreError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an
/// `Arc<dyn GraphStore>`.
#[async_trait]
pub trait GraphStore: Send + Sync + 'static {
    // --- Compilation ---------------------------------------------------------

    /// Reserve `count` fresh ids, returned in ascending order.
    ///
    /// Concurrent reservations never overlap, and a reserved id is never
    /// handed out again. `count` must be positive; zero is
    /// [`StoreError::Rejected`].
    async fn reserve_ids(&self, count: usize) -> Result<Vec<LinkId>, StoreError>;

    /// Look up the id of a named vocabulary entry (e.g. `Type` in
    /// `@deep-foundation/core`). Returns [`StoreError::NotFound`] if unknown.
    async fn resolve_well_known_id(&self, namespace: &str, name: &str)
        -> Result<LinkId, StoreError>;

    /// Apply an ordered batch atomically: either every operation commits or
    /// none does.
    ///
    /// The batch is rejected when it fails [`schemagraph::verify_batch`], when
    /// it inserts an id that was never reserved, when it references an id that
    /// neither exists nor is inserted earlier in the batch, or when it attaches
    /// a second value to a node. Inserting an existing id is
    /// [`StoreError::Conflict`].
    async fn apply_batch(&self, ops: &[Operation]) -> Result<(), StoreError>;

    /// Follow one end of `anchor` and return the document on the link found
    /// there. `None` when `anchor` or the link at that end does not exist.
    async fn fetch_by_relationship(
        &self,
        anchor: LinkId,
        relationship: Relationship,
    ) -> Result<Option<Document>, StoreError>;

    // --- Seeding and inspection ----------------------------------------------

    /// Insert a single link outside any batch, allocating its id.
    async fn insert_link(
        &self,
        kind: LinkId,
        from: Option<LinkId>,
        to: Option<LinkId>,
    ) -> Result<LinkId, StoreError>;

    /// Attach (or replace) the JSON document on an existing link.
    async fn set_object_value(&self, id: LinkId, value: &Value) -> Result<(), StoreError>;

    /// Retrieve a link by id. Returns `None` if not found.
    async fn get_link(&self, id: LinkId) -> Result<Option<Link>, StoreError>;

    /// The string value attached to a link, if any.
    async fn get_string_value(&self, id: LinkId) -> Result<Option<String>, StoreError>;

    /// All links of the given kind, ordered by id ascending.
    async fn links_of_kind(&self, kind: LinkId) -> Result<Vec<Link>, StoreError>;

    /// Total number of stored links, vocabulary included.
    async fn count_links(&self) -> Result<usize, StoreError>;
}
