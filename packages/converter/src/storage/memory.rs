//! In-memory store implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and dry runs.
//!
//! A batch is checked in full against the current state before anything is
//! written, and both happen under one write lock, so readers never observe a
//! half-applied batch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use schemagraph::{verify_batch, LinkId, Operation, WellKnown, CORE_NAMESPACE};
use serde_json::Value;

use super::{Document, GraphStore, Link, Relationship, StoreError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Inner {
    links: BTreeMap<LinkId, Link>,
    strings: HashMap<LinkId, String>,
    objects: HashMap<LinkId, Value>,
    /// (namespace, name) → id of a vocabulary entry.
    names: HashMap<(String, String), LinkId>,
    /// Next id to hand out; every id below it has been reserved.
    next_id: LinkId,
}

impl Inner {
    fn new() -> Self {
        let mut inner = Self {
            links: BTreeMap::new(),
            strings: HashMap::new(),
            objects: HashMap::new(),
            names: HashMap::new(),
            next_id: 1,
        };
        inner.bootstrap();
        inner
    }

    /// Register the core vocabulary. Every entry is a node of kind `Type`.
    fn bootstrap(&mut self) {
        let type_id = self.next_id;
        for kind in WellKnown::ALL {
            let id = self.allocate(1)[0];
            self.links.insert(
                id,
                Link {
                    id,
                    kind: type_id,
                    from: None,
                    to: None,
                },
            );
            self.names
                .insert((CORE_NAMESPACE.to_string(), kind.name().to_string()), id);
        }
    }

    fn allocate(&mut self, count: usize) -> Vec<LinkId> {
        let first = self.next_id;
        self.next_id += count as LinkId;
        (first..self.next_id).collect()
    }

    /// Check a whole batch against the current state without changing it.
    fn check_batch(&self, ops: &[Operation]) -> Result<(), StoreError> {
        verify_batch(ops).map_err(|e| StoreError::Rejected(e.to_string()))?;

        let mut inserted: HashSet<LinkId> = HashSet::new();
        let mut valued: HashSet<LinkId> = HashSet::new();
        for (index, op) in ops.iter().enumerate() {
            for id in op.references() {
                if !inserted.contains(&id) && !self.links.contains_key(&id) {
                    return Err(StoreError::Rejected(format!(
                        "operation {index} references unknown id {id}"
                    )));
                }
            }
            match op {
                Operation::InsertNode { id, .. } => {
                    if self.links.contains_key(id) {
                        return Err(StoreError::Conflict(format!("link {id} already exists")));
                    }
                    if *id >= self.next_id {
                        return Err(StoreError::Rejected(format!(
                            "operation {index} inserts unreserved id {id}"
                        )));
                    }
                    inserted.insert(*id);
                }
                Operation::InsertValue { target, .. } => {
                    if self.strings.contains_key(target) || !valued.insert(*target) {
                        return Err(StoreError::Rejected(format!(
                            "operation {index} attaches a second value to link {target}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`GraphStore`].
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// GraphStore impl
// ---------------------------------------------------------------------------

#[async_trait]
impl GraphStore for MemoryStore {
    // --- Compilation ---------------------------------------------------------

    async fn reserve_ids(&self, count: usize) -> Result<Vec<LinkId>, StoreError> {
        if count == 0 {
            return Err(StoreError::Rejected("cannot reserve zero ids".into()));
        }
        let mut inner = self.inner.write().unwrap();
        Ok(inner.allocate(count))
    }

    async fn resolve_well_known_id(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<LinkId, StoreError> {
        let inner = self.inner.read().unwrap();
        inner
            .names
            .get(&(namespace.to_string(), name.to_string()))
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("{namespace}/{name}")))
    }

    async fn apply_batch(&self, ops: &[Operation]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        inner.check_batch(ops)?;

        for op in ops {
            match op {
                Operation::InsertNode { id, kind, from, to } => {
                    inner.links.insert(
                        *id,
                        Link {
                            id: *id,
                            kind: *kind,
                            from: *from,
                            to: *to,
                        },
                    );
                }
                Operation::InsertValue { target, value } => {
                    inner.strings.insert(*target, value.clone());
                }
            }
        }
        Ok(())
    }

    async fn fetch_by_relationship(
        &self,
        anchor: LinkId,
        relationship: Relationship,
    ) -> Result<Option<Document>, StoreError> {
        let inner = self.inner.read().unwrap();
        let Some(link) = inner.links.get(&anchor) else {
            return Ok(None);
        };
        let end = match relationship {
            Relationship::From => link.from,
            Relationship::To => link.to,
        };
        let Some(target) = end.filter(|id| inner.links.contains_key(id)) else {
            return Ok(None);
        };
        Ok(Some(Document {
            link_id: target,
            value: inner.objects.get(&target).cloned(),
        }))
    }

    // --- Seeding and inspection ----------------------------------------------

    async fn insert_link(
        &self,
        kind: LinkId,
        from: Option<LinkId>,
        to: Option<LinkId>,
    ) -> Result<LinkId, StoreError> {
        let mut inner = self.inner.write().unwrap();
        for id in std::iter::once(kind).chain(from).chain(to) {
            if !inner.links.contains_key(&id) {
                return Err(StoreError::Rejected(format!("unknown id {id}")));
            }
        }
        let id = inner.allocate(1)[0];
        inner.links.insert(id, Link { id, kind, from, to });
        Ok(id)
    }

    async fn set_object_value(&self, id: LinkId, value: &Value) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        if !inner.links.contains_key(&id) {
            return Err(StoreError::NotFound(format!("link {id}")));
        }
        inner.objects.insert(id, value.clone());
        Ok(())
    }

    async fn get_link(&self, id: LinkId) -> Result<Option<Link>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.links.get(&id).cloned())
    }

    async fn get_string_value(&self, id: LinkId) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.strings.get(&id).cloned())
    }

    async fn links_of_kind(&self, kind: LinkId) -> Result<Vec<Link>, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .links
            .values()
            .filter(|l| l.kind == kind)
            .cloned()
            .collect())
    }

    async fn count_links(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.links.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
