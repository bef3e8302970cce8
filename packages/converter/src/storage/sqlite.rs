//! SQLite-backed store implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `links` — every node, with its kind and optional ends.
//! - `strings` — string values attached by batches (Contain annotations).
//! - `objects` — JSON documents attached to links (schema and config documents).
//! - `names` — (namespace, name) → vocabulary id.
//! - `id_sequence` — single row holding the next id to reserve.
//!
//! Reservation and batch application each run inside one SQL transaction, so
//! a failed batch is rolled back in full.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use schemagraph::{verify_batch, LinkId, Operation, WellKnown, CORE_NAMESPACE};
use serde_json::Value;

use super::{Document, GraphStore, Link, Relationship, StoreError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS links (
    id       INTEGER PRIMARY KEY,
    type_id  INTEGER NOT NULL,
    from_id  INTEGER,
    to_id    INTEGER
);
CREATE INDEX IF NOT EXISTS idx_links_type ON links(type_id);

CREATE TABLE IF NOT EXISTS strings (
    link_id  INTEGER PRIMARY KEY,
    value    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS objects (
    link_id  INTEGER PRIMARY KEY,
    value    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS names (
    namespace  TEXT NOT NULL,
    name       TEXT NOT NULL,
    link_id    INTEGER NOT NULL,
    PRIMARY KEY (namespace, name)
);

-- Single-row sequence. Every id below next_id has been reserved.
CREATE TABLE IF NOT EXISTS id_sequence (
    singleton  INTEGER PRIMARY KEY CHECK (singleton = 1),
    next_id    INTEGER NOT NULL
);
";

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`GraphStore`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `path`, apply the schema and
    /// bootstrap the vocabulary if it is missing.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(SCHEMA)?;
        bootstrap(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap();
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Internal(format!("task join error: {e}")))?
    }
}

/// Register the core vocabulary on a fresh database. Idempotent.
fn bootstrap(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    let type_id = 1_i64;
    for (index, kind) in WellKnown::ALL.into_iter().enumerate() {
        let id = index as i64 + 1;
        tx.execute(
            "INSERT OR IGNORE INTO links (id, type_id) VALUES (?1, ?2)",
            params![id, type_id],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO names (namespace, name, link_id) VALUES (?1, ?2, ?3)",
            params![CORE_NAMESPACE, kind.name(), id],
        )?;
    }
    tx.execute(
        "INSERT OR IGNORE INTO id_sequence (singleton, next_id) VALUES (1, ?1)",
        params![WellKnown::ALL.len() as i64 + 1],
    )?;
    tx.commit()
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StoreError {
    StoreError::Internal(e.to_string())
}

fn map_json_err(e: serde_json::Error) -> StoreError {
    StoreError::Internal(format!("JSON error: {e}"))
}

fn sql_id(id: LinkId) -> i64 {
    id as i64
}

fn link_id(raw: i64) -> LinkId {
    raw as LinkId
}

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: link_id(row.get(0)?),
        kind: link_id(row.get(1)?),
        from: row.get::<_, Option<i64>>(2)?.map(link_id),
        to: row.get::<_, Option<i64>>(3)?.map(link_id),
    })
}

fn link_exists(tx: &Transaction<'_>, id: LinkId) -> Result<bool, StoreError> {
    tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM links WHERE id = ?1)",
        params![sql_id(id)],
        |row| row.get(0),
    )
    .map_err(map_err)
}

fn next_id(tx: &Transaction<'_>) -> Result<LinkId, StoreError> {
    tx.query_row(
        "SELECT next_id FROM id_sequence WHERE singleton = 1",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(link_id)
    .map_err(map_err)
}

/// Apply `ops` inside `tx`. Any error leaves the transaction uncommitted.
fn apply_in(tx: &Transaction<'_>, ops: &[Operation]) -> Result<(), StoreError> {
    let next = next_id(tx)?;
    for (index, op) in ops.iter().enumerate() {
        for id in op.references() {
            if !link_exists(tx, id)? {
                return Err(StoreError::Rejected(format!(
                    "operation {index} references unknown id {id}"
                )));
            }
        }
        match op {
            Operation::InsertNode { id, kind, from, to } => {
                if link_exists(tx, *id)? {
                    return Err(StoreError::Conflict(format!("link {id} already exists")));
                }
                if *id >= next {
                    return Err(StoreError::Rejected(format!(
                        "operation {index} inserts unreserved id {id}"
                    )));
                }
                tx.execute(
                    "INSERT INTO links (id, type_id, from_id, to_id) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        sql_id(*id),
                        sql_id(*kind),
                        from.map(sql_id),
                        to.map(sql_id)
                    ],
                )
                .map_err(map_err)?;
            }
            Operation::InsertValue { target, value } => {
                let inserted = tx
                    .execute(
                        "INSERT OR IGNORE INTO strings (link_id, value) VALUES (?1, ?2)",
                        params![sql_id(*target), value],
                    )
                    .map_err(map_err)?;
                if inserted == 0 {
                    return Err(StoreError::Rejected(format!(
                        "operation {index} attaches a second value to link {target}"
                    )));
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GraphStore impl
// ---------------------------------------------------------------------------

#[async_trait]
impl GraphStore for SqliteStore {
    // --- Compilation ---------------------------------------------------------

    async fn reserve_ids(&self, count: usize) -> Result<Vec<LinkId>, StoreError> {
        if count == 0 {
            return Err(StoreError::Rejected("cannot reserve zero ids".into()));
        }
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let first = next_id(&tx)?;
            tx.execute(
                "UPDATE id_sequence SET next_id = next_id + ?1 WHERE singleton = 1",
                params![count as i64],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok((first..first + count as LinkId).collect())
        })
        .await
    }

    async fn resolve_well_known_id(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<LinkId, StoreError> {
        let namespace = namespace.to_string();
        let name = name.to_string();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT link_id FROM names WHERE namespace = ?1 AND name = ?2",
                    params![namespace, name],
                    |row| row.get::<_, i64>(0),
                )
                .optional()
                .map_err(map_err)?;
            found
                .map(link_id)
                .ok_or_else(|| StoreError::NotFound(format!("{namespace}/{name}")))
        })
        .await
    }

    async fn apply_batch(&self, ops: &[Operation]) -> Result<(), StoreError> {
        verify_batch(ops).map_err(|e| StoreError::Rejected(e.to_string()))?;
        let ops = ops.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            apply_in(&tx, &ops)?;
            tx.commit().map_err(map_err)
        })
        .await
    }

    async fn fetch_by_relationship(
        &self,
        anchor: LinkId,
        relationship: Relationship,
    ) -> Result<Option<Document>, StoreError> {
        let column = match relationship {
            Relationship::From => "from_id",
            Relationship::To => "to_id",
        };
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT target.id, objects.value
                 FROM links AS anchor
                 JOIN links AS target ON target.id = anchor.{column}
                 LEFT JOIN objects ON objects.link_id = target.id
                 WHERE anchor.id = ?1"
            );
            let row = conn
                .query_row(&sql, params![sql_id(anchor)], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
                })
                .optional()
                .map_err(map_err)?;
            let Some((target, raw)) = row else {
                return Ok(None);
            };
            let value = raw
                .map(|s| serde_json::from_str::<Value>(&s))
                .transpose()
                .map_err(map_json_err)?;
            Ok(Some(Document {
                link_id: link_id(target),
                value,
            }))
        })
        .await
    }

    // --- Seeding and inspection ----------------------------------------------

    async fn insert_link(
        &self,
        kind: LinkId,
        from: Option<LinkId>,
        to: Option<LinkId>,
    ) -> Result<LinkId, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            for id in std::iter::once(kind).chain(from).chain(to) {
                if !link_exists(&tx, id)? {
                    return Err(StoreError::Rejected(format!("unknown id {id}")));
                }
            }
            let id = next_id(&tx)?;
            tx.execute(
                "UPDATE id_sequence SET next_id = next_id + 1 WHERE singleton = 1",
                [],
            )
            .map_err(map_err)?;
            tx.execute(
                "INSERT INTO links (id, type_id, from_id, to_id) VALUES (?1, ?2, ?3, ?4)",
                params![sql_id(id), sql_id(kind), from.map(sql_id), to.map(sql_id)],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok(id)
        })
        .await
    }

    async fn set_object_value(&self, id: LinkId, value: &Value) -> Result<(), StoreError> {
        let data = serde_json::to_string(value).map_err(map_json_err)?;
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            if !link_exists(&tx, id)? {
                return Err(StoreError::NotFound(format!("link {id}")));
            }
            tx.execute(
                "INSERT INTO objects (link_id, value) VALUES (?1, ?2)
                 ON CONFLICT(link_id) DO UPDATE SET value = excluded.value",
                params![sql_id(id), data],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)
        })
        .await
    }

    async fn get_link(&self, id: LinkId) -> Result<Option<Link>, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, type_id, from_id, to_id FROM links WHERE id = ?1",
                params![sql_id(id)],
                row_to_link,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn get_string_value(&self, id: LinkId) -> Result<Option<String>, StoreError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT value FROM strings WHERE link_id = ?1",
                params![sql_id(id)],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn links_of_kind(&self, kind: LinkId) -> Result<Vec<Link>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, type_id, from_id, to_id FROM links
                     WHERE type_id = ?1 ORDER BY id ASC",
                )
                .map_err(map_err)?;
            let links = stmt
                .query_map(params![sql_id(kind)], row_to_link)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(links)
        })
        .await
    }

    async fn count_links(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(map_err)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
