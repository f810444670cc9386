// Engram Belief — Fact Store
// Stores versioned facts and the decision history in SQLite via rusqlite.
//
// Module layout:
//   schema    — idempotent table / index / trigger migrations
//   facts     — FactStore impl (CRUD, slot query, similarity search, chain writes)
//   history   — HistoryStore impl (append-only decision log)
//   embedding — BLOB codec and cosine similarity

use crate::atoms::error::EngineResult;
use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

pub(crate) mod embedding;
mod facts;
mod history;
mod schema;

/// Thread-safe database wrapper.
pub struct BeliefStore {
    /// The SQLite connection, protected by a Mutex.
    pub conn: Mutex<Connection>,
}

impl BeliefStore {
    /// Open (or create) a file-backed store and initialize tables.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        info!("[belief:store] Opening fact store at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA foreign_keys=ON;").ok();

        schema::run_migrations(&conn)?;

        Ok(BeliefStore {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory store. Used by tests and ephemeral engines.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(BeliefStore {
            conn: Mutex::new(conn),
        })
    }
}
