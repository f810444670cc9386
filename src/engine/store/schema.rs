// ── Engram Belief: Database Schema ────────────────────────────────────────
//
// Tables:
//   - facts: versioned facts, one row per version, chain links inline
//   - fact_history: append-only decision log, keyed by lineage root
//
// All statements are idempotent (CREATE IF NOT EXISTS).

use crate::atoms::error::EngineResult;
use log::info;
use rusqlite::Connection;

/// Run all migrations on an open connection.
pub fn run_migrations(conn: &Connection) -> EngineResult<()> {
    info!("[belief:store] Running schema migrations");
    conn.execute_batch(BELIEF_SCHEMA)?;
    Ok(())
}

const BELIEF_SCHEMA: &str = "
    -- ═══════════════════════════════════════════════════════════════
    -- Facts
    -- One row per version. supersedes / superseded_by are the chain
    -- links; valid_until is set exactly when superseded_by is set.
    -- ═══════════════════════════════════════════════════════════════
    CREATE TABLE IF NOT EXISTS facts (
        id TEXT PRIMARY KEY,
        memory_space_id TEXT NOT NULL,

        fact TEXT NOT NULL,
        fact_type TEXT NOT NULL DEFAULT 'knowledge',

        -- Optional triple
        subject TEXT,
        predicate TEXT,
        object TEXT,

        confidence INTEGER NOT NULL DEFAULT 50
            CHECK (confidence BETWEEN 0 AND 100),

        -- Provenance
        source_type TEXT NOT NULL DEFAULT 'conversation',
        source_ref TEXT,
        participant_id TEXT,
        tags_json TEXT NOT NULL DEFAULT '[]',

        -- Validity window
        valid_from TEXT,
        valid_until TEXT,

        -- Version chain
        version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
        supersedes TEXT,
        superseded_by TEXT,

        embedding BLOB,

        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_facts_space
        ON facts(memory_space_id);
    CREATE INDEX IF NOT EXISTS idx_facts_slot
        ON facts(memory_space_id, subject, predicate);
    CREATE INDEX IF NOT EXISTS idx_facts_supersedes
        ON facts(supersedes);
    CREATE INDEX IF NOT EXISTS idx_facts_superseded_by
        ON facts(superseded_by);

    -- ═══════════════════════════════════════════════════════════════
    -- Fact History (Append-Only)
    -- One row per executed decision. Rows are never updated or deleted.
    -- ═══════════════════════════════════════════════════════════════
    CREATE TABLE IF NOT EXISTS fact_history (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        memory_space_id TEXT NOT NULL,
        lineage_root TEXT NOT NULL,
        action TEXT NOT NULL,
        old_fact_id TEXT,
        new_fact_id TEXT,
        reason TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_history_lineage
        ON fact_history(memory_space_id, lineage_root);

    CREATE TRIGGER IF NOT EXISTS fact_history_no_update BEFORE UPDATE ON fact_history
    BEGIN
        SELECT RAISE(ABORT, 'fact_history is append-only');
    END;

    CREATE TRIGGER IF NOT EXISTS fact_history_no_delete BEFORE DELETE ON fact_history
    BEGIN
        SELECT RAISE(ABORT, 'fact_history is append-only');
    END;
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('facts', 'fact_history')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn history_rejects_mutation() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO fact_history (memory_space_id, lineage_root, action, reason, created_at)
             VALUES ('s', 'f1', 'ADD', 'r', '2026-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        assert!(conn.execute("UPDATE fact_history SET reason = 'x'", []).is_err());
        assert!(conn.execute("DELETE FROM fact_history", []).is_err());
    }
}
