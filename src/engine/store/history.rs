// ── Engram Belief: History Rows ────────────────────────────────────────────
// Append-only decision log. The schema triggers reject UPDATE and DELETE.

use super::BeliefStore;
use crate::atoms::belief_types::{format_timestamp, HistoryEntry};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::HistoryStore;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let action: String = row.get(3)?;
    let created_at: String = row.get(7)?;
    Ok(HistoryEntry {
        seq: row.get(0)?,
        memory_space_id: row.get(1)?,
        lineage_root: row.get(2)?,
        action: action.parse().map_err(|e: EngineError| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.to_string().into())
        })?,
        old_fact_id: row.get(4)?,
        new_fact_id: row.get(5)?,
        reason: row.get(6)?,
        timestamp: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.to_string().into())
            })?,
    })
}

impl HistoryStore for BeliefStore {
    fn append_history(&self, entry: &HistoryEntry) -> EngineResult<HistoryEntry> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO fact_history
                (memory_space_id, lineage_root, action, old_fact_id, new_fact_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.memory_space_id,
                entry.lineage_root,
                entry.action.to_string(),
                entry.old_fact_id,
                entry.new_fact_id,
                entry.reason,
                format_timestamp(&entry.timestamp),
            ],
        )?;
        Ok(HistoryEntry {
            seq: conn.last_insert_rowid(),
            ..entry.clone()
        })
    }

    fn history_for_lineage(
        &self,
        space_id: &str,
        lineage_root: &str,
    ) -> EngineResult<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT seq, memory_space_id, lineage_root, action, old_fact_id, new_fact_id,
                    reason, created_at
             FROM fact_history
             WHERE memory_space_id = ?1 AND lineage_root = ?2
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![space_id, lineage_root], history_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn history_for_space(&self, space_id: &str) -> EngineResult<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT seq, memory_space_id, lineage_root, action, old_fact_id, new_fact_id,
                    reason, created_at
             FROM fact_history
             WHERE memory_space_id = ?1
             ORDER BY seq ASC",
        )?;
        let entries = stmt
            .query_map(params![space_id], history_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
