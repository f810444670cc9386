// ── Engram Belief: Fact Rows ───────────────────────────────────────────────
//
// FactStore implementation over the `facts` table.
// All methods follow the store pattern: &self, lock conn, rusqlite params.
//
// Schema lives in store/schema.rs. Column names here MUST match that schema.

use super::embedding::{cosine_similarity, decode_embedding, encode_embedding};
use super::BeliefStore;
use crate::atoms::belief_types::{format_timestamp, Fact, FactFilter, ScoredFact};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::FactStore;
use crate::engine::belief::similarity::jaccard;
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;

const FACT_COLUMNS: &str = "id, memory_space_id, fact, fact_type, subject, predicate, object,
    confidence, source_type, source_ref, participant_id, tags_json,
    valid_from, valid_until, version, supersedes, superseded_by,
    embedding, created_at, updated_at";

// ═════════════════════════════════════════════════════════════════════════════
// Row mapping
// ═════════════════════════════════════════════════════════════════════════════

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp {:?}: {}", raw, e)))
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn fact_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Fact> {
    let fact_type: String = row.get(3)?;
    let source_type: String = row.get(8)?;
    let tags_json: String = row.get(11)?;
    let confidence: i64 = row.get(7)?;
    let version: i64 = row.get(14)?;
    let embedding: Option<Vec<u8>> = row.get(17)?;
    let created_at: String = row.get(18)?;
    let updated_at: String = row.get(19)?;

    let tags: BTreeSet<String> = serde_json::from_str(&tags_json)
        .map_err(|e| conversion_error(11, format!("bad tags_json: {}", e)))?;

    Ok(Fact {
        id: row.get(0)?,
        memory_space_id: row.get(1)?,
        fact: row.get(2)?,
        fact_type: fact_type
            .parse()
            .map_err(|e: EngineError| conversion_error(3, e.to_string()))?,
        subject: row.get(4)?,
        predicate: row.get(5)?,
        object: row.get(6)?,
        confidence: confidence.clamp(0, 100) as u8,
        source_type: source_type
            .parse()
            .map_err(|e: EngineError| conversion_error(8, e.to_string()))?,
        source_ref: row.get(9)?,
        participant_id: row.get(10)?,
        tags,
        valid_from: parse_opt_ts(12, row.get(12)?)?,
        valid_until: parse_opt_ts(13, row.get(13)?)?,
        version: version.max(1) as u32,
        supersedes: row.get(15)?,
        superseded_by: row.get(16)?,
        embedding: embedding.map(|b| decode_embedding(&b)),
        created_at: parse_ts(18, &created_at)?,
        updated_at: parse_ts(19, &updated_at)?,
    })
}

fn insert_fact(conn: &Connection, fact: &Fact) -> EngineResult<()> {
    let tags_json = serde_json::to_string(&fact.tags)?;
    let embedding_bytes = fact.embedding.as_ref().map(|v| encode_embedding(v));

    conn.execute(
        "INSERT OR REPLACE INTO facts (
            id, memory_space_id, fact, fact_type, subject, predicate, object,
            confidence, source_type, source_ref, participant_id, tags_json,
            valid_from, valid_until, version, supersedes, superseded_by,
            embedding, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11, ?12,
            ?13, ?14, ?15, ?16, ?17,
            ?18, ?19, ?20
        )",
        params![
            fact.id,
            fact.memory_space_id,
            fact.fact,
            fact.fact_type.to_string(),
            fact.subject,
            fact.predicate,
            fact.object,
            fact.confidence as i64,
            fact.source_type.to_string(),
            fact.source_ref,
            fact.participant_id,
            tags_json,
            fact.valid_from.as_ref().map(format_timestamp),
            fact.valid_until.as_ref().map(format_timestamp),
            fact.version as i64,
            fact.supersedes,
            fact.superseded_by,
            embedding_bytes,
            format_timestamp(&fact.created_at),
            format_timestamp(&fact.updated_at),
        ],
    )?;
    Ok(())
}

fn fact_exists(conn: &Connection, space_id: &str, fact_id: &str) -> EngineResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM facts WHERE id = ?1 AND memory_space_id = ?2",
            params![fact_id, space_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Set the forward link on an active fact. Zero rows changed means the fact
/// is gone or already has a successor.
fn mark_superseded(
    conn: &Connection,
    space_id: &str,
    fact_id: &str,
    successor_id: &str,
    at: &DateTime<Utc>,
) -> EngineResult<()> {
    let ts = format_timestamp(at);
    let changed = conn.execute(
        "UPDATE facts SET superseded_by = ?1, valid_until = ?2, updated_at = ?2
         WHERE id = ?3 AND memory_space_id = ?4 AND superseded_by IS NULL",
        params![successor_id, ts, fact_id, space_id],
    )?;
    if changed == 0 {
        if fact_exists(conn, space_id, fact_id)? {
            return Err(EngineError::StaleChain { fact_id: fact_id.to_string() });
        }
        return Err(EngineError::not_found(space_id, fact_id));
    }
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════════
// FactStore
// ═════════════════════════════════════════════════════════════════════════════

impl FactStore for BeliefStore {
    fn get(&self, space_id: &str, fact_id: &str) -> EngineResult<Option<Fact>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM facts WHERE id = ?1 AND memory_space_id = ?2",
            FACT_COLUMNS
        );
        let fact = conn
            .query_row(&sql, params![fact_id, space_id], fact_from_row)
            .optional()?;
        Ok(fact)
    }

    fn owner_space(&self, fact_id: &str) -> EngineResult<Option<String>> {
        let conn = self.conn.lock();
        let space = conn
            .query_row(
                "SELECT memory_space_id FROM facts WHERE id = ?1",
                params![fact_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(space)
    }

    fn put(&self, fact: &Fact) -> EngineResult<Fact> {
        let conn = self.conn.lock();
        insert_fact(&conn, fact)?;
        Ok(fact.clone())
    }

    fn put_successor(
        &self,
        predecessor_id: &str,
        successor: &Fact,
        at: DateTime<Utc>,
    ) -> EngineResult<Fact> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        mark_superseded(
            &tx,
            &successor.memory_space_id,
            predecessor_id,
            &successor.id,
            &at,
        )?;
        insert_fact(&tx, successor)?;
        tx.commit()?;
        debug!(
            "[belief:store] Linked {} -> {} (v{})",
            predecessor_id, successor.id, successor.version
        );
        Ok(successor.clone())
    }

    fn retire(
        &self,
        space_id: &str,
        fact_id: &str,
        successor_id: &str,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let conn = self.conn.lock();
        mark_superseded(&conn, space_id, fact_id, successor_id, &at)
    }

    fn update_confidence(
        &self,
        space_id: &str,
        fact_id: &str,
        confidence: u8,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE facts SET confidence = ?1, updated_at = ?2 WHERE id = ?3 AND memory_space_id = ?4",
            params![confidence as i64, format_timestamp(&at), fact_id, space_id],
        )?;
        if changed == 0 {
            return Err(EngineError::not_found(space_id, fact_id));
        }
        Ok(())
    }

    fn query_by_slot(
        &self,
        space_id: &str,
        subject: &str,
        predicate: &str,
    ) -> EngineResult<Vec<Fact>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM facts
             WHERE memory_space_id = ?1
               AND superseded_by IS NULL
               AND lower(trim(subject)) = lower(trim(?2))
               AND lower(trim(predicate)) = lower(trim(?3))
             ORDER BY updated_at DESC, version DESC, id ASC",
            FACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let facts = stmt
            .query_map(params![space_id, subject, predicate], fact_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(facts)
    }

    fn search_similar(
        &self,
        space_id: &str,
        text: &str,
        embedding: Option<&[f32]>,
        limit: usize,
    ) -> EngineResult<Vec<ScoredFact>> {
        let active = {
            let conn = self.conn.lock();
            let sql = format!(
                "SELECT {} FROM facts WHERE memory_space_id = ?1 AND superseded_by IS NULL",
                FACT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![space_id], fact_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut scored: Vec<ScoredFact> = active
            .into_iter()
            .filter_map(|fact| {
                let vector_score = match (embedding, fact.embedding.as_deref()) {
                    (Some(query), Some(stored)) => cosine_similarity(query, stored),
                    _ => None,
                };
                let score = vector_score
                    .unwrap_or_else(|| jaccard(text, &fact.fact))
                    .clamp(0.0, 1.0);
                (score > 0.0).then_some(ScoredFact { fact, score })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.fact.updated_at.cmp(&a.fact.updated_at))
                .then_with(|| a.fact.id.cmp(&b.fact.id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    fn list(&self, space_id: &str, filter: &FactFilter) -> EngineResult<Vec<Fact>> {
        let conn = self.conn.lock();

        let mut sql = format!("SELECT {} FROM facts WHERE memory_space_id = ?1", FACT_COLUMNS);
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(space_id.to_string())];

        if !filter.include_superseded {
            sql.push_str(" AND superseded_by IS NULL");
        }
        if let Some(fact_type) = filter.fact_type {
            args.push(Box::new(fact_type.to_string()));
            sql.push_str(&format!(" AND fact_type = ?{}", args.len()));
        }
        if let Some(ref subject) = filter.subject {
            args.push(Box::new(subject.clone()));
            sql.push_str(&format!(" AND lower(trim(subject)) = lower(trim(?{}))", args.len()));
        }
        if let Some(min) = filter.min_confidence {
            args.push(Box::new(min as i64));
            sql.push_str(&format!(" AND confidence >= ?{}", args.len()));
        }
        sql.push_str(" ORDER BY created_at ASC, version ASC, id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let facts = stmt
            .query_map(
                rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
                fact_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        // Tags live in a JSON column; filter here.
        let mut facts: Vec<Fact> = match filter.tag {
            Some(ref tag) => facts.into_iter().filter(|f| f.tags.contains(tag)).collect(),
            None => facts,
        };
        if let Some(limit) = filter.limit {
            facts.truncate(limit);
        }
        Ok(facts)
    }
}
