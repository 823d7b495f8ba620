//! SQLite persistence for compiled policy tables.
//!
//! RULE: Only store.rs talks to the database.
//! The compiler and CLI call store methods; they never execute SQL directly.

use crate::{
    compiler::CompiledPolicy,
    config::DedupeMode,
    error::PolicyResult,
    policy_table::PolicyKey,
};
use rusqlite::{params, Connection, OptionalExtension};

/// One stored compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileRun {
    pub run_id:     String,
    pub created_at: String,
    pub features:   Vec<String>,
    pub actions:    Vec<String>,
    pub dedupe:     String,
    pub grid_rows:  usize,
    pub row_count:  usize,
}

pub struct PolicyStore {
    conn: Connection,
}

impl PolicyStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> PolicyResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PolicyResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PolicyResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_policy.sql"))?;
        Ok(())
    }

    // ── Compile runs ───────────────────────────────────────────

    /// Persist a compiled table under a fresh run id. Returns the id.
    pub fn save_compiled(&self, compiled: &CompiledPolicy, dedupe: DedupeMode) -> PolicyResult<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        let table = &compiled.table;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO compile_run (run_id, created_at, features, actions, dedupe, grid_rows, row_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                created_at,
                serde_json::to_string(&compiled.features)?,
                serde_json::to_string(table.action_names())?,
                dedupe.as_str(),
                compiled.grid_rows as i64,
                table.len() as i64,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO policy_row (run_id, row_index, stage, month, def_n_mm, def_s_mm, canal_mm, pool_ratio, actions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (i, row) in table.rows().iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    i as i64,
                    row.key.stage,
                    row.key.month,
                    row.key.def_n_mm,
                    row.key.def_s_mm,
                    row.key.canal_mm,
                    row.key.pool_ratio,
                    serde_json::to_string(&row.actions)?,
                ])?;
            }
        }
        tx.commit()?;
        log::info!("store: saved run {run_id} ({} rows)", table.len());
        Ok(run_id)
    }

    pub fn compile_run(&self, run_id: &str) -> PolicyResult<Option<CompileRun>> {
        let raw = self
            .conn
            .query_row(
                "SELECT run_id, created_at, features, actions, dedupe, grid_rows, row_count
                 FROM compile_run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, created_at, features, actions, dedupe, grid_rows, row_count)) = raw else {
            return Ok(None);
        };
        Ok(Some(CompileRun {
            run_id,
            created_at,
            features:  serde_json::from_str(&features)?,
            actions:   serde_json::from_str(&actions)?,
            dedupe,
            grid_rows: grid_rows as usize,
            row_count: row_count as usize,
        }))
    }

    /// Most recently created run id, if any.
    pub fn latest_run_id(&self) -> PolicyResult<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT run_id FROM compile_run ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    // ── Policy rows ────────────────────────────────────────────

    pub fn row_count(&self, run_id: &str) -> PolicyResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM policy_row WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Actions stored for an exact key (first by row order).
    pub fn lookup(&self, run_id: &str, key: &PolicyKey) -> PolicyResult<Option<Vec<f64>>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT actions FROM policy_row
                 WHERE run_id = ?1 AND stage = ?2 AND month = ?3
                   AND def_n_mm = ?4 AND def_s_mm = ?5 AND canal_mm = ?6 AND pool_ratio = ?7
                 ORDER BY row_index ASC LIMIT 1",
                params![
                    run_id,
                    key.stage,
                    key.month,
                    key.def_n_mm,
                    key.def_s_mm,
                    key.canal_mm,
                    key.pool_ratio,
                ],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
