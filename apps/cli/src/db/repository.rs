//! Repository pattern for database access.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use opening_core::{DueOpening, OpeningLine, ReviewLogEntry, SchedulerState, Sm2};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::error::DbError;

type Result<T> = std::result::Result<T, DbError>;

const DATE_FMT: &str = "%Y-%m-%d";

/// Repository for opening definitions and notes.
pub trait OpeningRepository {
    fn add_opening(&self, name: &str, moves: &str) -> Result<OpeningLine>;
    fn get_opening(&self, id: i64) -> Result<Option<OpeningLine>>;
    fn get_opening_by_name(&self, name: &str) -> Result<Option<OpeningLine>>;
    fn list_openings(&self, prefix: Option<&str>, limit: usize) -> Result<Vec<OpeningLine>>;
    fn search_openings(&self, query: &str, limit: usize) -> Result<Vec<OpeningLine>>;
    fn get_notes(&self, opening_id: i64) -> Result<Option<String>>;
    fn set_notes(&self, opening_id: i64, notes: &str) -> Result<()>;
}

/// Repository for scheduler state and the review log.
pub trait StudyRepository {
    /// Create missing scheduler state rows for every opening in scope.
    /// Returns the number created. Idempotent.
    fn ensure_states(&self, prefix: Option<&str>, today: NaiveDate) -> Result<usize>;
    fn get_state(&self, opening_id: i64) -> Result<Option<SchedulerState>>;
    /// Lazy creation on first access, as one idempotent operation.
    fn get_or_create_state(&self, opening_id: i64, today: NaiveDate) -> Result<SchedulerState>;
    fn save_state(&self, opening_id: i64, state: &SchedulerState) -> Result<()>;
    fn append_review(&self, entry: &ReviewLogEntry) -> Result<i64>;
    fn review_count(&self, opening_id: i64) -> Result<usize>;
    /// Openings joined with their due dates, for `pick_due`.
    fn due_candidates(&self, prefix: Option<&str>) -> Result<Vec<DueOpening>>;
    /// Apply a grade and append the review log entry in one transaction.
    ///
    /// Creates scheduler state lazily if none exists. All-or-nothing: an
    /// invalid grade leaves state and log untouched.
    fn submit_review(
        &mut self,
        sm2: &Sm2,
        entry: &ReviewLogEntry,
        today: NaiveDate,
    ) -> Result<SchedulerState>;
}

/// A stored engine evaluation, side-to-move relative.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredEval {
    pub id: i64,
    pub opening_id: i64,
    pub depth: u32,
    pub score_cp: Option<i64>,
    pub mate_in: Option<i32>,
    pub bestmove_uci: Option<String>,
    pub pv_uci: Option<String>,
}

/// Repository for engine evaluation results.
pub trait EvalRepository {
    #[allow(clippy::too_many_arguments)]
    fn insert_evaluation(
        &self,
        opening_id: i64,
        depth: u32,
        score_cp: Option<i64>,
        mate_in: Option<i32>,
        bestmove_uci: Option<&str>,
        pv_uci: Option<&str>,
    ) -> Result<StoredEval>;
    fn latest_evaluation(&self, opening_id: i64) -> Result<Option<StoredEval>>;
}

/// SQLite implementation of the repositories.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating it (and parent directories) if
    /// necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::InvalidData(format!("cannot create {parent:?}: {e}")))?;
            }
        }
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::SCHEMA)?;
        Ok(())
    }

    fn row_to_line(row: &rusqlite::Row) -> rusqlite::Result<OpeningLine> {
        Ok(OpeningLine {
            id: row.get(0)?,
            name: row.get(1)?,
            moves: row.get(2)?,
        })
    }
}

fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_state(row: &rusqlite::Row) -> rusqlite::Result<SchedulerState> {
    let due_str: String = row.get(4)?;
    let reviewed: Option<String> = row.get(6)?;
    Ok(SchedulerState {
        ease: row.get(0)?,
        interval_days: row.get(1)?,
        reps: row.get(2)?,
        lapses: row.get(3)?,
        due_date: parse_date(&due_str)?,
        last_grade: row.get(5)?,
        last_reviewed_at: reviewed.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }),
    })
}

// Free functions over `&Connection` so the same code serves both direct
// calls and the submit_review transaction.

fn state_row(conn: &Connection, opening_id: i64) -> Result<Option<SchedulerState>> {
    conn.query_row(
        "SELECT ease, interval_days, reps, lapses, due_date, last_grade, last_reviewed_at
         FROM study_cards WHERE opening_id = ?1",
        params![opening_id],
        row_to_state,
    )
    .optional()
    .map_err(Into::into)
}

fn get_or_create_state_on(
    conn: &Connection,
    opening_id: i64,
    today: NaiveDate,
) -> Result<SchedulerState> {
    conn.execute(
        "INSERT OR IGNORE INTO study_cards (opening_id, due_date) VALUES (?1, ?2)",
        params![opening_id, date_to_sql(today)],
    )?;
    state_row(conn, opening_id)?.ok_or(DbError::OpeningNotFound(opening_id))
}

fn save_state_on(conn: &Connection, opening_id: i64, state: &SchedulerState) -> Result<()> {
    conn.execute(
        "INSERT INTO study_cards
            (opening_id, ease, interval_days, due_date, reps, lapses, last_grade, last_reviewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(opening_id) DO UPDATE SET
            ease = excluded.ease,
            interval_days = excluded.interval_days,
            due_date = excluded.due_date,
            reps = excluded.reps,
            lapses = excluded.lapses,
            last_grade = excluded.last_grade,
            last_reviewed_at = excluded.last_reviewed_at",
        params![
            opening_id,
            state.ease,
            state.interval_days,
            date_to_sql(state.due_date),
            state.reps,
            state.lapses,
            state.last_grade,
            state.last_reviewed_at.map(|dt| dt.to_rfc3339()),
        ],
    )?;
    Ok(())
}

fn append_review_on(conn: &Connection, entry: &ReviewLogEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO study_reviews
            (opening_id, reviewed_at, grade, prompt_mode, prompt, typed_moves, correct_tokens, target_tokens)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.opening_id,
            entry.reviewed_at.to_rfc3339(),
            entry.grade,
            entry.prompt_mode.as_str(),
            entry.prompt,
            entry.typed_moves,
            entry.correct_tokens.map(|v| v as i64),
            entry.target_tokens.map(|v| v as i64),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl OpeningRepository for SqliteRepository {
    fn add_opening(&self, name: &str, moves: &str) -> Result<OpeningLine> {
        self.conn.execute(
            "INSERT INTO openings (name, moves_san) VALUES (?1, ?2)",
            params![name, moves],
        )?;
        Ok(OpeningLine {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            moves: moves.to_string(),
        })
    }

    fn get_opening(&self, id: i64) -> Result<Option<OpeningLine>> {
        self.conn
            .query_row(
                "SELECT id, name, moves_san FROM openings WHERE id = ?1",
                params![id],
                Self::row_to_line,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_opening_by_name(&self, name: &str) -> Result<Option<OpeningLine>> {
        self.conn
            .query_row(
                "SELECT id, name, moves_san FROM openings WHERE name = ?1",
                params![name],
                Self::row_to_line,
            )
            .optional()
            .map_err(Into::into)
    }

    fn list_openings(&self, prefix: Option<&str>, limit: usize) -> Result<Vec<OpeningLine>> {
        let sql = match prefix {
            Some(_) => {
                "SELECT id, name, moves_san FROM openings
                 WHERE name LIKE ?1 ORDER BY name ASC LIMIT ?2"
            }
            None => "SELECT id, name, moves_san FROM openings ORDER BY name ASC LIMIT ?1",
        };

        let mut stmt = self.conn.prepare(sql)?;
        let lines = if let Some(prefix) = prefix {
            stmt.query_map(params![format!("{prefix}%"), limit as i64], Self::row_to_line)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![limit as i64], Self::row_to_line)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(lines)
    }

    fn search_openings(&self, query: &str, limit: usize) -> Result<Vec<OpeningLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, moves_san FROM openings
             WHERE name LIKE ?1 ORDER BY name ASC LIMIT ?2",
        )?;
        let lines = stmt
            .query_map(params![format!("%{query}%"), limit as i64], Self::row_to_line)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    fn get_notes(&self, opening_id: i64) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT notes FROM opening_notes WHERE opening_id = ?1",
                params![opening_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn set_notes(&self, opening_id: i64, notes: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO opening_notes (opening_id, notes, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(opening_id) DO UPDATE SET
                notes = excluded.notes,
                updated_at = datetime('now')",
            params![opening_id, notes],
        )?;
        Ok(())
    }
}

impl StudyRepository for SqliteRepository {
    fn ensure_states(&self, prefix: Option<&str>, today: NaiveDate) -> Result<usize> {
        let sql = match prefix {
            Some(_) => "SELECT id FROM openings WHERE name LIKE ?1",
            None => "SELECT id FROM openings",
        };
        let mut stmt = self.conn.prepare(sql)?;
        let ids: Vec<i64> = if let Some(prefix) = prefix {
            stmt.query_map(params![format!("{prefix}%")], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut created = 0;
        for id in ids {
            created += self.conn.execute(
                "INSERT OR IGNORE INTO study_cards (opening_id, due_date) VALUES (?1, ?2)",
                params![id, date_to_sql(today)],
            )?;
        }
        Ok(created)
    }

    fn get_state(&self, opening_id: i64) -> Result<Option<SchedulerState>> {
        state_row(&self.conn, opening_id)
    }

    fn get_or_create_state(&self, opening_id: i64, today: NaiveDate) -> Result<SchedulerState> {
        get_or_create_state_on(&self.conn, opening_id, today)
    }

    fn save_state(&self, opening_id: i64, state: &SchedulerState) -> Result<()> {
        save_state_on(&self.conn, opening_id, state)
    }

    fn append_review(&self, entry: &ReviewLogEntry) -> Result<i64> {
        append_review_on(&self.conn, entry)
    }

    fn review_count(&self, opening_id: i64) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM study_reviews WHERE opening_id = ?1",
            params![opening_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn due_candidates(&self, prefix: Option<&str>) -> Result<Vec<DueOpening>> {
        let sql = match prefix {
            Some(_) => {
                "SELECT o.id, o.name, o.moves_san, c.due_date
                 FROM openings o JOIN study_cards c ON c.opening_id = o.id
                 WHERE o.name LIKE ?1"
            }
            None => {
                "SELECT o.id, o.name, o.moves_san, c.due_date
                 FROM openings o JOIN study_cards c ON c.opening_id = o.id"
            }
        };

        let to_candidate = |row: &rusqlite::Row| -> rusqlite::Result<DueOpening> {
            let due_str: String = row.get(3)?;
            Ok(DueOpening {
                line: OpeningLine {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    moves: row.get(2)?,
                },
                due_date: parse_date(&due_str)?,
            })
        };

        let mut stmt = self.conn.prepare(sql)?;
        let candidates = if let Some(prefix) = prefix {
            stmt.query_map(params![format!("{prefix}%")], to_candidate)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map([], to_candidate)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(candidates)
    }

    fn submit_review(
        &mut self,
        sm2: &Sm2,
        entry: &ReviewLogEntry,
        today: NaiveDate,
    ) -> Result<SchedulerState> {
        let tx = self.conn.transaction()?;
        let current = get_or_create_state_on(&tx, entry.opening_id, today)?;
        let next = sm2.apply_grade(&current, entry.grade, today, entry.reviewed_at)?;
        save_state_on(&tx, entry.opening_id, &next)?;
        append_review_on(&tx, entry)?;
        tx.commit()?;
        Ok(next)
    }
}

impl EvalRepository for SqliteRepository {
    fn insert_evaluation(
        &self,
        opening_id: i64,
        depth: u32,
        score_cp: Option<i64>,
        mate_in: Option<i32>,
        bestmove_uci: Option<&str>,
        pv_uci: Option<&str>,
    ) -> Result<StoredEval> {
        self.conn.execute(
            "INSERT INTO evaluations (opening_id, depth, score_cp, mate_in, bestmove_uci, pv_uci)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![opening_id, depth, score_cp, mate_in, bestmove_uci, pv_uci],
        )?;
        Ok(StoredEval {
            id: self.conn.last_insert_rowid(),
            opening_id,
            depth,
            score_cp,
            mate_in,
            bestmove_uci: bestmove_uci.map(str::to_string),
            pv_uci: pv_uci.map(str::to_string),
        })
    }

    fn latest_evaluation(&self, opening_id: i64) -> Result<Option<StoredEval>> {
        self.conn
            .query_row(
                "SELECT id, opening_id, depth, score_cp, mate_in, bestmove_uci, pv_uci
                 FROM evaluations
                 WHERE opening_id = ?1
                 ORDER BY analyzed_at DESC, id DESC
                 LIMIT 1",
                params![opening_id],
                |row| {
                    Ok(StoredEval {
                        id: row.get(0)?,
                        opening_id: row.get(1)?,
                        depth: row.get(2)?,
                        score_cp: row.get(3)?,
                        mate_in: row.get(4)?,
                        bestmove_uci: row.get(5)?,
                        pv_uci: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
