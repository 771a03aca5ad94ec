//! SQLite schema definitions.

/// Complete schema; idempotent, applied on every open.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS openings (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    moves_san TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Free-form notes per opening (mnemonics, plans, triggers)
CREATE TABLE IF NOT EXISTS opening_notes (
    opening_id INTEGER PRIMARY KEY,
    notes TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY(opening_id) REFERENCES openings(id) ON DELETE CASCADE
);

-- Spaced repetition state (one row per opening, created lazily)
CREATE TABLE IF NOT EXISTS study_cards (
    opening_id INTEGER PRIMARY KEY,
    ease REAL NOT NULL DEFAULT 2.5,
    interval_days INTEGER NOT NULL DEFAULT 0,
    due_date TEXT NOT NULL,
    reps INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    last_grade INTEGER,
    last_reviewed_at TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY(opening_id) REFERENCES openings(id) ON DELETE CASCADE
);

-- Review log, append-only
CREATE TABLE IF NOT EXISTS study_reviews (
    id INTEGER PRIMARY KEY,
    opening_id INTEGER NOT NULL,
    reviewed_at TEXT NOT NULL,
    grade INTEGER NOT NULL,
    prompt_mode TEXT NOT NULL,
    prompt TEXT,
    typed_moves TEXT,
    correct_tokens INTEGER,
    target_tokens INTEGER,
    FOREIGN KEY(opening_id) REFERENCES openings(id) ON DELETE CASCADE
);

-- Stored engine evaluations
CREATE TABLE IF NOT EXISTS evaluations (
    id INTEGER PRIMARY KEY,
    opening_id INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    score_cp INTEGER,
    mate_in INTEGER,
    bestmove_uci TEXT,
    pv_uci TEXT,
    analyzed_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY(opening_id) REFERENCES openings(id) ON DELETE CASCADE
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_study_cards_due_date ON study_cards(due_date);
CREATE INDEX IF NOT EXISTS idx_study_reviews_opening_id ON study_reviews(opening_id);
CREATE INDEX IF NOT EXISTS idx_evaluations_opening_id ON evaluations(opening_id);
"#;
