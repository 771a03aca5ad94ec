//! Environment-backed runtime settings.

use std::path::PathBuf;

/// Settings read once at startup. A `.env` file is honored when present.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub stockfish_path: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = std::env::var("OPENING_TRAINER_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/openings.sqlite3"));
        let stockfish_path = std::env::var("STOCKFISH_PATH").ok();

        Self {
            db_path,
            stockfish_path,
        }
    }
}
