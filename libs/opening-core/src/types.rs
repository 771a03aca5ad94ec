//! Core types for the opening trainer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::tokenize;

/// A stored opening line: a named, ordered SAN token sequence.
///
/// Name and moves are owned by the persistence layer; this core never
/// mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningLine {
    pub id: i64,
    pub name: String,
    pub moves: String,
}

impl OpeningLine {
    /// Moves split into individual SAN tokens, in play order.
    pub fn tokens(&self) -> Vec<String> {
        tokenize(&self.moves)
    }
}

/// Which side moves at a given 0-based ply index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl Side {
    /// Even-indexed plies are White's.
    pub fn at_ply(index: usize) -> Self {
        if index % 2 == 0 {
            Self::White
        } else {
            Self::Black
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Black => "Black",
        }
    }
}

/// Spaced-repetition state for one opening line.
///
/// Invariant: `due_date` is the date of the last update plus
/// `interval_days`. Mutated exclusively through `Sm2::apply_grade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub ease: f64,
    pub interval_days: u32,
    pub reps: u32,
    pub lapses: u32,
    pub due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_grade: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl SchedulerState {
    /// Fresh state for a line that has never been reviewed; due immediately.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            ease: 2.5,
            interval_days: 0,
            reps: 0,
            lapses: 0,
            due_date: today,
            last_grade: None,
            last_reviewed_at: None,
        }
    }
}

/// What the user was shown when they graded their recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    NameToMoves,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameToMoves => "name_to_moves",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "name_to_moves" => Some(Self::NameToMoves),
            _ => None,
        }
    }
}

/// One appended review record. Append-only; never mutated or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub opening_id: i64,
    pub reviewed_at: DateTime<Utc>,
    pub grade: i32,
    pub prompt_mode: PromptMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typed_moves: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_tokens: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_split_on_whitespace() {
        let line = OpeningLine {
            id: 1,
            name: "Scotch Game".to_string(),
            moves: "e4 e5  Nf3 Nc6".to_string(),
        };
        assert_eq!(line.tokens(), vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn side_alternates_from_white() {
        assert_eq!(Side::at_ply(0), Side::White);
        assert_eq!(Side::at_ply(1), Side::Black);
        assert_eq!(Side::at_ply(2), Side::White);
    }

    #[test]
    fn fresh_state_is_due_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let state = SchedulerState::new(today);
        assert_eq!(state.due_date, today);
        assert_eq!(state.interval_days, 0);
        assert_eq!(state.reps, 0);
        assert_eq!(state.lapses, 0);
        assert_eq!(state.ease, 2.5);
    }

    #[test]
    fn prompt_mode_round_trips() {
        let mode = PromptMode::NameToMoves;
        assert_eq!(PromptMode::from_str(mode.as_str()), Some(mode));
        assert_eq!(PromptMode::from_str("unknown"), None);
    }
}
