//! Evaluation-swing detection across the plies of one line.
//!
//! Walks a line move by move through an external evaluation oracle and
//! identifies the ply with the largest score change. Scores are always
//! from White's point of view so they compare directly ply-to-ply.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::CoreError;
use crate::types::Side;

/// Saturating sentinel for forced mates, comparable against centipawns.
pub const MATE_SCORE: i64 = 100_000;

/// A White-POV score with its display form (e.g. "+0.35", "M3").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleScore {
    pub score: i64,
    pub display: String,
}

/// Collaborator boundary for move application and position evaluation.
///
/// Implementors own the board state; the core only sequences calls. Mates
/// must be normalized to `±MATE_SCORE` before they reach the core.
pub trait EvalOracle {
    /// Apply one move token to the current position.
    fn play(&mut self, token: &str) -> Result<(), CoreError>;

    /// Evaluate the current position from White's point of view.
    fn evaluate(&mut self) -> Result<OracleScore, CoreError>;
}

/// One evaluated ply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlyEval {
    pub index: usize,
    pub token: String,
    pub side: Side,
    pub score_before: i64,
    pub score_after: i64,
    pub display_before: String,
    pub display_after: String,
    pub delta: i64,
}

/// The ply with the largest absolute score change seen so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargestSwing {
    pub index: usize,
    pub side: Side,
    pub token: String,
    pub display_before: String,
    pub display_after: String,
    pub delta: i64,
    /// Magnitude at or above the caller's threshold.
    pub critical: bool,
}

/// Full scan result for one line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwingReport {
    pub start: OracleScore,
    pub plies: Vec<PlyEval>,
    pub largest: Option<LargestSwing>,
}

impl SwingReport {
    pub fn final_score(&self) -> i64 {
        self.plies
            .last()
            .map(|p| p.score_after)
            .unwrap_or(self.start.score)
    }

    pub fn final_display(&self) -> &str {
        self.plies
            .last()
            .map(|p| p.display_after.as_str())
            .unwrap_or(self.start.display.as_str())
    }
}

/// A scan that failed mid-line, with whatever was evaluated before the
/// failure. `partial` is `None` only when the starting position itself
/// could not be evaluated.
#[derive(Debug, Error)]
#[error("scan aborted at ply {ply}: {source}")]
pub struct ScanAborted {
    pub ply: usize,
    pub partial: Option<SwingReport>,
    #[source]
    pub source: CoreError,
}

/// Evaluate every position of a line and find the largest swing.
///
/// The oracle is queried once for the start position and once after each
/// ply, strictly in order. Ties go to the earliest ply. Oracle failures
/// abort the scan; the caller owns any retry policy.
pub fn analyze_line(
    tokens: &[String],
    oracle: &mut dyn EvalOracle,
    critical_cp: i64,
) -> Result<SwingReport, ScanAborted> {
    let start = match oracle.evaluate() {
        Ok(score) => score,
        Err(source) => {
            return Err(ScanAborted {
                ply: 0,
                partial: None,
                source,
            })
        }
    };

    let mut report = SwingReport {
        start: start.clone(),
        plies: Vec::with_capacity(tokens.len()),
        largest: None,
    };
    let mut previous = start;
    let mut best_abs: i64 = -1;

    for (index, token) in tokens.iter().enumerate() {
        if let Err(source) = oracle.play(token) {
            return Err(ScanAborted {
                ply: index,
                partial: Some(report),
                source,
            });
        }
        let current = match oracle.evaluate() {
            Ok(score) => score,
            Err(source) => {
                return Err(ScanAborted {
                    ply: index,
                    partial: Some(report),
                    source,
                })
            }
        };

        let delta = current.score - previous.score;
        // Strict inequality: the first ply reaching the maximum keeps it.
        if delta.abs() > best_abs {
            best_abs = delta.abs();
            report.largest = Some(LargestSwing {
                index,
                side: Side::at_ply(index),
                token: token.clone(),
                display_before: previous.display.clone(),
                display_after: current.display.clone(),
                delta,
                critical: delta.abs() >= critical_cp,
            });
        }

        report.plies.push(PlyEval {
            index,
            token: token.clone(),
            side: Side::at_ply(index),
            score_before: previous.score,
            score_after: current.score,
            display_before: previous.display.clone(),
            display_after: current.display.clone(),
            delta,
        });
        previous = current;
    }

    Ok(report)
}
