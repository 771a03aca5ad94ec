//! UCI engine process management and score normalization.
//!
//! This is the oracle boundary: whatever shape the engine reports in
//! (cp or mate, side-to-move relative), exactly one normalized score
//! shape reaches the core.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use opening_core::{CoreError, EvalOracle, OracleScore, MATE_SCORE};
use shakmaty::{Chess, Color, Position};
use thiserror::Error;

use crate::chess;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine binary not found; install stockfish or set STOCKFISH_PATH")]
    NotFound,

    #[error("engine io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected engine reply: {0}")]
    Protocol(String),
}

/// Raw engine verdict for one search, relative to the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    Centipawns(i64),
    Mate(i32),
}

/// One completed search.
#[derive(Debug, Clone)]
pub struct EngineEval {
    pub depth: u32,
    pub score: RawScore,
    pub bestmove_uci: Option<String>,
    pub pv_uci: Option<String>,
}

impl EngineEval {
    /// Numeric score and display string from White's point of view.
    ///
    /// Mates saturate at `±MATE_SCORE` so they keep ordering against
    /// ordinary centipawn scores.
    pub fn white_pov(&self, turn: Color) -> OracleScore {
        match self.score {
            RawScore::Mate(m) => {
                let pov_mate = if turn == Color::White { m } else { -m };
                let score = if pov_mate > 0 { MATE_SCORE } else { -MATE_SCORE };
                OracleScore {
                    score,
                    display: format!("M{pov_mate}"),
                }
            }
            RawScore::Centipawns(cp) => {
                let cp = if turn == Color::White { cp } else { -cp };
                OracleScore {
                    score: cp,
                    display: format_cp(cp),
                }
            }
        }
    }
}

/// Signed pawns, e.g. "+0.35".
pub fn format_cp(cp: i64) -> String {
    format!("{:+.2}", cp as f64 / 100.0)
}

/// Display for a stored side-to-move evaluation, e.g. "M3" or "0.35".
pub fn format_stored_score(score_cp: Option<i64>, mate_in: Option<i32>) -> String {
    if let Some(mate) = mate_in {
        return format!("M{mate}");
    }
    match score_cp {
        Some(cp) => format!("{:.2}", cp as f64 / 100.0),
        None => "?".to_string(),
    }
}

/// A running UCI engine process.
pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl UciEngine {
    /// Locate the engine binary: explicit path first, then `stockfish`
    /// anywhere on PATH.
    pub fn resolve_path(explicit: Option<&str>) -> Result<String, EngineError> {
        if let Some(path) = explicit {
            return Ok(path.to_string());
        }
        let path_var = std::env::var_os("PATH").unwrap_or_default();
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join("stockfish");
            if candidate.is_file() {
                return Ok(candidate.to_string_lossy().into_owned());
            }
        }
        Err(EngineError::NotFound)
    }

    pub fn spawn(path: &str) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::NotFound
                } else {
                    EngineError::Io(e)
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("no stdin pipe".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| EngineError::Protocol("no stdout pipe".to_string()))?;

        let mut engine = Self {
            child,
            stdin,
            stdout,
        };
        engine.send("uci")?;
        engine.wait_for("uciok")?;
        engine.send("isready")?;
        engine.wait_for("readyok")?;
        Ok(engine)
    }

    fn send(&mut self, command: &str) -> Result<(), EngineError> {
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn wait_for(&mut self, marker: &str) -> Result<(), EngineError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(EngineError::Protocol(format!(
                    "engine closed before '{marker}'"
                )));
            }
            if line.trim_end().starts_with(marker) {
                return Ok(());
            }
        }
    }

    /// Search a position at fixed depth; the last `info` score before
    /// `bestmove` is the final one.
    pub fn evaluate_fen(&mut self, fen: &str, depth: u32) -> Result<EngineEval, EngineError> {
        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go depth {depth}"))?;

        let mut score: Option<RawScore> = None;
        let mut pv_uci: Option<String> = None;
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(EngineError::Protocol("engine closed during search".to_string()));
            }
            let trimmed = line.trim_end();

            if trimmed.starts_with("info ") {
                if let Some(s) = parse_info_score(trimmed) {
                    score = Some(s);
                }
                if let Some(pv) = parse_info_pv(trimmed) {
                    pv_uci = Some(pv);
                }
            } else if let Some(rest) = trimmed.strip_prefix("bestmove") {
                let bestmove_uci = rest
                    .split_whitespace()
                    .next()
                    .filter(|m| *m != "(none)")
                    .map(str::to_string);
                let score = score.ok_or_else(|| {
                    EngineError::Protocol("no score before bestmove".to_string())
                })?;
                return Ok(EngineEval {
                    depth,
                    score,
                    bestmove_uci,
                    pv_uci,
                });
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.child.wait();
    }
}

fn parse_info_score(line: &str) -> Option<RawScore> {
    let mut parts = line.split_whitespace();
    while let Some(token) = parts.next() {
        if token == "score" {
            return match parts.next()? {
                "cp" => parts.next()?.parse().ok().map(RawScore::Centipawns),
                "mate" => parts.next()?.parse().ok().map(RawScore::Mate),
                _ => None,
            };
        }
    }
    None
}

fn parse_info_pv(line: &str) -> Option<String> {
    line.split_once(" pv ")
        .map(|(_, rest)| rest.trim().to_string())
}

/// Bridges the engine and the core's swing scan for one line.
///
/// Owns the board state; the core only sequences `play`/`evaluate` calls.
pub struct EngineOracle<'a> {
    engine: &'a mut UciEngine,
    position: Chess,
    depth: u32,
    ply: usize,
}

impl<'a> EngineOracle<'a> {
    pub fn new(engine: &'a mut UciEngine, depth: u32) -> Self {
        Self {
            engine,
            position: Chess::default(),
            depth,
            ply: 0,
        }
    }
}

impl EvalOracle for EngineOracle<'_> {
    fn play(&mut self, token: &str) -> Result<(), CoreError> {
        self.position =
            chess::apply_san(self.position.clone(), token, self.ply).map_err(|_| {
                CoreError::IllegalToken {
                    token: token.to_string(),
                    ply: self.ply,
                }
            })?;
        self.ply += 1;
        Ok(())
    }

    fn evaluate(&mut self) -> Result<OracleScore, CoreError> {
        let fen = chess::fen(&self.position);
        let eval = self
            .engine
            .evaluate_fen(&fen, self.depth)
            .map_err(|e| CoreError::OracleUnavailable(e.to_string()))?;
        Ok(eval.white_pov(self.position.turn()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_lines_yield_the_score() {
        let line = "info depth 14 seldepth 20 multipv 1 score cp 35 nodes 12345 pv e2e4 e7e5";
        assert_eq!(parse_info_score(line), Some(RawScore::Centipawns(35)));
        assert_eq!(parse_info_pv(line).as_deref(), Some("e2e4 e7e5"));

        let mate = "info depth 10 score mate -3 nodes 99 pv f7f8";
        assert_eq!(parse_info_score(mate), Some(RawScore::Mate(-3)));

        assert_eq!(parse_info_score("info depth 5 nodes 100"), None);
    }

    #[test]
    fn white_pov_flips_for_black_to_move() {
        let eval = EngineEval {
            depth: 10,
            score: RawScore::Centipawns(-40),
            bestmove_uci: None,
            pv_uci: None,
        };
        assert_eq!(eval.white_pov(Color::White).score, -40);
        assert_eq!(eval.white_pov(Color::Black).score, 40);
        assert_eq!(eval.white_pov(Color::Black).display, "+0.40");
    }

    #[test]
    fn mates_saturate_to_the_sentinel() {
        let winning = EngineEval {
            depth: 10,
            score: RawScore::Mate(3),
            bestmove_uci: None,
            pv_uci: None,
        };
        let white = winning.white_pov(Color::White);
        assert_eq!(white.score, MATE_SCORE);
        assert_eq!(white.display, "M3");

        // Black to move and mating means White is getting mated.
        let black = winning.white_pov(Color::Black);
        assert_eq!(black.score, -MATE_SCORE);
        assert_eq!(black.display, "M-3");
    }

    #[test]
    fn stored_score_formatting() {
        assert_eq!(format_stored_score(None, Some(2)), "M2");
        assert_eq!(format_stored_score(Some(35), None), "0.35");
        assert_eq!(format_stored_score(None, None), "?");
        assert_eq!(format_cp(-215), "-2.15");
    }
}
