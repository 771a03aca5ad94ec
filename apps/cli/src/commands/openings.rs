//! Opening management commands: add, import, list, show, note.

use std::path::Path;

use anyhow::{bail, Context};
use opening_core::tokenize;
use regex::Regex;

use crate::chess;
use crate::db::{DbError, EvalRepository, OpeningRepository, SqliteRepository};
use crate::engine::format_stored_score;

pub fn add(repo: &SqliteRepository, name: &str, moves: &str) -> anyhow::Result<()> {
    let tokens = tokenize(moves);
    if tokens.is_empty() {
        bail!("no moves provided");
    }
    // Validate early so we don't store garbage.
    chess::final_position(&tokens).context("invalid SAN moves")?;

    let line = repo.add_opening(name, moves.trim())?;
    println!("Added {}", line.name);
    Ok(())
}

pub fn list(repo: &SqliteRepository, prefix: Option<&str>) -> anyhow::Result<()> {
    let lines = repo.list_openings(prefix, 1000)?;
    if lines.is_empty() {
        println!("No openings stored yet.");
        return Ok(());
    }

    let width = lines.iter().map(|l| l.name.len()).max().unwrap_or(0);
    for line in &lines {
        println!("{:width$}  {}", line.name, line.moves);
    }
    Ok(())
}

pub fn show(repo: &SqliteRepository, name: &str) -> anyhow::Result<()> {
    let Some(line) = repo.get_opening_by_name(name)? else {
        bail!("no opening named '{name}'");
    };

    println!("{}", line.name);
    println!("{}", line.moves);
    let position = chess::final_position(&line.tokens())?;
    println!("FEN: {}", chess::fen(&position));

    if let Some(notes) = repo.get_notes(line.id)? {
        println!("\nNotes\n{notes}");
    }
    if let Some(eval) = repo.latest_evaluation(line.id)? {
        println!(
            "Latest eval @ depth {}: {}",
            eval.depth,
            format_stored_score(eval.score_cp, eval.mate_in)
        );
    }
    Ok(())
}

pub fn note(repo: &SqliteRepository, name: &str, text: &str) -> anyhow::Result<()> {
    let Some(line) = repo.get_opening_by_name(name)? else {
        bail!("no opening named '{name}'");
    };
    repo.set_notes(line.id, text.trim())?;
    println!("Saved notes for {}", line.name);
    Ok(())
}

/// Import openings from a TSV file.
///
/// Blank lines and `#` comments are ignored. Each remaining line is either
/// `<name>\t<pgn-moves>` or bare `<pgn-moves>` (name auto-generated).
/// Move numbers and game results are stripped from the PGN side.
pub fn import(
    repo: &SqliteRepository,
    file: &Path,
    name_prefix: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let rows = parse_rows(&content);
    if rows.is_empty() {
        bail!("no importable lines found in {}", file.display());
    }

    let mut added = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for (name, pgn) in rows {
        let full_name = format!("{name_prefix}{name}").trim().to_string();
        let moves = sanitize_pgn_moves(&pgn);
        let tokens = tokenize(&moves);

        if tokens.is_empty() {
            failed += 1;
            println!("FAIL: {full_name}: no moves");
            continue;
        }
        if let Err(e) = chess::final_position(&tokens) {
            failed += 1;
            println!("FAIL: {full_name}: {e}");
            continue;
        }
        if dry_run {
            added += 1;
            println!("OK (validated): {full_name}");
            continue;
        }

        match repo.add_opening(&full_name, &moves) {
            Ok(_) => {
                added += 1;
                println!("ADDED: {full_name}");
            }
            Err(DbError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                skipped += 1;
                println!("SKIP (already exists): {full_name}");
            }
            Err(e) => {
                failed += 1;
                println!("FAIL: {full_name}: {e}");
            }
        }
    }

    println!("\nDone. added={added} skipped={skipped} failed={failed} dry_run={dry_run}");
    Ok(())
}

/// Drop move numbers ("12." / "12...") and game results from PGN text.
fn sanitize_pgn_moves(pgn: &str) -> String {
    let move_number = Regex::new(r"^\d+\.(\.\.)?$").expect("hardcoded regex");
    pgn.split_whitespace()
        .filter(|tok| !move_number.is_match(tok))
        .filter(|tok| !matches!(*tok, "1-0" | "0-1" | "1/2-1/2" | "*"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_rows(content: &str) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let mut auto = 1;
    let mut auto_name = || {
        let name = format!("Imported line {auto}");
        auto += 1;
        name
    };

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('\t') {
            Some((name, pgn)) if !name.trim().is_empty() => {
                rows.push((name.trim().to_string(), pgn.trim().to_string()));
            }
            Some((_, pgn)) => rows.push((auto_name(), pgn.trim().to_string())),
            None => rows.push((auto_name(), line.to_string())),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pgn_sanitizing_strips_numbers_and_results() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. d4 exd4 1-0";
        assert_eq!(sanitize_pgn_moves(pgn), "e4 e5 Nf3 Nc6 d4 exd4");

        let black_first = "12... Qd8 13. Bg5 *";
        assert_eq!(sanitize_pgn_moves(black_first), "Qd8 Bg5");
    }

    #[test]
    fn rows_parse_names_comments_and_bare_lines() {
        let content = "# comment\n\nScotch\t1. e4 e5\n1. d4 d5\n\t1. c4\n";
        let rows = parse_rows(content);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], ("Scotch".to_string(), "1. e4 e5".to_string()));
        assert_eq!(rows[1].0, "Imported line 1");
        assert_eq!(rows[2].0, "Imported line 2");
    }
}
