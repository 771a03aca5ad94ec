//! Spaced-repetition commands: due, quiz.

use std::io::{self, Write};

use anyhow::Context;
use chrono::{Local, Utc};
use opening_core::{check, pick_due, PromptMode, ReviewLogEntry, Sm2};

use crate::db::{OpeningRepository, SqliteRepository, StudyRepository};

pub fn due(repo: &SqliteRepository, prefix: Option<&str>, limit: usize) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    repo.ensure_states(prefix, today)?;

    let picked = pick_due(repo.due_candidates(prefix)?, today, limit);
    let due_today: Vec<_> = picked.iter().filter(|d| d.due_date <= today).collect();
    if due_today.is_empty() {
        println!("Nothing due today.");
        return Ok(());
    }

    for d in due_today {
        println!("{}  (due {})", d.line.name, d.due_date);
    }
    Ok(())
}

/// Quiz typed recall for each picked opening, then grade it 0..5 to
/// schedule the next review.
pub fn quiz(
    repo: &mut SqliteRepository,
    prefix: Option<&str>,
    limit: usize,
    tokens: usize,
    dry_run: bool,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let created = repo.ensure_states(prefix, today)?;
    if created > 0 {
        println!("Created {created} study cards.");
    }

    let picked = pick_due(repo.due_candidates(prefix)?, today, limit);
    if picked.is_empty() {
        println!("No openings found.");
        return Ok(());
    }

    let sm2 = Sm2::default();
    for candidate in picked {
        let line = &candidate.line;
        println!("\n{}  (due {})", line.name, candidate.due_date);

        let line_tokens = line.tokens();
        if dry_run {
            let target: Vec<String> = line_tokens.iter().take(tokens).cloned().collect();
            println!("Answer: {}", target.join(" "));
            continue;
        }

        let typed = prompt(&format!("Type first {tokens} moves (SAN tokens)"))?;
        let result = check(&line_tokens, &typed, tokens)?;
        if result.fully_correct() {
            println!(
                "Correct ({}/{})",
                result.correct_tokens,
                result.target_tokens()
            );
        } else {
            println!(
                "Partial ({}/{})",
                result.correct_tokens,
                result.target_tokens()
            );
            println!("Answer: {}", result.target.join(" "));
        }

        let grade: i32 = loop {
            let raw = prompt("Grade your recall (0..5, default 4)")?;
            let raw = if raw.is_empty() { "4" } else { raw.as_str() };
            match raw.parse() {
                Ok(g) if (0..=5).contains(&g) => break g,
                _ => println!("Grade must be an integer 0..5"),
            }
        };

        let entry = ReviewLogEntry {
            opening_id: line.id,
            reviewed_at: Utc::now(),
            grade,
            prompt_mode: PromptMode::NameToMoves,
            prompt: Some(line.name.clone()),
            typed_moves: Some(typed),
            correct_tokens: Some(result.correct_tokens),
            target_tokens: Some(result.target_tokens()),
        };
        let next = repo.submit_review(&sm2, &entry, today)?;
        println!("Next review: {}", next.due_date);

        if let Some(notes) = repo.get_notes(line.id)? {
            println!("Note: {notes}");
        }
    }
    Ok(())
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input).context("reading stdin")?;
    Ok(input.trim().to_string())
}
