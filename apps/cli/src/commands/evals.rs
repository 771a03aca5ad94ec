//! Engine evaluation commands: eval, eval-all.

use anyhow::{bail, Context};
use opening_core::OpeningLine;

use crate::chess;
use crate::config::Settings;
use crate::db::{EvalRepository, OpeningRepository, SqliteRepository, StoredEval};
use crate::engine::{format_stored_score, RawScore, UciEngine};

pub fn eval_one(
    repo: &SqliteRepository,
    settings: &Settings,
    name: &str,
    depth: u32,
) -> anyhow::Result<()> {
    let Some(line) = repo.get_opening_by_name(name)? else {
        bail!("no opening named '{name}'");
    };

    let mut engine = spawn_engine(settings)?;
    let stored = evaluate_and_store(repo, &mut engine, &line, depth)?;

    println!(
        "{} @ depth {}: {}",
        line.name,
        stored.depth,
        format_stored_score(stored.score_cp, stored.mate_in)
    );
    if let Some(bestmove) = &stored.bestmove_uci {
        println!("bestmove: {bestmove}");
    }
    if let Some(pv) = &stored.pv_uci {
        println!("pv: {pv}");
    }
    Ok(())
}

pub fn eval_all(repo: &SqliteRepository, settings: &Settings, depth: u32) -> anyhow::Result<()> {
    let lines = repo.list_openings(None, 1000)?;
    if lines.is_empty() {
        println!("No openings stored yet.");
        return Ok(());
    }

    let mut engine = spawn_engine(settings)?;
    for line in &lines {
        let stored = evaluate_and_store(repo, &mut engine, line, depth)?;
        println!(
            "{}  {}  {}",
            line.name,
            format_stored_score(stored.score_cp, stored.mate_in),
            stored.bestmove_uci.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn spawn_engine(settings: &Settings) -> anyhow::Result<UciEngine> {
    let path = UciEngine::resolve_path(settings.stockfish_path.as_deref())?;
    UciEngine::spawn(&path).context("starting engine")
}

fn evaluate_and_store(
    repo: &SqliteRepository,
    engine: &mut UciEngine,
    line: &OpeningLine,
    depth: u32,
) -> anyhow::Result<StoredEval> {
    let position = chess::final_position(&line.tokens())?;
    let eval = engine.evaluate_fen(&chess::fen(&position), depth)?;

    let (score_cp, mate_in) = match eval.score {
        RawScore::Centipawns(cp) => (Some(cp), None),
        RawScore::Mate(m) => (None, Some(m)),
    };
    Ok(repo.insert_evaluation(
        line.id,
        eval.depth,
        score_cp,
        mate_in,
        eval.bestmove_uci.as_deref(),
        eval.pv_uci.as_deref(),
    )?)
}
