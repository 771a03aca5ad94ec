//! Study-sheet and branch-tree commands.

use opening_core::{analyze_line, build_tree, chunk_tokens, SwingReport, TreeNode};
use tracing::warn;

use crate::config::Settings;
use crate::db::{OpeningRepository, SqliteRepository};
use crate::engine::{EngineOracle, UciEngine};

/// Print each line split into small chunks to rehearse, with the largest
/// evaluation swing highlighted when an engine is available.
#[allow(clippy::too_many_arguments)]
pub fn learn(
    repo: &SqliteRepository,
    settings: &Settings,
    prefix: Option<&str>,
    limit: usize,
    chunk: usize,
    eval: bool,
    depth: u32,
    swing_cp: i64,
) -> anyhow::Result<()> {
    let lines = repo.list_openings(prefix, limit)?;
    if lines.is_empty() {
        println!("No openings found.");
        return Ok(());
    }

    let mut engine = if eval {
        match UciEngine::resolve_path(settings.stockfish_path.as_deref())
            .and_then(|path| UciEngine::spawn(&path))
        {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!("engine unavailable: {e}");
                println!("Engine not available; continuing without eval.");
                None
            }
        }
    } else {
        None
    };

    for line in &lines {
        println!("\n{}", line.name);
        let tokens = line.tokens();

        let report: Option<SwingReport> = match engine.as_mut() {
            Some(engine) => {
                let mut oracle = EngineOracle::new(engine, depth);
                match analyze_line(&tokens, &mut oracle, swing_cp) {
                    Ok(report) => Some(report),
                    Err(aborted) => {
                        // Keep whatever the scan saw before it failed.
                        warn!("scan aborted for '{}': {aborted}", line.name);
                        aborted.partial
                    }
                }
            }
            None => None,
        };

        let critical_idx = report
            .as_ref()
            .and_then(|r| r.largest.as_ref())
            .map(|l| l.index);
        let display: Vec<String> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if Some(i) == critical_idx {
                    format!("[{t}]")
                } else {
                    t.clone()
                }
            })
            .collect();
        for (i, row) in chunk_tokens(&display, chunk).iter().enumerate() {
            println!("{:02}  {row}", i + 1);
        }

        if let Some(report) = &report {
            println!(
                "Final eval (depth {depth}, White POV): {}",
                report.final_display()
            );
            if let Some(largest) = &report.largest {
                let tag = if largest.critical {
                    "CRITICAL"
                } else {
                    "Largest swing"
                };
                println!(
                    "{tag}: ply {} ({}) {}  {} -> {}  (Δ {:.2})",
                    largest.index + 1,
                    largest.side.as_str(),
                    largest.token,
                    largest.display_before,
                    largest.display_after,
                    largest.delta.abs() as f64 / 100.0
                );
            }
        }
    }
    Ok(())
}

/// Print the branching structure: the common prefix, then what the next
/// move usually is, expanded up to `levels`.
pub fn tree(
    repo: &SqliteRepository,
    prefix: Option<&str>,
    limit: usize,
    levels: usize,
    json: bool,
) -> anyhow::Result<()> {
    let lines = repo.list_openings(prefix, limit)?;
    if lines.is_empty() {
        println!("No openings found.");
        return Ok(());
    }

    let tree = build_tree(&lines, levels);
    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    println!("Common start ({} tokens)", tree.common_prefix.len());
    if tree.common_prefix.is_empty() {
        println!("(none)");
    } else {
        println!("{}", tree.common_prefix.join(" "));
    }

    println!("\nNext branches");
    print_nodes(&tree.roots, 0);
    Ok(())
}

fn print_nodes(nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        println!(
            "{}- {}  ({})  {}",
            "  ".repeat(depth),
            node.token,
            node.count,
            node.example_names.join(", ")
        );
        print_nodes(&node.children, depth + 1);
    }
}
