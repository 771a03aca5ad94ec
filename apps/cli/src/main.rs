//! Store chess openings, drill them with spaced repetition, and evaluate
//! them with a UCI engine.

mod chess;
mod commands;
mod config;
mod db;
mod engine;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Settings;
use crate::db::SqliteRepository;

#[derive(Parser)]
#[command(
    name = "opening-trainer",
    version,
    about = "Store chess openings, drill them with spaced repetition, and evaluate them with a UCI engine."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize the database.
    Init,
    /// Add an opening (validates SAN moves before saving).
    Add {
        name: String,
        /// SAN moves, space-separated.
        #[arg(long)]
        moves: String,
    },
    /// Import openings from a TSV file (name<TAB>moves per line).
    Import {
        file: PathBuf,
        /// Prefix added to every imported name.
        #[arg(long, default_value = "")]
        name_prefix: String,
        /// Validate without inserting.
        #[arg(long)]
        dry_run: bool,
    },
    /// List stored openings.
    List {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Show an opening with notes and its latest stored evaluation.
    Show { name: String },
    /// Attach notes (mnemonics, triggers, plans) to an opening.
    Note {
        name: String,
        #[arg(long)]
        text: String,
    },
    /// Show what to review today.
    Due {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Type the first N moves of each due opening, then grade your recall.
    Quiz {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// How many SAN tokens to recall.
        #[arg(long, default_value_t = 10)]
        tokens: usize,
        /// Show answers without prompting or scheduling.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a study sheet of chunked lines, with engine evals when available.
    Learn {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Tokens per chunk.
        #[arg(long, default_value_t = 8)]
        chunk: usize,
        /// Skip engine evaluation.
        #[arg(long)]
        no_eval: bool,
        #[arg(long, default_value_t = 10)]
        depth: u32,
        /// Highlight swings at or above this many centipawns.
        #[arg(long, default_value_t = 120)]
        swing_cp: i64,
    },
    /// Show the branching structure across stored lines.
    Tree {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 200)]
        limit: usize,
        /// Branching levels to expand.
        #[arg(long, default_value_t = 3)]
        levels: usize,
        /// Emit the tree as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one opening's final position and store the result.
    Eval {
        name: String,
        #[arg(long, default_value_t = 14)]
        depth: u32,
    },
    /// Evaluate every stored opening.
    EvalAll {
        #[arg(long, default_value_t = 14)]
        depth: u32,
    },
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    let cli = Cli::parse();

    match cli.command {
        Command::Init => {
            SqliteRepository::open(&settings.db_path)?;
            println!("Initialized {}", settings.db_path.display());
            Ok(())
        }
        Command::Add { name, moves } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::openings::add(&repo, &name, &moves)
        }
        Command::Import {
            file,
            name_prefix,
            dry_run,
        } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::openings::import(&repo, &file, &name_prefix, dry_run)
        }
        Command::List { prefix } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::openings::list(&repo, prefix.as_deref())
        }
        Command::Show { name } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::openings::show(&repo, &name)
        }
        Command::Note { name, text } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::openings::note(&repo, &name, &text)
        }
        Command::Due { prefix, limit } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::study::due(&repo, prefix.as_deref(), limit)
        }
        Command::Quiz {
            prefix,
            limit,
            tokens,
            dry_run,
        } => {
            let mut repo = SqliteRepository::open(&settings.db_path)?;
            commands::study::quiz(&mut repo, prefix.as_deref(), limit, tokens, dry_run)
        }
        Command::Learn {
            prefix,
            limit,
            chunk,
            no_eval,
            depth,
            swing_cp,
        } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::teach::learn(
                &repo,
                &settings,
                prefix.as_deref(),
                limit,
                chunk,
                !no_eval,
                depth,
                swing_cp,
            )
        }
        Command::Tree {
            prefix,
            limit,
            levels,
            json,
        } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::teach::tree(&repo, prefix.as_deref(), limit, levels, json)
        }
        Command::Eval { name, depth } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::evals::eval_one(&repo, &settings, &name, depth)
        }
        Command::EvalAll { depth } => {
            let repo = SqliteRepository::open(&settings.db_path)?;
            commands::evals::eval_all(&repo, &settings, depth)
        }
        Command::Serve { bind } => server::serve(settings, &bind).await,
    }
}
