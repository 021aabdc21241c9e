//! # Repo Pilot CLI (`pilot`)
//!
//! ## Usage
//!
//! ```bash
//! pilot --config ./config/pilot.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pilot ingest <repo>` | Fetch a repository and summarize its context |
//! | `pilot context <path>` | Print the context document of a local tree |
//! | `pilot tokens <path>` | Estimate the token size of a local tree's context |
//! | `pilot ask <repo> "<question>"` | Ingest and answer one question |
//! | `pilot chat <repo>` | Ingest and start an interactive session |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

use repo_pilot::config::{self, Config};
use repo_pilot::ingest::{self, IngestReport};
use repo_pilot::oracle::{self, DisabledOracle, Oracle};
use repo_pilot::render::{export_diagrams, render_history, render_segments};
use repo_pilot::session::{QuickAction, Session};
use repo_pilot::tokens::estimate_tokens;

/// Repo Pilot — chat with a whole repository as LLM context.
#[derive(Parser)]
#[command(
    name = "pilot",
    about = "Repo Pilot — chat with a whole repository as LLM context",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/pilot.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a repository into the data directory and summarize its context.
    Ingest {
        /// Repository URL or path understood by `git clone`.
        repo: String,
    },

    /// Print the context document of a local directory.
    Context {
        path: PathBuf,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Estimate the token size of a local directory's context.
    Tokens { path: PathBuf },

    /// Ingest a repository and answer one question.
    Ask {
        repo: String,
        question: String,

        /// Treat `repo` as an existing local directory instead of fetching it.
        #[arg(long)]
        local: bool,

        /// Export each diagram as a `.mmd` file into this directory.
        #[arg(long)]
        diagrams_dir: Option<PathBuf>,
    },

    /// Ingest a repository and start an interactive session.
    ///
    /// `/onboard` and `/risks` run quick actions, `/history` lists past turns,
    /// and `/quit` exits.
    Chat {
        repo: String,

        #[arg(long)]
        local: bool,

        #[arg(long)]
        diagrams_dir: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "repo_pilot=info",
        1 => "repo_pilot=debug",
        _ => "repo_pilot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest { repo } => {
            let report = ingest::ingest_remote(&cfg, &repo)?;
            let oracle = oracle_or_disabled(&cfg);
            ingest::print_report(&report, oracle.as_ref()).await;
        }
        Commands::Context { path, output } => {
            let report = ingest::build_local(&cfg, &path)?;
            match output {
                Some(file) => std::fs::write(&file, report.context.as_str())
                    .with_context(|| format!("Failed to write {}", file.display()))?,
                None => print!("{}", report.context.as_str()),
            }
        }
        Commands::Tokens { path } => {
            let report = ingest::build_local(&cfg, &path)?;
            let oracle = oracle_or_disabled(&cfg);
            let tokens = estimate_tokens(oracle.as_ref(), report.context.as_str()).await;
            println!("{}", tokens);
        }
        Commands::Ask {
            repo,
            question,
            local,
            diagrams_dir,
        } => {
            let report = load(&cfg, &repo, local)?;
            let oracle = oracle::create_oracle(&cfg.oracle)?;
            let mut session = Session::new();
            session.set_context(report.context);

            let segments = session.ask(oracle.as_ref(), &question).await?;
            render_segments(&mut std::io::stdout().lock(), &segments)?;
            if let Some(dir) = diagrams_dir {
                export_diagrams(&dir, 1, &segments)?;
            }
        }
        Commands::Chat {
            repo,
            local,
            diagrams_dir,
        } => {
            let report = load(&cfg, &repo, local)?;
            let oracle = oracle::create_oracle(&cfg.oracle)?;
            ingest::print_report(&report, oracle.as_ref()).await;

            let mut session = Session::new();
            session.set_context(report.context);
            run_chat(&mut session, oracle.as_ref(), diagrams_dir.as_deref()).await?;
        }
    }

    Ok(())
}

fn load(cfg: &Config, repo: &str, local: bool) -> Result<IngestReport> {
    if local {
        ingest::build_local(cfg, Path::new(repo))
    } else {
        ingest::ingest_remote(cfg, repo)
    }
}

/// Token estimates work without an oracle, so fall back to the disabled one.
fn oracle_or_disabled(cfg: &Config) -> Box<dyn Oracle> {
    oracle::create_oracle(&cfg.oracle).unwrap_or_else(|e| {
        warn!(error = %e, "oracle unavailable, token counts are estimates");
        Box::new(DisabledOracle)
    })
}

async fn run_chat(
    session: &mut Session,
    oracle: &dyn Oracle,
    diagrams_dir: Option<&Path>,
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        let result = match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/onboard" => session.ask_action(oracle, QuickAction::Onboarding).await,
            "/risks" => session.ask_action(oracle, QuickAction::RiskAreas).await,
            "/history" => {
                render_history(&mut std::io::stdout().lock(), session.turns())?;
                continue;
            }
            query => session.ask(oracle, query).await,
        };

        match result {
            Ok(segments) => {
                render_segments(&mut std::io::stdout().lock(), &segments)?;
                if let Some(dir) = diagrams_dir {
                    let turn = session.turns().len() / 2;
                    for path in export_diagrams(dir, turn, &segments)? {
                        println!("(diagram saved to {})", path.display());
                    }
                }
            }
            // The session is untouched, so the user can simply ask again.
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}
