//! # Notelens CLI (`nlens`)
//!
//! The `nlens` binary is the primary interface for Notelens. It starts the
//! tool server, runs full agent queries against it, and provides local
//! ranking inspection.
//!
//! ## Usage
//!
//! ```bash
//! nlens --config ./notelens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nlens serve` | Start the HTTP tool server |
//! | `nlens ask "<query>"` | Run one agent query end to end |
//! | `nlens rank "<query>"` | Rank corpus pages locally, print excerpts |
//! | `nlens tools` | List tools advertised by a running server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use notelens::client::{HttpToolClient, ToolTransport};
use notelens::llm::CompletionClient;
use notelens::{agent, config, rank, server};

/// Notelens — a local PDF knowledge base with a vision-capable agent client.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file falls back to defaults (`study_notes/` corpus,
/// `mcp_images/` output, port 8050).
#[derive(Parser)]
#[command(
    name = "nlens",
    about = "Notelens — a local PDF knowledge base with a vision-capable agent client",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./notelens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP tool server.
    ///
    /// Binds to the address in `[server].bind` and serves the
    /// knowledge-base tool until the process is terminated.
    Serve,

    /// Run one agent query end to end.
    ///
    /// Connects to the tool server, issues the first completion with the
    /// tool catalog, executes requested tools, and prints the final answer
    /// (from text, a follow-up tool round, or a vision round over rendered
    /// page images).
    Ask {
        /// The question to answer.
        query: String,

        /// Tool server base URL. Defaults to the configured bind address.
        #[arg(long)]
        server: Option<String>,
    },

    /// Rank corpus pages for a query, locally.
    ///
    /// No network and no rendering: prints the scored top pages with
    /// highlighted keyword excerpts. Useful for inspecting why a page was
    /// (or wasn't) retrieved.
    Rank {
        /// The query whose keywords to rank against.
        query: String,
    },

    /// List the tools advertised by a running server.
    Tools {
        /// Tool server base URL. Defaults to the configured bind address.
        #[arg(long)]
        server: Option<String>,
    },
}

/// Resolve the tool server base URL from the flag or the configured bind.
fn server_url(config: &config::Config, flag: Option<String>) -> String {
    flag.unwrap_or_else(|| format!("http://{}", config.server.bind))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { query, server } => {
            let completions = CompletionClient::new(&cfg.llm)?;
            println!("Using model: {}", completions.model());

            let transport = HttpToolClient::connect(&server_url(&cfg, server)).await?;

            println!("\nQuery: {}", query);
            let answer = agent::process_query(&completions, &transport, &query).await;
            println!("\nResponse: {}", answer);
        }
        Commands::Rank { query } => {
            rank::run_rank(&cfg, &query)?;
        }
        Commands::Tools { server } => {
            let transport = HttpToolClient::connect(&server_url(&cfg, server)).await?;
            for tool in transport.list_tools().await? {
                println!("{} — {}", tool.name, tool.description);
            }
        }
    }

    Ok(())
}
