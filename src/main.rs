use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tracing_subscriber::EnvFilter;

use ssot_mcp::config::{get_config_path, load_config, resolve_root, save_config, ServerConfig};
use ssot_mcp::errors::Result;
use ssot_mcp::mcp::McpServer;
use ssot_mcp::smoke::run_smoke_suite;
use ssot_mcp::ssot::{validate_file, verify_integrity, SsotReport};

/// Repository introspection over the Model Context Protocol.
#[derive(Parser)]
#[command(
    name = "ssot-mcp",
    version,
    about = "MCP stdio server for repository scan, SSOT hashing and dependency-graph queries"
)]
struct Cli {
    /// Repository root (default: nearest ancestor containing .git)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,
    /// Write a default configuration file
    Init,
    /// Print the canonical SSOT hash
    Hash {
        /// Document to hash (default: configured SSOT path)
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Fail unless the hash equals this value
        #[arg(short, long)]
        expected: Option<String>,
    },
    /// Run every tool once and report the results
    Smoke {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries protocol frames only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn load(root: Option<PathBuf>) -> Result<ServerConfig> {
    let root = resolve_root(root);
    let mut config = load_config(&root)?;
    config.apply_env_overrides();
    Ok(config)
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = load(cli.root)?;
            tracing::info!(
                root = %config.root_dir,
                ssot = %config.ssot_file().display(),
                graph = %config.graph_file().display(),
                "starting MCP stdio server"
            );
            McpServer::new(config).run().await?;
        }
        Commands::Init => {
            let root = resolve_root(cli.root);
            let config = ServerConfig {
                root_dir: root.to_string_lossy().to_string(),
                ..ServerConfig::default()
            };
            save_config(&root, &config)?;
            println!("Wrote {}", get_config_path(&root).display());
        }
        Commands::Hash { path, expected } => {
            let config = load(cli.root)?;
            let path = path.unwrap_or_else(|| config.ssot_file());
            match expected {
                Some(expected) => match verify_integrity(&path, &expected) {
                    Some((hash, true)) => println!("OK {}", hash),
                    Some((hash, false)) => {
                        println!("MISMATCH {} (expected {})", hash, expected.trim());
                        return Ok(1);
                    }
                    None => {
                        eprintln!("cannot read {}", path.display());
                        return Ok(1);
                    }
                },
                None => match validate_file(&path) {
                    SsotReport::Valid { hash, .. } => println!("{}", hash),
                    SsotReport::Error { message } => {
                        eprintln!("{}", message);
                        return Ok(1);
                    }
                },
            }
        }
        Commands::Smoke { json } => {
            let config = load(cli.root)?;
            let results = run_smoke_suite(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!(
                    "Smoke suite: {}/{} passed",
                    results.passed, results.total_validations
                );
                for v in &results.validations {
                    let mark = if v.passed { "ok  " } else { "FAIL" };
                    match &v.error {
                        Some(err) => println!("  {} {} - {}", mark, v.name, err),
                        None => println!("  {} {}", mark, v.name),
                    }
                }
            }
            if !results.success {
                return Ok(1);
            }
        }
    }
    Ok(0)
}
