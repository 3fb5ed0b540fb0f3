//! Memopad CLI
//!
//! Runs the HTTP server and offers direct memo commands against the
//! configured backend platform:
//! - Serve the API and live memo board
//! - List, add and delete memos
//! - Watch the memo list live
//! - Generate a default config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use memopad::api::{serve, AppState};
use memopad::backend::{self, Backend};
use memopad::config::{generate_default_config, Config, LoggingConfig};
use memopad::memos::{MemoBoard, MemoStore};

#[derive(Parser)]
#[command(name = "memopad")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Short text memos with live updates on a hosted backend platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/memopad/config.toml, /etc/memopad/config.toml, ./memopad.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve,

    /// List memos, newest first
    List,

    /// Add a memo
    Add {
        /// Memo text
        content: String,
    },

    /// Delete a memo by id
    Delete {
        /// Memo id
        id: i64,
    },

    /// Print the memo list every time it changes, until Ctrl+C
    Watch,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    // Config loading logs before the configured subscriber exists
    let bootstrap = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new("memopad=info"))
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || load_config(cli.config.as_deref()))?;

    init_tracing(&config.logging)?;
    tracing::info!("Memopad v{}", env!("CARGO_PKG_VERSION"));

    let backend = backend::from_config(&config.backend, &config.realtime)
        .context("Failed to create backend client")?;

    match cli.command {
        Commands::Serve => {
            match backend.health_check().await {
                Ok(()) => tracing::info!(backend = backend.name(), "Backend platform reachable"),
                Err(e) => tracing::warn!(backend = backend.name(), error = %e, "Backend platform not reachable yet"),
            }

            let state = AppState::new(backend, &config);
            serve(state).await?;
        }
        Commands::List => {
            let memos = MemoStore::new(backend).fetch_recent().await?;
            if memos.is_empty() {
                println!("No memos");
            }
            for memo in memos {
                println!("{:>6}  {}", memo.id, memo.content);
            }
        }
        Commands::Add { content } => {
            if content.trim().is_empty() {
                println!("Nothing to add");
                return Ok(());
            }
            let memo = MemoStore::new(backend).insert(&content).await?;
            println!("Added memo {}", memo.id);
        }
        Commands::Delete { id } => {
            MemoStore::new(backend).delete(id).await?;
            println!("Deleted memo {}", id);
        }
        Commands::Watch => watch(backend).await?,
        Commands::Config { output } => write_default_config(output.as_ref())?,
    }

    Ok(())
}

/// Mount a board and print every snapshot until Ctrl+C
async fn watch(backend: Arc<dyn Backend>) -> Result<()> {
    let board = Arc::new(MemoBoard::new(backend));
    let feed = board.mount().await.context("Failed to subscribe to memo feed")?;
    let mut snapshots = board.watch();

    loop {
        {
            let list = snapshots.borrow_and_update();
            println!("--- {} memo(s)", list.len());
            for memo in list.as_slice() {
                println!("{:>6}  {}", memo.id, memo.content);
            }
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    feed.unmount().await;
    tracing::info!("Stopped watching");
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_default().context("Failed to load config"),
    }
}

fn write_default_config(output: Option<&PathBuf>) -> Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("memopad={},tower_http=info", logging.level))
    });

    let writer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let ansi = logging.file.is_none();

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .init();
    }

    Ok(())
}
