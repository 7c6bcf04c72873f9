use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;
use crate::store::ListStore;

pub mod commands;

use self::commands::{AddArgs, IndexArgs, ListArgs};

#[derive(Parser, Debug)]
#[command(name = "todotui", version, about = "Keyboard-first terminal todo list")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over TODOTUI_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over TODOTUI_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive list (default)
    Tui,
    /// Add a task to the top of the list
    Add(AddArgs),
    /// Print the list, optionally filtered
    List(ListArgs),
    /// Mark the task at INDEX as completed
    Done(IndexArgs),
    /// Mark the task at INDEX as pending again
    Undo(IndexArgs),
    /// Delete the task at INDEX
    Remove(IndexArgs),
    /// Delete every task
    Clear,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    let log_target = match command {
        Commands::Tui => LogTarget::File(paths.log_file()),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, &log_target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let config = loader.load_or_init()?;
    let backend = storage::init(&paths, &config.storage)?;
    let store = ListStore::load_with_key(backend, config.storage.key.clone());

    match command {
        Commands::Tui => {
            let mut app = App::new(&config, store);
            commands::run_tui(&mut app)
        }
        Commands::Add(args) => commands::add_item(store, args),
        Commands::List(args) => commands::list_items(&store, args),
        Commands::Done(args) => commands::set_item_status(store, args, true),
        Commands::Undo(args) => commands::set_item_status(store, args, false),
        Commands::Remove(args) => commands::remove_item(store, args),
        Commands::Clear => commands::clear_items(store),
    }
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn init_tracing(level: &str, target: &LogTarget) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?))
                .init(),
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
