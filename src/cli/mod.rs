use atnd::attendance::AttendanceEngine;
use atnd::probe::L2pingProbe;
use atnd::storage::StoragePaths;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod config;
pub mod member;
pub mod search;
pub mod version;
pub mod watch;

use config::{default_config_path, AtndConfig};

#[derive(Parser)]
#[command(name = "atnd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the atnd attendance tracker", long_about = None)]
pub struct Cli {
    /// Path to config file (default: atnd.toml next to the executable)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the member registry and its key (overrides the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage registered members
    Member {
        #[command(subcommand)]
        action: MemberCommand,
    },

    /// Check who is around (one member, or everyone if no name is given)
    Search {
        /// Member to look for
        name: Option<String>,

        /// Give up after this long, e.g. "30s" (default from config)
        #[arg(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,
    },

    /// Sweep repeatedly and print who was seen when, until Ctrl-C
    Watch {
        /// Pause between sweeps, e.g. "5m" (default from config)
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// Register a member, or replace the address of an existing one
    Set {
        name: String,

        /// Bluetooth address, e.g. 01:23:45:67:89:ab
        address: String,
    },

    /// Remove a member
    Delete { name: String },

    /// List registered members
    List,
}

/// Resolved configuration for one invocation
#[derive(Debug)]
pub struct Session {
    pub config: AtndConfig,
    pub paths: StoragePaths,
    data_dir: Option<PathBuf>,
}

impl Session {
    /// Load (or create) the config file and initialize logging.
    ///
    /// Data directory precedence: `--data-dir`, then `[storage] data_dir`,
    /// then the executable's directory.
    pub fn load(
        config_path: Option<&Path>,
        data_dir: Option<&Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => default_config_path()?,
        };
        let config = AtndConfig::load_or_create(&config_path)?;
        init_logging(&config.logging.level);

        let data_dir = data_dir
            .map(Path::to_path_buf)
            .or_else(|| config.storage.data_dir.clone());
        let paths = match &data_dir {
            Some(dir) => StoragePaths::in_dir(dir),
            None => StoragePaths::beside_executable()?,
        };

        tracing::debug!(
            config = %config_path.display(),
            registry = %paths.registry_file.display(),
            "configuration loaded"
        );

        Ok(Self {
            config,
            paths,
            data_dir,
        })
    }

    /// Open the engine backed by the configured probe utility.
    pub fn open_engine(&self) -> Result<AttendanceEngine<L2pingProbe>, Box<dyn std::error::Error>> {
        if let Some(dir) = &self.data_dir {
            fs::create_dir_all(dir).map_err(|e| {
                format!("Failed to create data directory '{}': {}", dir.display(), e)
            })?;
        }

        let probe = L2pingProbe::new(self.config.probe.to_l2ping());
        Ok(AttendanceEngine::open(&self.paths, probe)?)
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .ok();
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config.as_deref();
    let data_dir = cli.data_dir.as_deref();

    match cli.command {
        Commands::Member { action } => member::execute(&Session::load(config, data_dir)?, action),
        Commands::Search { name, timeout } => {
            search::execute(&Session::load(config, data_dir)?, name, timeout).await
        }
        Commands::Watch { interval } => {
            watch::execute(&Session::load(config, data_dir)?, interval).await
        }
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
