//! atnd configuration file handling
//!
//! Operator settings only: where the registry lives, how the probe utility is
//! invoked, search timing and logging. Members themselves live in the
//! registry file, never here.
//!
//! The file is TOML and sits next to the executable (`atnd.toml`) unless
//! `--config` points elsewhere. A commented default is written on first use.

use atnd::probe::l2ping::{DEFAULT_ADAPTER_DOWN_MARKER, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
use atnd::probe::L2pingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "atnd.toml";

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default deadline for one `search` (single member or whole roster)
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Default pause between sweeps in `watch`
const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(300);

/// atnd operator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtndConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry and key file location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `atnd_config.json` and `.atnd_key`
    /// (next to the executable if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Probe utility invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the l2ping arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-probe timeout handed to the utility
    #[serde(default = "default_probe_timeout", with = "humantime_duration")]
    pub timeout: Duration,

    /// Output substrings meaning the adapter is down
    #[serde(default = "default_markers")]
    pub adapter_down_markers: Vec<String>,
}

/// Search timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Deadline for a whole `search`
    #[serde(default = "default_search_timeout", with = "humantime_duration")]
    pub timeout: Duration,

    /// Pause between sweeps in `watch`
    #[serde(default = "default_watch_interval", with = "humantime_duration")]
    pub watch_interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_probe_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_markers() -> Vec<String> {
    vec![DEFAULT_ADAPTER_DOWN_MARKER.to_string()]
}

fn default_search_timeout() -> Duration {
    DEFAULT_SEARCH_TIMEOUT
}

fn default_watch_interval() -> Duration {
    DEFAULT_WATCH_INTERVAL
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            timeout: default_probe_timeout(),
            adapter_down_markers: default_markers(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: default_search_timeout(),
            watch_interval: default_watch_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ProbeConfig {
    pub fn to_l2ping(&self) -> L2pingConfig {
        L2pingConfig {
            program: self.program.clone(),
            args: self.args.clone(),
            timeout: self.timeout,
            adapter_down_markers: self.adapter_down_markers.clone(),
        }
    }
}

impl AtndConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: AtndConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Load `path`, writing the commented default there first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            Self::create_default(path)?;
        }
        Self::load(path)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        create_parent(path)?;
        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        format!(
            r#"# atnd configuration (operator settings)
#
# Registered members are NOT configured here. They live, with their
# addresses encrypted, in atnd_config.json inside the data directory.
# Manage them with `atnd member set|delete|list`.

[storage]
# Directory for atnd_config.json and .atnd_key
# Leave commented to keep them next to the atnd executable
# data_dir = "/var/lib/atnd"

[probe]
# Probe utility (BlueZ l2ping). It needs raw socket privileges; to run it
# through a wrapper set e.g. program = "sudo" and args = ["-n", "l2ping"]
program = "{program}"
args = []

# Per-probe timeout handed to the utility (rounded down to whole seconds)
timeout = "{probe_timeout}"

# Output that means the local adapter is down rather than the member absent
adapter_down_markers = ["{marker}"]

[search]
# Deadline for one `atnd search`
timeout = "{search_timeout}"

# Pause between sweeps in `atnd watch`
watch_interval = "{watch_interval}"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG takes precedence)
level = "{level}"
"#,
            program = DEFAULT_PROGRAM,
            probe_timeout = humantime::format_duration(DEFAULT_TIMEOUT),
            marker = DEFAULT_ADAPTER_DOWN_MARKER,
            search_timeout = humantime::format_duration(DEFAULT_SEARCH_TIMEOUT),
            watch_interval = humantime::format_duration(DEFAULT_WATCH_INTERVAL),
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        create_parent(config_path)?;
        fs::write(config_path, Self::generate_default_toml()).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    Ok(())
}

/// Default config file path: `atnd.toml` next to the executable
pub fn default_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(atnd::storage::executable_dir()?.join(CONFIG_FILE_NAME))
}

/// Durations as humantime strings ("5s", "1m 30s")
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
