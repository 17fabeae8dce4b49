use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Livestock records and milk/weight reports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ingfarm",
    about = "Livestock records and milk/weight reports",
    version
)]
pub struct Settings {
    /// Directory holding cows, sensors, readings and measurements
    #[arg(long, env = "INGFARM_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Timezone used to map measurements to calendar days (auto-detected if not specified)
    #[arg(long, default_value = "auto", global = true)]
    pub timezone: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"], global = true)]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report whether the record store is readable
    Health,
    /// Register and look up cows
    Cows {
        #[command(subcommand)]
        action: CowCommand,
    },
    /// Record measurements
    Measurements {
        #[command(subcommand)]
        action: MeasurementCommand,
    },
    /// Milk and weight reports for one cow
    Reports {
        #[command(subcommand)]
        report: ReportCommand,
    },
    /// Periodically capture simulated sensor readings for every cow
    Capture {
        /// Seconds between capture rounds (1-3600)
        #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..=3600))]
        interval_secs: u64,
        /// Stop after this many rounds (runs until Ctrl+C when omitted)
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CowCommand {
    /// List all cows
    List,
    /// Show one cow
    Get { id: String },
    /// Register a cow under a caller-chosen UUID
    Create {
        id: String,
        #[arg(long)]
        name: String,
        /// Birthdate as YYYY-MM-DD
        #[arg(long)]
        birthdate: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MeasurementCommand {
    /// Take the next simulated reading for a cow and store it
    Next { cow_id: String },
    /// Store a measurement by hand
    Add {
        cow_id: String,
        #[arg(long, value_parser = ["milk", "weight"])]
        kind: String,
        /// Decimal value (litres for milk, kilograms for weight)
        #[arg(long)]
        value: String,
        /// Instant of the measurement (defaults to now)
        #[arg(long)]
        at: Option<String>,
        #[arg(long, default_value = "manual")]
        sensor: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ReportCommand {
    /// Milk totals over the cow's whole history
    MilkSummary { cow_id: String },
    /// Milk totals for one calendar date (YYYY-MM-DD)
    MilkDaily { cow_id: String, date: String },
    /// Weight history and trend
    Weight { cow_id: String },
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.ingfarm/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".ingfarm").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Result<Self, clap::Error> {
        Self::load_with_last_used_impl(std::env::args_os().collect(), &LastUsedParams::config_path())
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Result<Self, clap::Error> {
        let matches = Settings::command().try_get_matches_from(args)?;
        let mut settings = Settings::from_arg_matches(&matches)?;

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Ok(Self::apply_debug(settings));
        }

        let last = LastUsedParams::load_from(config_path);

        if !is_arg_explicitly_set(&matches, "data_dir") && settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(tz) = last.timezone {
                settings.timezone = tz;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        Ok(settings)
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            timezone: Some(s.timezone.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied on the command line or through
/// its environment variable (not via a default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
