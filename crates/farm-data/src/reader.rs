//! JSONL record files for IngFarm.
//!
//! A data directory holds one JSON document per line in each of
//! [`COWS_FILE`], [`SENSORS_FILE`], [`READINGS_FILE`] and
//! [`MEASUREMENTS_FILE`]. Blank or malformed lines are skipped so that a
//! partially written trailing line never blocks a load.

use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use farm_core::error::{FarmError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub const COWS_FILE: &str = "cows.jsonl";
pub const SENSORS_FILE: &str = "sensors.jsonl";
pub const READINGS_FILE: &str = "readings.jsonl";
pub const MEASUREMENTS_FILE: &str = "measurements.jsonl";

// ── Public API ────────────────────────────────────────────────────────────────

/// Load every well-formed record of type `T` from a JSONL file.
///
/// A missing file is an empty collection. A file that exists but cannot be
/// opened or read is a [`FarmError::FileRead`].
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("{} does not exist; treating as empty", path.display());
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).map_err(|source| FarmError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();
    let mut lines_read = 0u64;
    let mut lines_skipped = 0u64;

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| {
            warn!("Failed to read line {} of {}", line_no + 1, path.display());
            FarmError::FileRead {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        lines_read += 1;
        match serde_json::from_str::<T>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(
                    "Skipping malformed line {} in {}: {}",
                    line_no + 1,
                    path.display(),
                    e
                );
                lines_skipped += 1;
            }
        }
    }

    debug!(
        "File {}: {} read, {} skipped, {} loaded",
        path.display(),
        lines_read,
        lines_skipped,
        records.len(),
    );

    Ok(records)
}

/// Append one record as a JSON line, creating the file if necessary.
pub fn append_record<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

/// Resolve the data directory.
///
/// Uses `explicit` when given, otherwise `./data` when it exists, otherwise
/// `~/.ingfarm/data`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let local = PathBuf::from("data");
    if local.is_dir() {
        return local;
    }

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".ingfarm").join("data")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
