//! Engine snapshot persistence
//!
//! Serializes the whole engine (ledger, slots, order book, ballots,
//! proposals, configuration) into a versioned, gzip-compressed file.
//! Loading an old snapshot and replaying later operations yields the
//! same state as never having stopped.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Automaton;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot codec error: {0}")]
    Codec(String),

    #[error("Unsupported snapshot version {found}, expected {expected}")]
    BadVersion { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    created_at: DateTime<Utc>,
    engine: Automaton,
}

/// Write `engine` to `path`, replacing any existing file.
pub fn save(engine: &Automaton, path: &Path) -> Result<()> {
    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        engine: engine.clone(),
    };
    let encoded = bincode::serialize(&snapshot).map_err(|e| SnapshotError::Codec(e.to_string()))?;

    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&encoded)?;
    encoder.finish()?;
    log::info!("snapshot saved to {} ({} bytes)", path.display(), encoded.len());
    Ok(())
}

/// Load an engine previously written by [`save`].
pub fn load(path: &Path) -> Result<Automaton> {
    let file = File::open(path)?;
    let mut decoder = GzDecoder::new(file);
    let mut encoded = Vec::new();
    decoder.read_to_end(&mut encoded)?;

    let snapshot: Snapshot =
        bincode::deserialize(&encoded).map_err(|e| SnapshotError::Codec(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::BadVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    log::info!(
        "snapshot loaded from {} (created {})",
        path.display(),
        snapshot.created_at
    );
    Ok(snapshot.engine)
}

/// Human-readable dump of the full engine state, for inspection and
/// external reconciliation against the audit events.
pub fn export_json(engine: &Automaton) -> Result<String> {
    serde_json::to_string_pretty(engine).map_err(|e| SnapshotError::Codec(e.to_string()))
}
