//! Capture stats file loading.
//!
//! The upstream agent writes one JSON object mapping each remote IP to
//! its traffic aggregate. Unknown fields are ignored and missing
//! metadata defaults, so files from older agent versions load cleanly.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::error::LoadError;
use crate::model::EndpointTrafficStats;

/// Loads a stats file into the per-IP aggregate map.
pub fn load_stats(path: &Path) -> Result<HashMap<String, EndpointTrafficStats>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let data: HashMap<String, EndpointTrafficStats> =
        serde_json::from_str(&content).map_err(|source| LoadError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    info!("Loaded {} remote endpoints from {}", data.len(), path.display());
    Ok(data)
}
