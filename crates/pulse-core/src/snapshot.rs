//! JSON snapshots of fetched data, written once per run so that tables can be
//! recomputed later without calling the API again.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::{PulseError, Result};
use crate::store::MessageStore;
use crate::types::Directory;

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(PulseError::Snapshot(format!(
            "{} not found; run a fetch first",
            path.display()
        )));
    }
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

impl MessageStore {
    /// Persist all messages as a JSON object keyed by channel id.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let store: Self = read_json(path)?;
        tracing::info!(
            "Loaded snapshot {}: {} messages in {} channels",
            path.display(),
            store.message_count(),
            store.channel_count()
        );
        Ok(store)
    }
}

impl Directory {
    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        read_json(path)
    }
}
