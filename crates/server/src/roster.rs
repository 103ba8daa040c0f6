use std::fs;
use std::path::Path;

use tracing::warn;
use triage_core::{Manager, Office};

/// Load the manager/office roster from `{data_dir}/managers.json` and
/// `{data_dir}/offices.json`. Populating these is the upload/ingest
/// collaborator's job; this server only reads whatever is already on disk at
/// startup, the same shape a catalog loader reads a fixture file with.
pub fn load(data_dir: &Path) -> (Vec<Manager>, Vec<Office>) {
    let managers = load_json(&data_dir.join("managers.json")).unwrap_or_default();
    let offices = load_json(&data_dir.join("offices.json")).unwrap_or_default();
    (managers, offices)
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read roster file");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse roster file");
            None
        }
    }
}
