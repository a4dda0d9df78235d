//! On-disk state: the geofence list and a snapshot of the event log.
//!
//! Both are plain JSON arrays. Containment state is never written; it is
//! rebuilt from scratch after a restart.

use directories::ProjectDirs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fencewatch_core::{EventLog, GeofenceEvent, GeofenceStore};

use crate::ServerError;

const GEOFENCES_FILE: &str = "geofences.json";
const EVENTS_FILE: &str = "events.json";

pub struct Storage {
    geofences_path: PathBuf,
    events_path: PathBuf,
}

impl Storage {
    /// Resolve file locations.
    ///
    /// Without an explicit `data_dir` the platform data directory is used
    /// (e.g. `~/.local/share/fencewatch` on Linux).
    pub fn new(data_dir: Option<&Path>, geofences: Option<&Path>) -> Result<Self, ServerError> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => ProjectDirs::from("", "", "fencewatch")
                .ok_or(ServerError::NoDataDir)?
                .data_dir()
                .to_path_buf(),
        };
        let geofences_path = match geofences {
            Some(path) => path.to_path_buf(),
            None => data_dir.join(GEOFENCES_FILE),
        };

        Ok(Storage {
            geofences_path,
            events_path: data_dir.join(EVENTS_FILE),
        })
    }

    pub fn geofences_path(&self) -> &Path {
        &self.geofences_path
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Load the geofence list; a missing file is an empty list
    pub async fn load_geofences(&self) -> Result<GeofenceStore, ServerError> {
        match tokio::fs::read_to_string(&self.geofences_path).await {
            Ok(json) => GeofenceStore::from_json(&json).map_err(|e| match e {
                fencewatch_core::GeofenceError::Json(e) => {
                    ServerError::json(&self.geofences_path, e)
                }
                e => ServerError::Geofence(e),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::trace!("{}: no geofences yet", self.geofences_path.display());
                Ok(GeofenceStore::new())
            }
            Err(e) => Err(ServerError::io(&self.geofences_path, e)),
        }
    }

    pub async fn save_geofences(&self, store: &GeofenceStore) -> Result<(), ServerError> {
        let json = store.to_json()?;
        write_atomic(&self.geofences_path, json.as_bytes()).await
    }

    /// Restore the event log snapshot.
    ///
    /// A missing file gives an empty log. An unreadable snapshot is moved
    /// aside to `events.json.bad` and replaced by an empty log.
    pub async fn load_events(&self, capacity: usize) -> Result<EventLog, ServerError> {
        let json = match tokio::fs::read_to_string(&self.events_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(EventLog::with_capacity(capacity))
            }
            Err(e) => return Err(ServerError::io(&self.events_path, e)),
        };

        match serde_json::from_str::<Vec<GeofenceEvent>>(&json) {
            Ok(events) => Ok(EventLog::from_events(events, capacity)),
            Err(e) => {
                let bad = self.events_path.with_extension("json.bad");
                log::warn!(
                    "{}: unreadable event log moved to {}: {}",
                    self.events_path.display(),
                    bad.display(),
                    e
                );
                tokio::fs::rename(&self.events_path, &bad)
                    .await
                    .map_err(|e| ServerError::io(&bad, e))?;
                Ok(EventLog::with_capacity(capacity))
            }
        }
    }

    pub async fn save_events(&self, log: &EventLog) -> Result<(), ServerError> {
        let json = serde_json::to_string_pretty(&log.to_vec())
            .map_err(|e| ServerError::json(&self.events_path, e))?;
        write_atomic(&self.events_path, json.as_bytes()).await
    }
}

// Write to a sibling temp file and rename, so readers never see a partial file
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ServerError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ServerError::io(parent, e))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| ServerError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ServerError::io(path, e))
}
