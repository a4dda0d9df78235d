use std::io;
use std::path::PathBuf;

use fencewatch_core::GeofenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unexpected feed payload: {0}")]
    Feed(String),
    #[error("Geofence error: {0}")]
    Geofence(#[from] GeofenceError),
    #[error("No data directory available, use --data-dir")]
    NoDataDir,
}

impl ServerError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ServerError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ServerError::Json {
            path: path.into(),
            source,
        }
    }
}
