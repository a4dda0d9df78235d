//! Device position feeds.
//!
//! The vendor API client is not part of this server; positions arrive through
//! a [`PositionFeed`]. [`FileFeed`] re-reads a JSON file on every poll, which
//! is enough for a sidecar that dumps the vendor's location response to disk.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use fencewatch_core::DeviceSample;

use crate::ServerError;

#[async_trait]
pub trait PositionFeed: Send {
    /// Fetch the current batch of device samples
    async fn fetch(&mut self) -> Result<Vec<DeviceSample>, ServerError>;
}

/// Decode a feed payload.
///
/// Accepts either a bare JSON array of samples or a vendor envelope
/// `{ "code": .., "message": .., "result": [..] }`. Entries that do not decode
/// are skipped one by one; only an unusable payload as a whole is an error.
pub fn parse_samples(payload: &str) -> Result<Vec<DeviceSample>, ServerError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ServerError::Feed(format!("invalid JSON: {}", e)))?;

    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut envelope) => {
            let code = envelope.get("code").and_then(Value::as_i64).unwrap_or(0);
            if code != 0 {
                let message = envelope
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message");
                return Err(ServerError::Feed(format!("code {}: {}", code, message)));
            }
            match envelope.remove("result") {
                Some(Value::Array(entries)) => entries,
                _ => Vec::new(),
            }
        }
        _ => Vec::new(),
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<DeviceSample>(entry) {
            Ok(sample) => Some(sample),
            Err(e) => {
                log::trace!("Skipping malformed feed entry: {}", e);
                None
            }
        })
        .collect())
}

/// Reads device samples from a JSON file
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: &Path) -> Self {
        FileFeed {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PositionFeed for FileFeed {
    async fn fetch(&mut self) -> Result<Vec<DeviceSample>, ServerError> {
        let payload = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ServerError::io(&self.path, e))?;

        let samples = parse_samples(&payload)?;
        log::trace!(
            "{}: read {} device samples",
            self.path.display(),
            samples.len()
        );
        Ok(samples)
    }
}
