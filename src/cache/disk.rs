//! On-disk mirror of the response cache
//!
//! Each entry is a `<fingerprint>.json` file, so a restarted process can pick
//! up still-fresh responses without touching the network.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Fingerprint;
use crate::Result;

#[derive(Debug, Serialize, Deserialize)]
struct MirrorRecord {
    endpoint: String,
    captured_at: DateTime<Utc>,
    value: Value,
}

/// Directory-backed cache mirror
#[derive(Debug, Clone)]
pub struct DiskMirror {
    dir: PathBuf,
}

impl DiskMirror {
    /// Open (and create if needed) the mirror directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened cache mirror");
        Ok(Self { dir })
    }

    /// Mirror directory
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    /// Read an entry younger than `ttl`, returning the value and its age
    ///
    /// Missing, stale, unreadable and corrupt files are all misses.
    pub async fn load(&self, fingerprint: &Fingerprint, ttl: Duration) -> Option<(Value, Duration)> {
        let path = self.path_for(fingerprint);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache mirror entry");
                return None;
            }
        };

        let record: MirrorRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt cache mirror entry");
                return None;
            }
        };

        let age = (Utc::now() - record.captured_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age >= ttl {
            debug!(endpoint = %record.endpoint, age_ms = age.as_millis(), "Cache mirror entry stale");
            return None;
        }
        Some((record.value, age))
    }

    /// Write an entry captured now
    ///
    /// The file is written beside its final name and renamed into place so
    /// concurrent readers never observe a partial record.
    pub async fn store(&self, fingerprint: &Fingerprint, endpoint: &str, value: &Value) -> Result<()> {
        let record = MirrorRecord {
            endpoint: endpoint.to_string(),
            captured_at: Utc::now(),
            value: value.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;

        let path = self.path_for(fingerprint);
        let tmp = self.dir.join(format!("{fingerprint}.json.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
