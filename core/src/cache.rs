//! Local on-disk store of previously downloaded responses.
//!
//! # Design
//! One JSON file per `(command, format)` pair under an explicit root
//! directory. Paths are always resolved against that root; the process
//! working directory is never consulted or changed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::envelope::ResponseEnvelope;
use crate::error::ApiError;
use crate::httpdate;
use crate::session::DataFormat;

#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the cached response for `command` in `format`.
    pub fn entry_path(&self, command: &str, format: DataFormat) -> PathBuf {
        self.root.join(format!("{command}_{}.json", format.tag()))
    }

    /// Load a cached envelope and stamp it as local data requested via
    /// `requested_url`.
    #[instrument(skip(self, requested_url))]
    pub fn load(
        &self,
        command: &str,
        format: DataFormat,
        requested_url: &str,
    ) -> Result<ResponseEnvelope, ApiError> {
        let path = self.entry_path(command, format);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ApiError::CacheMiss { path });
            }
            Err(e) => return Err(e.into()),
        };

        let mut envelope: ResponseEnvelope = serde_json::from_str(&raw)
            .map_err(|e| ApiError::DeserializationError(format!("{}: {e}", path.display())))?;
        envelope.validate()?;

        envelope.local_data = true;
        envelope.local_time = Some(httpdate::now_naive());
        envelope.requested_url = requested_url.to_string();
        debug!(path = %path.display(), "served from local cache");
        Ok(envelope)
    }

    /// Persist `envelope` under its command and format, replacing any
    /// previous entry.
    pub fn store(&self, envelope: &ResponseEnvelope) -> Result<PathBuf, ApiError> {
        envelope.validate()?;
        fs::create_dir_all(&self.root)?;
        let path = self.entry_path(&envelope.frame_type, envelope.text_format);
        let json = serde_json::to_string_pretty(envelope)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "stored response");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_path_is_keyed_by_command_and_format() {
        let cache = LocalCache::new("/data/fapi");
        assert_eq!(
            cache.entry_path("teams", DataFormat::Json),
            PathBuf::from("/data/fapi/teams_json.json")
        );
        assert_eq!(
            cache.entry_path("schedule", DataFormat::Xml),
            PathBuf::from("/data/fapi/schedule_xml.json")
        );
    }
}
