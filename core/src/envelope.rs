//! The normalized record produced by every fetch, network or cache.
//!
//! # Design
//! The fixed fields are typed. Response headers travel in one auxiliary map
//! that is flattened on (de)serialization, so a persisted envelope carries
//! them as ordinary top-level keys next to the fixed fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::session::DataFormat;

pub const NOT_MODIFIED: u16 = 304;

/// Serialized names of the fixed fields. A header with one of these names
/// would collide with the field once flattened.
pub const FIXED_FIELDS: [&str; 11] = [
    "status_code",
    "text",
    "text_format",
    "url",
    "requested_url",
    "time_downloaded",
    "local_data",
    "local_time",
    "frame_type",
    "mod_since",
    "only_mod_since",
];

pub fn is_fixed_field(name: &str) -> bool {
    FIXED_FIELDS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub status_code: u16,
    /// Raw body; `None` exactly when `status_code` is 304.
    pub text: Option<String>,
    pub text_format: DataFormat,
    /// URL actually fetched (after redirects).
    pub url: String,
    /// URL the caller asked for; overwritten by the cache path.
    pub requested_url: String,
    pub time_downloaded: String,
    pub local_data: bool,
    pub local_time: Option<String>,
    /// The API command that produced this envelope.
    pub frame_type: String,
    pub mod_since: Option<String>,
    pub only_mod_since: Option<String>,
    #[serde(flatten)]
    pub headers: BTreeMap<String, String>,
}

impl ResponseEnvelope {
    pub fn is_not_modified(&self) -> bool {
        self.status_code == NOT_MODIFIED
    }

    /// Response header by name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body text, or `NotModified` for a 304 envelope.
    pub fn body(&self) -> Result<&str, ApiError> {
        self.text.as_deref().ok_or(ApiError::NotModified)
    }

    /// Check that `text` is absent if and only if the status is 304, and that
    /// no header shadows a fixed field.
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = self.headers.keys().find(|k| is_fixed_field(k)) {
            return Err(ApiError::CorruptCache(format!(
                "{}: header {name:?} collides with a fixed field",
                self.frame_type
            )));
        }
        match (self.is_not_modified(), self.text.is_some()) {
            (true, true) => Err(ApiError::CorruptCache(format!(
                "{}: 304 response carries a body",
                self.frame_type
            ))),
            (false, false) => Err(ApiError::CorruptCache(format!(
                "{}: status {} without a body",
                self.frame_type, self.status_code
            ))),
            _ => Ok(()),
        }
    }
}
