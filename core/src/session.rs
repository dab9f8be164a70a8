//! Session configuration: credentials, season, endpoint and body format.
//!
//! # Design
//! A `Session` is read-only for the lifetime of a request. It can be built in
//! code, loaded from a JSON file, or read from `FAPI_*` environment variables.
//! Fields omitted from a config file fall back to the public FIRST API
//! endpoints.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const PRODUCTION_URL: &str = "https://frc-api.firstinspires.org";
pub const STAGING_URL: &str = "https://frc-staging-api.firstinspires.org";
pub const API_VERSION: &str = "v2.0";

/// Which FIRST API deployment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Production,
    Staging,
}

impl FromStr for Source {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" => Ok(Source::Production),
            "staging" => Ok(Source::Staging),
            other => Err(ApiError::Config(format!("unknown source: {other}"))),
        }
    }
}

/// Body format requested from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    #[default]
    Json,
    Xml,
}

impl DataFormat {
    /// Value for the `Accept` header.
    pub fn media_type(self) -> &'static str {
        match self {
            DataFormat::Json => "application/json",
            DataFormat::Xml => "application/xml",
        }
    }

    /// Short tag used in envelopes and cache keys.
    pub fn tag(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Xml => "xml",
        }
    }

    /// Anything other than `xml` (any case) selects JSON.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("xml") {
            DataFormat::Xml
        } else {
            DataFormat::Json
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn default_production_url() -> String {
    PRODUCTION_URL.to_string()
}

fn default_staging_url() -> String {
    STAGING_URL.to_string()
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub source: Source,
    pub season: u16,
    pub username: String,
    pub key: String,
    #[serde(default)]
    pub data_format: DataFormat,
    #[serde(default = "default_production_url")]
    pub production_url: String,
    #[serde(default = "default_staging_url")]
    pub staging_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Session {
    pub fn new(username: &str, key: &str, season: u16) -> Self {
        Self {
            source: Source::default(),
            season,
            username: username.to_string(),
            key: key.to_string(),
            data_format: DataFormat::default(),
            production_url: default_production_url(),
            staging_url: default_staging_url(),
            api_version: default_api_version(),
        }
    }

    /// Load a session from a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))
    }

    /// Build a session from `FAPI_USERNAME`, `FAPI_KEY`, `FAPI_SEASON` and the
    /// optional `FAPI_SOURCE` / `FAPI_FORMAT`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| ApiError::Config(format!("{name} is not set")))
        };
        let season = required("FAPI_SEASON")?;
        let season = season
            .parse()
            .map_err(|_| ApiError::Config(format!("FAPI_SEASON is not a year: {season}")))?;

        let mut session = Self::new(&required("FAPI_USERNAME")?, &required("FAPI_KEY")?, season);
        if let Some(source) = lookup("FAPI_SOURCE") {
            session.source = source.parse()?;
        }
        if let Some(format) = lookup("FAPI_FORMAT") {
            session.data_format = DataFormat::from_name(&format);
        }
        Ok(session)
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_format(mut self, data_format: DataFormat) -> Self {
        self.data_format = data_format;
        self
    }

    /// Endpoint for the selected source, without a trailing slash.
    pub fn base_url(&self) -> &str {
        let url = match self.source {
            Source::Production => &self.production_url,
            Source::Staging => &self.staging_url,
        };
        url.trim_end_matches('/')
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source)
            .field("season", &self.season)
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .field("data_format", &self.data_format)
            .field("production_url", &self.production_url)
            .field("staging_url", &self.staging_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}
