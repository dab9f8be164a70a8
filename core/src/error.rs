//! Error types for the FIRST API client.
//!
//! # Design
//! Every fallible operation in the crate returns `ApiError`. Precondition
//! violations (`ConflictingConditions`, `InvalidParams`) are reported before
//! any I/O happens. A 304 response is never an error at the dispatch layer;
//! `NotModified` only surfaces when a caller asks for the body of an envelope
//! that has none.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by the client, URL builder, cache and table conversion.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Both `mod_since` and `only_mod_since` were supplied for one request.
    #[error("cannot specify both mod_since and only_mod_since")]
    ConflictingConditions,

    /// Request parameters violate the path/query ordering rules.
    #[error("invalid request parameters: {0}")]
    InvalidParams(String),

    /// A string that had to be an HTTP date was not one.
    #[error("not a valid HTTP date: {0:?}")]
    InvalidHttpDate(String),

    /// The server returned a status other than 2xx or 304.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// No cached response exists for the requested command and format.
    #[error("no cached response at {}", path.display())]
    CacheMiss { path: PathBuf },

    /// A cached response was readable but internally inconsistent.
    #[error("corrupt cache entry: {0}")]
    CorruptCache(String),

    /// The envelope carries no body because the server answered 304.
    #[error("response was not modified; no body to convert")]
    NotModified,

    /// The body format cannot be handled by the requested operation.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A body or cache entry could not be deserialized.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A value could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Session configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
