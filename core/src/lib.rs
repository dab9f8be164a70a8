//! Blocking client core for the FIRST API.
//!
//! # Overview
//! Builds FIRST API URLs from session parameters, issues authenticated
//! conditional GET requests, and normalizes the result into a
//! `ResponseEnvelope`. Envelopes can also be replayed from a `LocalCache` and
//! turned into tables with `Frame`.
//!
//! # Design
//! - `FirstClient` is stateless apart from its `Session`.
//! - A fetch is split into `build_request` and `parse_response`; the
//!   `Transport` in between is the only place that touches the network.
//! - HTTP dates parse into a two-valued `ParsedDate`, so each call site decides
//!   between dropping an invalid date and failing on it.
//! - 304 is an expected outcome, not an error: it yields an envelope whose
//!   `text` is `None`.

pub mod cache;
pub mod client;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod http;
pub mod httpdate;
pub mod params;
pub mod session;
pub mod transport;
pub mod url;

pub use cache::LocalCache;
pub use client::{Conditional, FirstClient};
pub use envelope::ResponseEnvelope;
pub use error::ApiError;
pub use frame::{Frame, FrameSpec};
pub use http::{HttpRequest, HttpResponse};
pub use httpdate::{HttpDate, ParsedDate};
pub use params::{ParamValue, RequestParams};
pub use session::{DataFormat, Session, Source};
pub use transport::{Transport, UreqTransport};
pub use url::build_url;
