//! Conditional, authenticated fetches against the FIRST API.
//!
//! # Design
//! `FirstClient` holds only a `Session` and carries no mutable state between
//! calls. A fetch is split into `build_request`, which produces an
//! `HttpRequest`, and `parse_response`, which turns an `HttpResponse` into a
//! `ResponseEnvelope`. `send_request` glues the two around a single
//! `Transport::execute` call; callers with their own I/O can use the halves
//! directly.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, instrument, warn};

use crate::cache::LocalCache;
use crate::envelope::{is_fixed_field, ResponseEnvelope, NOT_MODIFIED};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::httpdate;
use crate::params::RequestParams;
use crate::session::Session;
use crate::transport::Transport;
use crate::url::build_url;

pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
pub const ONLY_MODIFIED_SINCE: &str = "FMS-OnlyModifiedSince";

/// Conditional-fetch bounds for one request. At most one may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditional {
    /// Return 304 if nothing changed since this HTTP date.
    pub mod_since: Option<String>,
    /// Return only the records changed since this HTTP date.
    pub only_mod_since: Option<String>,
}

impl Conditional {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn modified_since(date: &str) -> Self {
        Self {
            mod_since: Some(date.to_string()),
            only_mod_since: None,
        }
    }

    pub fn only_modified_since(date: &str) -> Self {
        Self {
            mod_since: None,
            only_mod_since: Some(date.to_string()),
        }
    }

    fn check(&self) -> Result<(), ApiError> {
        if self.mod_since.is_some() && self.only_mod_since.is_some() {
            return Err(ApiError::ConflictingConditions);
        }
        Ok(())
    }
}

/// Stateless client for the FIRST API.
///
/// Use `build_request` to turn a URL and `Conditional` into an `HttpRequest`,
/// execute it with any HTTP stack, then pass the `HttpResponse` to
/// `parse_response`. `send_request` and `fetch` do all three with a
/// `Transport`.
#[derive(Debug, Clone)]
pub struct FirstClient {
    session: Session,
}

impl FirstClient {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// URL for `command` under this client's session.
    pub fn url(&self, command: &str, params: Option<&RequestParams>) -> Result<String, ApiError> {
        build_url(&self.session, command, params)
    }

    pub fn build_request(&self, url: &str, conditional: &Conditional) -> Result<HttpRequest, ApiError> {
        conditional.check()?;

        let format = self.session.data_format;
        let mut headers = vec![
            ("Accept".to_string(), format.media_type().to_string()),
            ("Authorization".to_string(), self.authorization()),
        ];
        if let Some(date) = valid_date(IF_MODIFIED_SINCE, conditional.mod_since.as_deref()) {
            headers.push((IF_MODIFIED_SINCE.to_string(), date.to_string()));
        }
        if let Some(date) = valid_date(ONLY_MODIFIED_SINCE, conditional.only_mod_since.as_deref()) {
            headers.push((ONLY_MODIFIED_SINCE.to_string(), date.to_string()));
        }

        Ok(HttpRequest {
            url: url.to_string(),
            headers,
        })
    }

    /// Classify a response: 2xx and 304 become envelopes, anything else is
    /// `ApiError::HttpError`.
    pub fn parse_response(
        &self,
        response: HttpResponse,
        requested_url: &str,
        command: &str,
        conditional: &Conditional,
    ) -> Result<ResponseEnvelope, ApiError> {
        let (text, url, headers) = if response.is_success() {
            let headers = merge_headers(response.headers);
            (Some(response.body), response.url, headers)
        } else if response.status == NOT_MODIFIED {
            (None, requested_url.to_string(), BTreeMap::new())
        } else {
            return Err(ApiError::HttpError {
                status: response.status,
                body: response.body,
            });
        };

        Ok(ResponseEnvelope {
            status_code: response.status,
            text,
            text_format: self.session.data_format,
            requested_url: url.clone(),
            url,
            time_downloaded: httpdate::now_naive(),
            local_data: false,
            local_time: None,
            frame_type: command.to_string(),
            mod_since: conditional.mod_since.clone(),
            only_mod_since: conditional.only_mod_since.clone(),
            headers,
        })
    }

    /// Fetch `url` once through `transport`.
    #[instrument(skip(self, transport, conditional))]
    pub fn send_request(
        &self,
        transport: &impl Transport,
        url: &str,
        command: &str,
        conditional: &Conditional,
    ) -> Result<ResponseEnvelope, ApiError> {
        let request = self.build_request(url, conditional)?;
        debug!(url, "sending request");
        let response = transport.execute(&request)?;
        let envelope = self.parse_response(response, url, command, conditional)?;
        debug!(status = envelope.status_code, "request complete");
        Ok(envelope)
    }

    /// Build the URL for `command` and fetch it.
    pub fn fetch(
        &self,
        transport: &impl Transport,
        command: &str,
        params: Option<&RequestParams>,
        conditional: &Conditional,
    ) -> Result<ResponseEnvelope, ApiError> {
        let url = self.url(command, params)?;
        self.send_request(transport, &url, command, conditional)
    }

    /// Serve `command` from a local cache instead of the network.
    pub fn send_local_request(
        &self,
        cache: &LocalCache,
        url: &str,
        command: &str,
    ) -> Result<ResponseEnvelope, ApiError> {
        cache.load(command, self.session.data_format, url)
    }

    fn authorization(&self) -> String {
        let token = format!("{}:{}", self.session.username, self.session.key);
        format!("Basic {}", STANDARD.encode(token))
    }
}

/// Response headers keyed for the envelope. Headers that share a name with a
/// fixed envelope field are dropped.
fn merge_headers(headers: Vec<(String, String)>) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .filter(|(name, _)| {
            let fixed = is_fixed_field(name);
            if fixed {
                warn!(header = %name, "dropping header that shadows an envelope field");
            }
            !fixed
        })
        .collect()
}

/// Conditional dates that fail to parse are dropped with a warning; the
/// request still goes out.
fn valid_date<'a>(header: &str, date: Option<&'a str>) -> Option<&'a str> {
    let date = date?;
    if httpdate::parse(date, true).is_valid() {
        Some(date)
    } else {
        warn!(header, value = date, "ignoring malformed HTTP date");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DataFormat;

    const URL: &str = "https://api.test/v2.0/2021/teams";

    fn client() -> FirstClient {
        FirstClient::new(Session::new("user", "key", 2021))
    }

    fn ok_response(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            url: URL.to_string(),
            headers: vec![("last-modified".to_string(), "Fri, 01 Jan 2021 00:00:00 GMT".to_string())],
            body: body.to_string(),
        }
    }

    #[test]
    fn build_request_sets_accept_and_basic_auth() {
        let req = client().build_request(URL, &Conditional::none()).unwrap();
        assert_eq!(req.url, URL);
        assert_eq!(req.header("accept"), Some("application/json"));
        // base64("user:key")
        assert_eq!(req.header("authorization"), Some("Basic dXNlcjprZXk="));
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn build_request_xml_accept() {
        let c = FirstClient::new(Session::new("user", "key", 2021).with_format(DataFormat::Xml));
        let req = c.build_request(URL, &Conditional::none()).unwrap();
        assert_eq!(req.header("Accept"), Some("application/xml"));
    }

    #[test]
    fn build_request_attaches_valid_conditions() {
        let date = "Fri, 01 Jan 2021 00:00:00 GMT";
        let req = client().build_request(URL, &Conditional::modified_since(date)).unwrap();
        assert_eq!(req.header(IF_MODIFIED_SINCE), Some(date));
        assert_eq!(req.header(ONLY_MODIFIED_SINCE), None);

        let req = client().build_request(URL, &Conditional::only_modified_since(date)).unwrap();
        assert_eq!(req.header(ONLY_MODIFIED_SINCE), Some(date));
        assert_eq!(req.header(IF_MODIFIED_SINCE), None);
    }

    #[test]
    fn build_request_drops_invalid_condition() {
        let req = client()
            .build_request(URL, &Conditional::modified_since("yesterday"))
            .unwrap();
        assert_eq!(req.header(IF_MODIFIED_SINCE), None);
    }

    #[test]
    fn build_request_rejects_both_conditions() {
        let conditional = Conditional {
            mod_since: Some("Fri, 01 Jan 2021 00:00:00 GMT".to_string()),
            only_mod_since: Some("Fri, 01 Jan 2021 00:00:00 GMT".to_string()),
        };
        let err = client().build_request(URL, &conditional).unwrap_err();
        assert!(matches!(err, ApiError::ConflictingConditions));
    }

    #[test]
    fn parse_success_merges_headers() {
        let env = client()
            .parse_response(ok_response(r#"{"teams":[]}"#), URL, "teams", &Conditional::none())
            .unwrap();
        assert_eq!(env.status_code, 200);
        assert_eq!(env.text.as_deref(), Some(r#"{"teams":[]}"#));
        assert_eq!(env.header("Last-Modified"), Some("Fri, 01 Jan 2021 00:00:00 GMT"));
        assert_eq!(env.frame_type, "teams");
        assert_eq!(env.text_format, DataFormat::Json);
        assert!(!env.local_data);
        assert!(env.local_time.is_none());
        assert!(httpdate::parse(&env.time_downloaded, false).is_valid());
        env.validate().unwrap();
    }

    #[test]
    fn parse_success_drops_headers_named_like_fields() {
        let mut response = ok_response("{}");
        response.headers.push(("url".to_string(), "https://spoofed.test/".to_string()));
        response.headers.push(("status_code".to_string(), "500".to_string()));
        let env = client()
            .parse_response(response, URL, "teams", &Conditional::none())
            .unwrap();
        assert_eq!(env.url, URL);
        assert_eq!(env.header("url"), None);
        assert_eq!(env.header("status_code"), None);
        assert_eq!(env.headers.len(), 1);

        let json = serde_json::to_string(&env).unwrap();
        let back: ResponseEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn parse_success_reports_redirected_url() {
        let mut response = ok_response("{}");
        response.url = "https://mirror.test/v2.0/2021/teams".to_string();
        let env = client()
            .parse_response(response, URL, "teams", &Conditional::none())
            .unwrap();
        assert_eq!(env.url, "https://mirror.test/v2.0/2021/teams");
        assert_eq!(env.requested_url, env.url);
    }

    #[test]
    fn parse_not_modified_has_no_body() {
        let response = HttpResponse {
            status: 304,
            url: "https://elsewhere.test/".to_string(),
            headers: Vec::new(),
            body: String::new(),
        };
        let conditional = Conditional::modified_since("Fri, 01 Jan 2021 00:00:00 GMT");
        let env = client()
            .parse_response(response, URL, "teams", &conditional)
            .unwrap();
        assert_eq!(env.status_code, 304);
        assert!(env.text.is_none());
        assert_eq!(env.url, URL);
        assert_eq!(env.requested_url, URL);
        assert_eq!(env.mod_since, conditional.mod_since);
        env.validate().unwrap();
    }

    #[test]
    fn parse_error_status_is_fatal() {
        let response = HttpResponse {
            status: 401,
            url: URL.to_string(),
            headers: Vec::new(),
            body: "Unauthorized".to_string(),
        };
        let err = client()
            .parse_response(response, URL, "teams", &Conditional::none())
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 401, ref body } if body == "Unauthorized"));
    }

    #[test]
    fn url_uses_session() {
        let url = client()
            .url("teams", Some(&RequestParams::new().with("/teamNumber", 254)))
            .unwrap();
        assert_eq!(url, "https://frc-api.firstinspires.org/v2.0/2021/teams/254");
    }
}
