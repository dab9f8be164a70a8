//! FIRST API URL construction.
//!
//! Shape: `<base>/<version>[/<season>][/<command>][/<path-param>][?k=v&...]`.

use crate::error::ApiError;
use crate::params::{is_path_param, ParamValue, RequestParams};
use crate::session::Session;

pub const SEASON: &str = "season";
pub const STATUS: &str = "status";
pub const TEAMS: &str = "teams";
pub const EVENTS: &str = "events";
pub const SCHEDULE: &str = "schedule";
pub const SCORES: &str = "scores";
pub const MATCHES: &str = "matches";
pub const RANKINGS: &str = "rankings";
pub const AWARDS: &str = "awards";
pub const ALLIANCES: &str = "alliances";
pub const DISTRICTS: &str = "districts";
pub const AVATARS: &str = "avatars";

/// Build the URL for `command` under the session's endpoint and season.
///
/// Path-marker parameters must come before every emitted query term, and at
/// most one may be emitted. `Absent` values are skipped entirely.
pub fn build_url(
    session: &Session,
    command: &str,
    params: Option<&RequestParams>,
) -> Result<String, ApiError> {
    let mut url = format!("{}/{}", session.base_url(), session.api_version);
    match command {
        SEASON => url.push_str(&format!("/{}", session.season)),
        STATUS => {}
        _ => url.push_str(&format!("/{}/{command}", session.season)),
    }

    let Some(params) = params else {
        return Ok(url);
    };

    let mut query: Vec<String> = Vec::new();
    let mut path_param: Option<&str> = None;
    for (name, value) in params.iter() {
        if value.is_absent() {
            continue;
        }
        if is_path_param(name) {
            if let Some(first) = path_param {
                return Err(ApiError::InvalidParams(format!(
                    "path parameter {name} follows path parameter {first}"
                )));
            }
            if !query.is_empty() {
                return Err(ApiError::InvalidParams(format!(
                    "path parameter {name} must precede query parameters"
                )));
            }
            path_param = Some(name);
            url.push('/');
            url.push_str(&encode(value));
        } else {
            query.push(format!("{name}={}", encode(value)));
        }
    }

    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }
    Ok(url)
}

fn encode(value: &ParamValue) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}
