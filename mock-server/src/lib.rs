use axum::{
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::debug;

pub const USERNAME: &str = "frc-user";
pub const KEY: &str = "7eaa6338-a097-4221-ac04-b6120fcc4d49";
pub const API_VERSION: &str = "v2.0";
pub const CURRENT_SEASON: u16 = 2021;

/// Every resource served by this server was last changed at this instant.
pub const LAST_MODIFIED: &str = "Fri, 01 Jan 2021 12:00:00 GMT";

const ONLY_MODIFIED_SINCE: &str = "fms-onlymodifiedsince";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub team_number: u32,
    pub name_short: String,
    pub city: String,
    pub state_prov: String,
    pub rookie_year: u16,
}

fn teams() -> Vec<Team> {
    [
        (254, "The Cheesy Poofs", "San Jose", "CA", 1999),
        (1114, "Simbotics", "St. Catharines", "ON", 2003),
        (1678, "Citrus Circuits", "Davis", "CA", 2005),
    ]
    .into_iter()
    .map(|(team_number, name, city, state, rookie_year)| Team {
        team_number,
        name_short: name.to_string(),
        city: city.to_string(),
        state_prov: state.to_string(),
        rookie_year,
    })
    .collect()
}

pub fn app() -> Router {
    let root = format!("/{API_VERSION}");
    Router::new()
        .route(&root, get(api_status))
        .route(&format!("{root}/{{season}}"), get(season_summary))
        .route(&format!("{root}/{{season}}/teams"), get(list_teams))
        .route(&format!("{root}/{{season}}/teams/{{team_number}}"), get(get_team))
        .route(&format!("{root}/{{season}}/legacy/teams"), get(legacy_teams))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub fn last_modified() -> DateTime<Utc> {
    DateTime::parse_from_rfc2822(LAST_MODIFIED)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

async fn api_status(headers: HeaderMap) -> Response {
    respond(
        &headers,
        "Status",
        json!({
            "name": "FIRST ROBOTICS COMPETITION API",
            "apiVersion": "2.0",
            "status": "normal",
            "currentSeason": CURRENT_SEASON,
            "maxSeason": CURRENT_SEASON + 1,
        }),
    )
}

async fn season_summary(headers: HeaderMap, Path(season): Path<u16>) -> Response {
    respond(
        &headers,
        "Season",
        json!({
            "eventCount": 42,
            "gameName": format!("GAME {season}"),
            "kickoff": format!("{season}-01-09T00:00:00"),
            "teamCount": teams().len(),
        }),
    )
}

async fn list_teams(headers: HeaderMap, Path(_season): Path<u16>) -> Response {
    let teams = teams();
    respond(
        &headers,
        "Teams",
        json!({
            "teamCountTotal": teams.len(),
            "teamCountPage": teams.len(),
            "pageCurrent": 1,
            "pageTotal": 1,
            "teams": teams,
        }),
    )
}

async fn get_team(headers: HeaderMap, Path((_season, team_number)): Path<(u16, u32)>) -> Response {
    let Some(team) = teams().into_iter().find(|t| t.team_number == team_number) else {
        return (StatusCode::NOT_FOUND, format!("team {team_number} not found")).into_response();
    };
    respond(
        &headers,
        "Teams",
        json!({
            "teamCountTotal": 1,
            "teamCountPage": 1,
            "pageCurrent": 1,
            "pageTotal": 1,
            "teams": [team],
        }),
    )
}

async fn legacy_teams(Path(season): Path<u16>) -> Redirect {
    Redirect::permanent(&format!("/{API_VERSION}/{season}/teams"))
}

/// Apply authentication, conditional headers and content negotiation the way
/// the real API does, then render `body`.
fn respond(headers: &HeaderMap, root: &str, body: Value) -> Response {
    if !authorized(headers) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    for name in [header::IF_MODIFIED_SINCE.as_str(), ONLY_MODIFIED_SINCE] {
        if let Some(since) = header_date(headers, name) {
            if since >= last_modified() {
                debug!(header = name, "not modified");
                return StatusCode::NOT_MODIFIED.into_response();
            }
        }
    }

    let wants_xml = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/xml"));
    let (content_type, text) = if wants_xml {
        ("application/xml", to_xml(root, &body))
    } else {
        ("application/json", body.to_string())
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::LAST_MODIFIED, LAST_MODIFIED),
        ],
        text,
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    let expected = format!("Basic {}", STANDARD.encode(format!("{USERNAME}:{KEY}")));
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

fn header_date(headers: &HeaderMap, name: &str) -> Option<DateTime<Utc>> {
    let raw = headers.get(name)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_xml(tag: &str, value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let inner: String = map.iter().map(|(k, v)| to_xml(k, v)).collect();
            format!("<{tag}>{inner}</{tag}>")
        }
        Value::Array(items) => {
            let inner: String = items.iter().map(|v| to_xml("item", v)).collect();
            format!("<{tag}>{inner}</{tag}>")
        }
        Value::Null => format!("<{tag}/>"),
        Value::String(s) => format!("<{tag}>{}</{tag}>", escape_xml(s)),
        other => format!("<{tag}>{other}</{tag}>"),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_serializes_to_camel_case() {
        let json = serde_json::to_value(&teams()[0]).unwrap();
        assert_eq!(json["teamNumber"], 254);
        assert_eq!(json["nameShort"], "The Cheesy Poofs");
        assert_eq!(json["stateProv"], "CA");
    }

    #[test]
    fn last_modified_parses() {
        use chrono::TimeZone;
        assert_eq!(last_modified(), Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn xml_rendering_nests_and_escapes() {
        let xml = to_xml("Teams", &json!({"teams": [{"nameShort": "R&D"}], "pageTotal": 1}));
        assert_eq!(
            xml,
            "<Teams><pageTotal>1</pageTotal><teams><item><nameShort>R&amp;D</nameShort></item></teams></Teams>"
        );
    }

    #[test]
    fn missing_authorization_is_rejected() {
        assert!(!authorized(&HeaderMap::new()));
    }

    #[test]
    fn conditional_date_requires_rfc_format() {
        let mut headers = HeaderMap::new();
        headers.insert(header::IF_MODIFIED_SINCE, "yesterday".parse().unwrap());
        assert!(header_date(&headers, "if-modified-since").is_none());
        headers.insert(header::IF_MODIFIED_SINCE, LAST_MODIFIED.parse().unwrap());
        assert_eq!(header_date(&headers, "if-modified-since"), Some(last_modified()));
    }
}
