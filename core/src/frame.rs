//! Conversion of JSON response bodies into tables.
//!
//! # Design
//! A `Frame` is a plain table (ordered column names plus rows of JSON cells)
//! that keeps the envelope it came from as provenance. Nested objects in a
//! record are flattened into dotted column names (`location.city`); arrays
//! stay as single cells.

use serde_json::{Map, Value};

use crate::envelope::ResponseEnvelope;
use crate::error::ApiError;
use crate::session::DataFormat;

/// How to find the records inside a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSpec {
    /// Top-level key to descend into before anything else.
    pub extract: Option<String>,
    /// Key of the array holding one object per row.
    pub record_path: Option<String>,
    /// Fields of the containing object copied onto every row.
    pub meta: Vec<String>,
}

impl FrameSpec {
    pub fn records(record_path: &str) -> Self {
        Self {
            record_path: Some(record_path.to_string()),
            ..Self::default()
        }
    }

    pub fn with_meta(mut self, fields: &[&str]) -> Self {
        self.meta = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_extract(mut self, key: &str) -> Self {
        self.extract = Some(key.to_string());
        self
    }

    fn is_flat(&self) -> bool {
        self.extract.is_none() && self.record_path.is_none() && self.meta.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    provenance: ResponseEnvelope,
}

impl Frame {
    pub fn build(envelope: ResponseEnvelope, spec: &FrameSpec) -> Result<Self, ApiError> {
        if envelope.text_format == DataFormat::Xml {
            return Err(ApiError::UnsupportedFormat(
                "table conversion needs a JSON body".to_string(),
            ));
        }
        let body: Value = serde_json::from_str(envelope.body()?)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;

        let mut table = TableBuilder::default();
        if spec.is_flat() {
            let Value::Object(record) = body else {
                return Err(shape_error("top-level JSON object"));
            };
            table.push(flatten(&record), Vec::new());
        } else {
            let data = match &spec.extract {
                Some(key) => body.get(key).ok_or_else(|| missing_key(key))?,
                None => &body,
            };
            let records = match &spec.record_path {
                Some(path) => data.get(path).ok_or_else(|| missing_key(path))?,
                None => data,
            };
            let meta: Vec<(String, Value)> = spec
                .meta
                .iter()
                .map(|field| (field.clone(), data.get(field).cloned().unwrap_or(Value::Null)))
                .collect();

            match records {
                Value::Array(items) => {
                    for item in items {
                        let Value::Object(record) = item else {
                            return Err(shape_error("array of JSON objects"));
                        };
                        table.push(flatten(record), meta.clone());
                    }
                }
                Value::Object(record) => table.push(flatten(record), meta),
                _ => return Err(shape_error("JSON object or array of objects")),
            }
        }

        let (columns, rows) = table.finish()?;
        Ok(Self {
            columns,
            rows,
            provenance: envelope,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// The envelope this table was built from.
    pub fn provenance(&self) -> &ResponseEnvelope {
        &self.provenance
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>, ResponseEnvelope) {
        (self.columns, self.rows, self.provenance)
    }
}

#[derive(Default)]
struct TableBuilder {
    columns: Vec<String>,
    records: Vec<Vec<(String, Value)>>,
    meta_columns: Vec<String>,
}

impl TableBuilder {
    fn push(&mut self, fields: Vec<(String, Value)>, meta: Vec<(String, Value)>) {
        for (name, _) in &fields {
            if !self.columns.contains(name) {
                self.columns.push(name.clone());
            }
        }
        for (name, _) in &meta {
            if !self.meta_columns.contains(name) {
                self.meta_columns.push(name.clone());
            }
        }
        let mut record = fields;
        record.extend(meta);
        self.records.push(record);
    }

    fn finish(mut self) -> Result<(Vec<String>, Vec<Vec<Value>>), ApiError> {
        if let Some(dup) = self.meta_columns.iter().find(|m| self.columns.contains(*m)) {
            return Err(ApiError::DeserializationError(format!(
                "meta field {dup} collides with a record column"
            )));
        }
        self.columns.append(&mut self.meta_columns);

        let rows: Vec<Vec<Value>> = self
            .records
            .into_iter()
            .map(|record| {
                self.columns
                    .iter()
                    .map(|col| {
                        record
                            .iter()
                            .find(|(name, _)| name == col)
                            .map(|(_, v)| v.clone())
                            .unwrap_or(Value::Null)
                    })
                    .collect()
            })
            .collect();
        Ok((self.columns, rows))
    }
}

fn flatten(record: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::with_capacity(record.len());
    flatten_into(None, record, &mut out);
    out
}

fn flatten_into(prefix: Option<&str>, record: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (key, value) in record {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(Some(&name), nested, out),
            other => out.push((name, other.clone())),
        }
    }
}

fn missing_key(key: &str) -> ApiError {
    ApiError::DeserializationError(format!("response has no {key:?} field"))
}

fn shape_error(expected: &str) -> ApiError {
    ApiError::DeserializationError(format!("expected a {expected}"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    fn envelope(body: Option<&str>) -> ResponseEnvelope {
        ResponseEnvelope {
            status_code: if body.is_some() { 200 } else { 304 },
            text: body.map(str::to_string),
            text_format: DataFormat::Json,
            url: "https://api.test/v2.0/2021/teams".to_string(),
            requested_url: "https://api.test/v2.0/2021/teams".to_string(),
            time_downloaded: "Fri, 01 Jan 2021 00:00:00".to_string(),
            local_data: false,
            local_time: None,
            frame_type: "teams".to_string(),
            mod_since: None,
            only_mod_since: None,
            headers: BTreeMap::new(),
        }
    }

    const TEAMS: &str = r#"{
        "teamCountTotal": 2,
        "pageCurrent": 1,
        "teams": [
            {"teamNumber": 254, "nameShort": "The Cheesy Poofs", "location": {"city": "San Jose", "state": "CA"}},
            {"teamNumber": 1678, "nameShort": "Citrus Circuits", "location": {"city": "Davis"}, "robotName": "Arrow"}
        ]
    }"#;

    #[test]
    fn flat_body_is_one_row() {
        let frame = Frame::build(
            envelope(Some(r#"{"currentSeason": 2021, "maxSeason": 2022}"#)),
            &FrameSpec::default(),
        )
        .unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.cell(0, "currentSeason"), Some(&json!(2021)));
        assert_eq!(frame.columns().len(), 2);
    }

    #[test]
    fn records_are_flattened_with_meta() {
        let spec = FrameSpec::records("teams").with_meta(&["pageCurrent"]);
        let frame = Frame::build(envelope(Some(TEAMS)), &spec).unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.columns().last().map(String::as_str), Some("pageCurrent"));
        assert_eq!(frame.cell(0, "location.city"), Some(&json!("San Jose")));
        assert_eq!(frame.cell(1, "location.state"), Some(&Value::Null));
        assert_eq!(frame.cell(0, "robotName"), Some(&Value::Null));
        assert_eq!(frame.cell(1, "robotName"), Some(&json!("Arrow")));
        assert_eq!(
            frame.column("pageCurrent").unwrap(),
            vec![&json!(1), &json!(1)]
        );
        assert_eq!(frame.provenance().frame_type, "teams");
    }

    #[test]
    fn extract_descends_before_record_path() {
        let body = r#"{"Schedule": {"event": "TXHOU", "matches": [{"matchNumber": 1}, {"matchNumber": 2}]}}"#;
        let spec = FrameSpec::records("matches")
            .with_extract("Schedule")
            .with_meta(&["event"]);
        let frame = Frame::build(envelope(Some(body)), &spec).unwrap();
        assert_eq!(frame.columns(), ["matchNumber", "event"]);
        assert_eq!(frame.column("event").unwrap(), vec![&json!("TXHOU"), &json!("TXHOU")]);
    }

    #[test]
    fn not_modified_envelope_has_no_table() {
        let err = Frame::build(envelope(None), &FrameSpec::default()).unwrap_err();
        assert!(matches!(err, ApiError::NotModified));
    }

    #[test]
    fn xml_body_is_unsupported() {
        let mut env = envelope(Some("<Teams/>"));
        env.text_format = DataFormat::Xml;
        let err = Frame::build(env, &FrameSpec::default()).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_record_path_is_reported() {
        let err = Frame::build(envelope(Some(TEAMS)), &FrameSpec::records("events")).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(ref m) if m.contains("events")));
    }

    #[test]
    fn meta_collision_is_reported() {
        let spec = FrameSpec::records("teams").with_meta(&["teamNumber"]);
        assert!(Frame::build(envelope(Some(TEAMS)), &spec).is_err());
    }
}
