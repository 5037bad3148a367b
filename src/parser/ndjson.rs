use crate::buffer::BufferError;
use crate::domain::{Fields, Record, TimeUnit};
use chrono::DateTime;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),
    #[error("Invalid record format")]
    InvalidFormat,
}

impl From<ParseError> for BufferError {
    fn from(e: ParseError) -> Self {
        BufferError::MalformedRecord {
            reason: e.to_string(),
        }
    }
}

/// A decoded telemetry line together with the unit its timestamp is expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub record: Record,
    pub unit: TimeUnit,
}

/// Decoder for newline-delimited JSON telemetry:
/// `{"feed": "...", "timestamp": 1700000000000 | "2024-01-01T00:00:00Z", "unit": "ms", "fields": {...}}`.
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    default_unit: TimeUnit,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_unit(default_unit: TimeUnit) -> Self {
        Self { default_unit }
    }

    pub fn parse_line(&self, line: &str) -> Result<ParsedRecord, ParseError> {
        let json: Value = serde_json::from_str(line.trim())?;
        let obj = json.as_object().ok_or(ParseError::InvalidFormat)?;

        let feed_id = obj
            .get("feed")
            .or_else(|| obj.get("feed_id"))
            .and_then(Value::as_str)
            .filter(|feed| !feed.is_empty())
            .ok_or_else(|| ParseError::MissingField("feed".to_string()))?
            .to_string();

        let unit = match obj.get("unit") {
            None | Some(Value::Null) => self.default_unit,
            Some(Value::String(unit)) => unit.parse().map_err(ParseError::InvalidFieldType)?,
            Some(_) => return Err(ParseError::InvalidFieldType("unit must be a string".to_string())),
        };

        let timestamp = parse_timestamp(obj, unit)?;
        let fields = parse_fields(obj)?;

        Ok(ParsedRecord {
            record: Record::new(feed_id, timestamp, fields),
            unit,
        })
    }

    /// Parses every non-blank line; failures are reported per line.
    pub fn parse_batch<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Result<ParsedRecord, ParseError>> {
        lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| self.parse_line(line))
            .collect()
    }
}

fn parse_timestamp(obj: &Map<String, Value>, unit: TimeUnit) -> Result<i64, ParseError> {
    match obj.get("timestamp") {
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            ParseError::InvalidFieldType(format!("timestamp {n} is not a 64-bit integer"))
        }),
        Some(Value::String(s)) => {
            let parsed = DateTime::parse_from_rfc3339(s)
                .map_err(|e| ParseError::InvalidFieldType(format!("timestamp '{s}': {e}")))?;
            let nanos = parsed.timestamp_nanos_opt().ok_or_else(|| {
                ParseError::InvalidFieldType(format!("timestamp '{s}' is out of range"))
            })?;
            Ok(unit.from_nanos(nanos))
        }
        Some(_) => Err(ParseError::InvalidFieldType(
            "timestamp must be an integer or an RFC3339 string".to_string(),
        )),
        None => Err(ParseError::MissingField("timestamp".to_string())),
    }
}

fn parse_fields(obj: &Map<String, Value>) -> Result<Fields, ParseError> {
    let raw = obj
        .get("fields")
        .ok_or_else(|| ParseError::MissingField("fields".to_string()))?
        .as_object()
        .ok_or_else(|| ParseError::InvalidFieldType("fields must be an object".to_string()))?;

    if raw.is_empty() {
        return Err(ParseError::MissingField("fields".to_string()));
    }

    Ok(raw
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_timestamp_with_default_unit() {
        let parser = RecordParser::new();
        let parsed = parser
            .parse_line(r#"{"feed":"temp","timestamp":1700000000000,"fields":{"value":"21.5"}}"#)
            .unwrap();

        assert_eq!(parsed.unit, TimeUnit::Milliseconds);
        assert_eq!(parsed.record.feed_id, "temp");
        assert_eq!(parsed.record.timestamp, 1_700_000_000_000);
        assert_eq!(parsed.record.fields["value"], "21.5");
    }

    #[test]
    fn test_rfc3339_timestamp_is_converted_to_unit() {
        let parser = RecordParser::new();
        let parsed = parser
            .parse_line(
                r#"{"feed_id":"temp","timestamp":"1970-01-01T00:00:02.500Z","unit":"s","fields":{"value":1}}"#,
            )
            .unwrap();

        assert_eq!(parsed.unit, TimeUnit::Seconds);
        assert_eq!(parsed.record.timestamp, 2);
        // Non-string values are stringified.
        assert_eq!(parsed.record.fields["value"], "1");
    }

    #[test]
    fn test_missing_parts_are_rejected() {
        let parser = RecordParser::new();
        assert!(matches!(
            parser.parse_line(r#"{"timestamp":1,"fields":{"v":"1"}}"#),
            Err(ParseError::MissingField(f)) if f == "feed"
        ));
        assert!(matches!(
            parser.parse_line(r#"{"feed":"temp","fields":{"v":"1"}}"#),
            Err(ParseError::MissingField(f)) if f == "timestamp"
        ));
        assert!(matches!(
            parser.parse_line(r#"{"feed":"temp","timestamp":1,"fields":{}}"#),
            Err(ParseError::MissingField(f)) if f == "fields"
        ));
        assert!(matches!(
            parser.parse_line(r#"{"feed":"temp","timestamp":1.5,"fields":{"v":"1"}}"#),
            Err(ParseError::InvalidFieldType(_))
        ));
        assert!(matches!(parser.parse_line("[1,2]"), Err(ParseError::InvalidFormat)));
        assert!(matches!(parser.parse_line("not json"), Err(ParseError::JsonError(_))));
    }

    #[test]
    fn test_parse_batch_skips_blank_lines() {
        let parser = RecordParser::with_default_unit(TimeUnit::Seconds);
        let input = "{\"feed\":\"a\",\"timestamp\":1,\"fields\":{\"v\":\"1\"}}\n\n{\"feed\":\"\"}\n";
        let results = parser.parse_batch(input.lines());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().unit, TimeUnit::Seconds);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_parse_error_maps_to_malformed_record() {
        let err: BufferError = ParseError::InvalidFormat.into();
        assert!(matches!(err, BufferError::MalformedRecord { .. }));
    }
}
