//! Record domain type and payload decoding

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Maximum number of payload characters kept in a decode diagnostic
const PREVIEW_CHARS: usize = 120;

/// One broadcast indicator observation
///
/// Missing keys decode to the field's zero value; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub indicator_id: String,
    pub indicator_value: String,
    pub country_id: String,
    pub country_value: String,
    pub country_iso3_code: String,
    pub date: String,
    pub value: u64,
    pub unit: String,
    pub obs_status: String,
    pub decimal: u64,
}

/// A payload that could not be decoded into a [`Record`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed payload ({reason}): {preview}")]
pub struct DecodeError {
    /// Decoder diagnostic
    pub reason: String,
    /// Lossy, truncated rendering of the offending payload
    pub preview: String,
}

impl DecodeError {
    fn new(reason: impl Into<String>, payload: &[u8]) -> Self {
        Self {
            reason: reason.into(),
            preview: preview(payload),
        }
    }
}

fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

impl Record {
    /// Decode a raw feed payload
    ///
    /// Either the whole record is built or an error is returned; there is
    /// no partially populated result. A `null` payload or field leaves the
    /// zero value, and a repeated key takes its last value.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        debug!(len = payload.len(), "Record::decode: called");
        // Going through Value collapses duplicate keys (last wins)
        let value: Value = serde_json::from_slice(payload).map_err(|e| DecodeError::new(e.to_string(), payload))?;

        let fields = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(mut fields) => {
                fields.retain(|_, v| !v.is_null());
                fields
            }
            other => {
                return Err(DecodeError::new(
                    format!("expected a JSON object, found {}", json_kind(&other)),
                    payload,
                ));
            }
        };

        serde_json::from_value(Value::Object(fields)).map_err(|e| DecodeError::new(e.to_string(), payload))
    }

    /// Short one-line summary used for arrival notifications
    pub fn summary(&self) -> String {
        format!(
            "{} {} {}: {} {}",
            self.country_iso3_code, self.indicator_id, self.date, self.value, self.unit
        )
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  indicator:  {} ({})", self.indicator_value, self.indicator_id)?;
        writeln!(
            f,
            "  country:    {} ({}, {})",
            self.country_value, self.country_id, self.country_iso3_code
        )?;
        writeln!(f, "  date:       {}", self.date)?;
        writeln!(f, "  value:      {} {}", self.value, self.unit)?;
        writeln!(f, "  obs_status: {}", self.obs_status)?;
        write!(f, "  decimal:    {}", self.decimal)
    }
}
