use super::error::{RagicError, Result};
use serde_json::{Map, Value};

/// One backend record: field key to value
pub type Record = Map<String, Value>;

/// Raw Ragic listing response, keyed by record id in response order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecordSet {
    records: Vec<(String, Record)>,
}

impl RawRecordSet {
    /// Parse a response body
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| RagicError::InvalidResponse(format!("Body is not JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Validate a decoded payload
    ///
    /// Ragic reports request-level failures with a 200 status and a body of
    /// the form `{"status": "ERROR", "msg": "..."}`; those are rejected here.
    pub fn from_value(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(RagicError::InvalidResponse(format!(
                    "Expected a JSON object keyed by record id, got {}",
                    json_kind(&other)
                )))
            }
        };

        if map.get("status").and_then(Value::as_str) == Some("ERROR") {
            let msg = map
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            return Err(RagicError::InvalidResponse(format!("Backend error: {}", msg)));
        }

        let mut records = Vec::with_capacity(map.len());
        for (record_id, record) in map {
            match record {
                Value::Object(fields) => records.push((record_id, fields)),
                other => {
                    return Err(RagicError::InvalidResponse(format!(
                        "Record '{}' is {}, expected an object",
                        record_id,
                        json_kind(&other)
                    )))
                }
            }
        }

        Ok(RawRecordSet { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn record_ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|(id, _)| id.as_str())
    }
}

impl FromIterator<(String, Record)> for RawRecordSet {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        RawRecordSet {
            records: iter.into_iter().collect(),
        }
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
