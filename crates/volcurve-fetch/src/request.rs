//! Requests sent to the reference data service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Daily historical values.
    #[serde(rename = "HistoricalDataRequest")]
    HistoricalData,
    /// Intraday ticks.
    #[serde(rename = "IntradayTickRequest")]
    IntradayTick,
    /// Intraday time bars.
    #[serde(rename = "IntradayBarRequest")]
    IntradayBar,
    /// Static and bulk reference fields.
    #[serde(rename = "ReferenceDataRequest")]
    ReferenceData,
}

impl RequestKind {
    /// Returns the operation name understood by the service.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HistoricalData => "HistoricalDataRequest",
            Self::IntradayTick => "IntradayTickRequest",
            Self::IntradayBar => "IntradayBarRequest",
            Self::ReferenceData => "ReferenceDataRequest",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request: an operation plus named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    request_type: RequestKind,
    params: Map<String, Value>,
}

impl Request {
    /// Creates an empty request.
    #[must_use]
    pub fn new(kind: RequestKind) -> Self {
        Self {
            request_type: kind,
            params: Map::new(),
        }
    }

    /// Returns the request operation.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.request_type
    }

    /// Sets a scalar parameter, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Appends a value to an array parameter, creating it if needed.
    pub fn append(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        let entry = self
            .params
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(value.into()),
            other => {
                let previous = std::mem::take(other);
                *other = Value::Array(vec![previous, value.into()]);
            }
        }
        self
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Returns true if a string parameter equals `value`, or an array
    /// parameter contains it.
    #[must_use]
    pub fn mentions(&self, name: &str, value: &str) -> bool {
        match self.params.get(name) {
            Some(Value::String(s)) => s == value,
            Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(value)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_append() {
        let mut request = Request::new(RequestKind::HistoricalData);
        request
            .append("securities", "7203 JP Equity")
            .append("securities", "6758 JP Equity")
            .set("periodicitySelection", "DAILY");

        assert_eq!(
            request.get("securities"),
            Some(&json!(["7203 JP Equity", "6758 JP Equity"]))
        );
        assert!(request.mentions("securities", "6758 JP Equity"));
        assert!(request.mentions("periodicitySelection", "DAILY"));
        assert!(!request.mentions("fields", "PX_LAST"));
    }

    #[test]
    fn test_serialize_shape() {
        let mut request = Request::new(RequestKind::IntradayBar);
        request.set("interval", 5);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({"requestType": "IntradayBarRequest", "params": {"interval": 5}})
        );
    }
}
