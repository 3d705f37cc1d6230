//! Daily historical values.

use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};
use volcurve_types::{Column, DateRange, FieldId, Frame, SecurityId, VolcurveError};

use crate::{Fetcher, Message, Request, RequestKind, ResponseReducer};

const SECURITY_DATA: &str = "securityData";
const SECURITY_ERROR: &str = "securityError";
const FIELD_DATA: &str = "fieldData";

/// Which calendar a daily series is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodicityAdjustment {
    /// Periods end on the actual dates requested.
    Actual,
    /// Periods follow the calendar.
    Calendar,
    /// Periods follow the company's fiscal calendar.
    Fiscal,
}

impl PeriodicityAdjustment {
    /// Returns the value understood by the service.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Actual => "ACTUAL",
            Self::Calendar => "CALENDAR",
            Self::Fiscal => "FISCAL",
        }
    }
}

impl std::fmt::Display for PeriodicityAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A field value substituted by the service before computing the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOverride {
    /// Overridden field.
    pub field: FieldId,
    /// Value passed through verbatim.
    pub value: String,
}

/// Parameters of a historical end-of-day request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRequest {
    /// Securities, in output column order.
    pub securities: Vec<SecurityId>,
    /// Fields; one table is produced per field.
    pub fields: Vec<FieldId>,
    /// Inclusive date window.
    pub range: DateRange,
    /// Calendar alignment; the service default when unset.
    pub adjustment: Option<PeriodicityAdjustment>,
    /// Cap on the number of points returned per security.
    pub max_data_points: Option<u32>,
    /// Field overrides, sent in order.
    pub overrides: Vec<FieldOverride>,
}

impl HistoricalRequest {
    /// Creates a request.
    #[must_use]
    pub const fn new(securities: Vec<SecurityId>, fields: Vec<FieldId>, range: DateRange) -> Self {
        Self {
            securities,
            fields,
            range,
            adjustment: None,
            max_data_points: None,
            overrides: Vec::new(),
        }
    }

    /// Sets the periodicity adjustment.
    #[must_use]
    pub const fn with_adjustment(mut self, adjustment: PeriodicityAdjustment) -> Self {
        self.adjustment = Some(adjustment);
        self
    }

    /// Caps the number of points returned per security.
    #[must_use]
    pub const fn with_max_data_points(mut self, points: u32) -> Self {
        self.max_data_points = Some(points);
        self
    }

    /// Adds a field override.
    #[must_use]
    pub fn with_override(mut self, field: impl Into<FieldId>, value: impl Into<String>) -> Self {
        self.overrides.push(FieldOverride {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Builds the gateway request.
    #[must_use]
    pub fn to_request(&self) -> Request {
        let mut request = Request::new(RequestKind::HistoricalData);
        for security in &self.securities {
            request.append("securities", security.as_str());
        }
        for field in &self.fields {
            request.append("fields", field.as_str());
        }
        request
            .set("startDate", self.range.start_param())
            .set("endDate", self.range.end_param())
            .set("periodicitySelection", "DAILY");
        if let Some(adjustment) = self.adjustment {
            request.set("periodicityAdjustment", adjustment.as_str());
        }
        if let Some(points) = self.max_data_points {
            request.set("maxDataPoints", points);
        }
        for FieldOverride { field, value } in &self.overrides {
            request.append("overrides", json!({"fieldId": field.as_str(), "value": value}));
        }
        request
    }
}

/// Result of a historical request: one date-indexed table per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalData {
    tables: Vec<(FieldId, Frame<NaiveDate>)>,
}

impl HistoricalData {
    /// Returns the table for `field`.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&Frame<NaiveDate>> {
        self.tables
            .iter()
            .find(|(id, _)| id.as_str() == field)
            .map(|(_, frame)| frame)
    }

    /// Iterates over `(field, table)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldId, &Frame<NaiveDate>)> {
        self.tables.iter().map(|(id, frame)| (id, frame))
    }

    /// Consumes the result into its tables.
    #[must_use]
    pub fn into_tables(self) -> Vec<(FieldId, Frame<NaiveDate>)> {
        self.tables
    }
}

type SecurityRows = Vec<(NaiveDate, Vec<f64>)>;

#[derive(Debug)]
struct HistoricalReducer {
    securities: Vec<SecurityId>,
    fields: Vec<FieldId>,
    rows: HashMap<String, SecurityRows>,
}

impl HistoricalReducer {
    fn new(request: &HistoricalRequest) -> Self {
        Self {
            securities: request.securities.clone(),
            fields: request.fields.clone(),
            rows: HashMap::new(),
        }
    }
}

impl ResponseReducer for HistoricalReducer {
    type Output = HistoricalData;

    fn accept(&mut self, message: &Message) -> Result<(), VolcurveError> {
        let root = message.root();
        for security_data in root.get_element(SECURITY_DATA)?.values() {
            let security = security_data.element_as_str("security")?;

            if let Some(error) = security_data.try_element(SECURITY_ERROR) {
                return Err(VolcurveError::Response {
                    category: error.element_as_str("category")?.to_string(),
                    message: format!("{security}: {}", error.element_as_str("message")?),
                });
            }

            let Some(field_data) = security_data.try_element(FIELD_DATA) else {
                debug!(security, "no field data");
                continue;
            };

            let rows = self.rows.entry(security.to_string()).or_default();
            for point in field_data.values() {
                let date = point.get_element("date")?.as_date()?;
                let values = self
                    .fields
                    .iter()
                    .map(|field| point.element_as_f64(field.as_str()))
                    .collect::<Result<Vec<_>, _>>()?;
                rows.push((date, values));
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<HistoricalData, VolcurveError> {
        for security in self.rows.keys() {
            if !self.securities.iter().any(|s| s.as_str() == security) {
                warn!(security, "dropping data for a security that was not requested");
            }
        }

        let mut tables = Vec::with_capacity(self.fields.len());
        for (f, field) in self.fields.iter().enumerate() {
            let mut table = Frame::default();
            for security in &self.securities {
                let rows = self
                    .rows
                    .get(security.as_str())
                    .map_or(&[][..], Vec::as_slice);
                let column = Frame::from_columns(
                    rows.iter().map(|(date, _)| *date).collect(),
                    vec![Column::new(
                        security.as_str(),
                        rows.iter().map(|(_, values)| Some(values[f])).collect(),
                    )],
                )?;
                table = table.outer_join(&column)?;
            }
            tables.push((field.clone(), table));
        }
        Ok(HistoricalData { tables })
    }
}

impl Fetcher {
    /// Fetches daily values for every security and field in `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails, the gateway reports an error,
    /// or a requested field is missing from a returned row.
    pub async fn historical(&self, request: &HistoricalRequest) -> Result<HistoricalData, VolcurveError> {
        self.execute(request.to_request(), HistoricalReducer::new(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, Exchange, ScriptedGateway, Transcript};
    use std::sync::Arc;
    use volcurve_types::SessionConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> HistoricalRequest {
        HistoricalRequest::new(
            vec!["7203 JP Equity".into(), "6758 JP Equity".into(), "9984 JP Equity".into()],
            vec!["PX_LAST".into(), "VOLUME".into()],
            DateRange::new(date(2024, 3, 1), date(2024, 3, 6)),
        )
    }

    fn security_message(security: &str, rows: serde_json::Value) -> crate::Message {
        Message::new(
            "HistoricalDataResponse",
            json!({"securityData": {"security": security, "sequenceNumber": 0, "fieldData": rows}}),
        )
    }

    fn transcript() -> Transcript {
        Transcript::new(vec![Exchange::new(
            RequestKind::HistoricalData,
            vec![
                Event::partial(vec![security_message(
                    "7203 JP Equity",
                    json!([
                        {"date": "2024-03-01", "PX_LAST": 3650.0, "VOLUME": 21_000_000},
                        {"date": "2024-03-04", "PX_LAST": 3702.0, "VOLUME": 18_500_000},
                    ]),
                )]),
                Event::response(vec![security_message(
                    "6758 JP Equity",
                    json!([
                        {"date": "2024-03-04", "PX_LAST": 13_120.0, "VOLUME": 4_100_000},
                        {"date": "2024-03-05", "PX_LAST": 13_005.0, "VOLUME": 3_900_000},
                    ]),
                )]),
            ],
        )])
    }

    fn fetcher(gateway: &ScriptedGateway) -> Fetcher {
        Fetcher::new(
            Arc::new(gateway.clone()),
            SessionConfig::default().with_poll_timeout(std::time::Duration::from_millis(5)),
        )
    }

    #[test]
    fn test_to_request() {
        let request = request().to_request();
        assert_eq!(request.kind(), RequestKind::HistoricalData);
        assert_eq!(request.get("startDate"), Some(&json!("20240301")));
        assert_eq!(request.get("endDate"), Some(&json!("20240306")));
        assert_eq!(request.get("periodicitySelection"), Some(&json!("DAILY")));
        assert_eq!(request.get("fields"), Some(&json!(["PX_LAST", "VOLUME"])));
        assert!(request.mentions("securities", "9984 JP Equity"));
        assert_eq!(request.get("periodicityAdjustment"), None);
        assert_eq!(request.get("maxDataPoints"), None);
        assert_eq!(request.get("overrides"), None);
    }

    #[test]
    fn test_to_request_options() {
        let request = request()
            .with_adjustment(PeriodicityAdjustment::Actual)
            .with_max_data_points(100)
            .with_override("BEST_DATA_SOURCE_OVERRIDE", "BLI")
            .to_request();
        assert_eq!(request.get("periodicityAdjustment"), Some(&json!("ACTUAL")));
        assert_eq!(request.get("maxDataPoints"), Some(&json!(100)));
        assert_eq!(
            request.get("overrides"),
            Some(&json!([{"fieldId": "BEST_DATA_SOURCE_OVERRIDE", "value": "BLI"}]))
        );
        assert_eq!(request.get("periodicitySelection"), Some(&json!("DAILY")));
    }

    #[tokio::test]
    async fn test_historical_tables() {
        let gateway = ScriptedGateway::new(transcript());
        let request = request();
        let data = fetcher(&gateway).historical(&request).await.unwrap();

        let px = data.field("PX_LAST").unwrap();
        let names: Vec<_> = px.column_names().collect();
        assert_eq!(names, vec!["7203 JP Equity", "6758 JP Equity", "9984 JP Equity"]);
        let index = px.index().unwrap();
        assert_eq!(index, vec![date(2024, 3, 1), date(2024, 3, 4), date(2024, 3, 5)]);
        assert!(index.iter().all(|d| request.range.contains(*d)));

        assert_eq!(px.get(0, "7203 JP Equity"), Some(3650.0));
        assert_eq!(px.get(0, "6758 JP Equity"), None);
        assert_eq!(px.get(1, "6758 JP Equity"), Some(13_120.0));
        assert!(px.column("9984 JP Equity").unwrap().iter().all(Option::is_none));

        let volume = data.field("VOLUME").unwrap();
        assert_eq!(volume.get(2, "6758 JP Equity"), Some(3_900_000.0));
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_missing_field_stops_session() {
        let gateway = ScriptedGateway::new(Transcript::new(vec![Exchange::new(
            RequestKind::HistoricalData,
            vec![Event::response(vec![security_message(
                "7203 JP Equity",
                json!([
                    {"date": "2024-03-01", "PX_LAST": 3650.0, "VOLUME": 1},
                    {"date": "2024-03-04", "PX_LAST": 3702.0},
                ]),
            )])],
        )]));

        let result = fetcher(&gateway).historical(&request()).await;
        assert!(matches!(result, Err(VolcurveError::MissingElement(name)) if name.ends_with("VOLUME")));
        assert_eq!(gateway.starts(), 1);
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_security_error() {
        let gateway = ScriptedGateway::new(Transcript::new(vec![Exchange::new(
            RequestKind::HistoricalData,
            vec![Event::response(vec![Message::new(
                "HistoricalDataResponse",
                json!({"securityData": {
                    "security": "XXXX JP Equity",
                    "securityError": {"category": "BAD_SEC", "message": "Unknown/Invalid security"}
                }}),
            )])],
        )]));

        let result = fetcher(&gateway).historical(&request()).await;
        assert!(matches!(result, Err(VolcurveError::Response { category, .. }) if category == "BAD_SEC"));
        assert_eq!(gateway.stops(), 1);
    }
}
