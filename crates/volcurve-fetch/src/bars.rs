//! Intraday time bars.

use chrono::{FixedOffset, NaiveDateTime};
use tracing::debug;
use volcurve_types::{
    BarColumns, BarRow, DATETIME_FORMAT, EventType, Frame, SecurityId, TimeRange, VolcurveError,
    utc_to_local,
};

use crate::{Element, Fetcher, Message, Request, RequestKind, ResponseReducer};

const BAR_DATA: &str = "barData";
const BAR_TICK_DATA: &str = "barTickData";

/// Parameters of an intraday bar request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequest {
    /// Security.
    pub security: SecurityId,
    /// Event type the bars are built from.
    pub event_type: EventType,
    /// Local wall-clock window.
    pub range: TimeRange,
    /// Bar length in minutes.
    pub interval: u32,
    /// Output columns; empty keeps all of them.
    pub fields: Vec<String>,
}

impl BarRequest {
    /// Creates a request returning every bar column.
    #[must_use]
    pub const fn new(security: SecurityId, event_type: EventType, range: TimeRange, interval: u32) -> Self {
        Self {
            security,
            event_type,
            range,
            interval,
            fields: Vec::new(),
        }
    }

    /// Restricts the output to the given columns.
    #[must_use]
    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the gateway request, shifting the window to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::InvalidDateTime`] if the shifted window is
    /// out of range.
    pub fn to_request(&self, offset: FixedOffset) -> Result<Request, VolcurveError> {
        let utc = self.range.to_utc(offset)?;
        let mut request = Request::new(RequestKind::IntradayBar);
        request
            .set("security", self.security.as_str())
            .set("eventType", self.event_type.as_str())
            .set("interval", self.interval)
            .set("startDateTime", utc.start.format(DATETIME_FORMAT).to_string())
            .set("endDateTime", utc.end.format(DATETIME_FORMAT).to_string());
        Ok(request)
    }
}

fn parse_bar(bar: &Element<'_>, offset: FixedOffset) -> Result<BarRow, VolcurveError> {
    Ok(BarRow {
        time: utc_to_local(bar.element_as_datetime("time")?, offset)?,
        open: bar.element_as_f64("open")?,
        high: bar.element_as_f64("high")?,
        low: bar.element_as_f64("low")?,
        close: bar.element_as_f64("close")?,
        num_events: bar.element_as_i64("numEvents")?,
        volume: bar.element_as_i64("volume")?,
        value: bar.element_as_f64("value")?,
    })
}

#[derive(Debug)]
struct BarReducer {
    offset: FixedOffset,
    fields: Vec<String>,
    bars: BarColumns,
}

impl ResponseReducer for BarReducer {
    type Output = Frame<NaiveDateTime>;

    fn accept(&mut self, message: &Message) -> Result<(), VolcurveError> {
        let data = message
            .root()
            .get_element(BAR_DATA)?
            .get_element(BAR_TICK_DATA)?;
        for bar in data.values() {
            self.bars.push(parse_bar(&bar, self.offset)?);
        }
        Ok(())
    }

    fn finish(self) -> Result<Frame<NaiveDateTime>, VolcurveError> {
        debug!(bars = self.bars.len(), "assembling bars");
        let frame = self.bars.into_frame()?;
        if self.fields.is_empty() {
            Ok(frame)
        } else {
            frame.select(&self.fields)
        }
    }
}

impl Fetcher {
    /// Fetches intraday bars as a timestamp-indexed table with the columns
    /// `OPEN`, `HIGH`, `LOW`, `CLOSE`, `numEvents`, `VOLUME` and `VALUE`, or
    /// the requested subset.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails, the gateway reports an error,
    /// a bar lacks a required element, or a requested column is unknown.
    pub async fn bars(&self, request: &BarRequest) -> Result<Frame<NaiveDateTime>, VolcurveError> {
        let offset = self.config().utc_offset;
        let reducer = BarReducer {
            offset,
            fields: request.fields.clone(),
            bars: BarColumns::new(),
        };
        self.execute(request.to_request(offset)?, reducer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, Exchange, ScriptedGateway, Transcript};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use volcurve_types::{SessionConfig, bar_columns, parse_datetime};

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn request() -> BarRequest {
        BarRequest::new(
            "7203 JP Equity".into(),
            EventType::Trade,
            TimeRange::new(at("2024-03-04T09:00:00"), at("2024-03-04T15:00:00")),
            5,
        )
    }

    fn bar(time: &str, o: f64, h: f64, l: f64, c: f64, volume: i64) -> serde_json::Value {
        json!({
            "time": time, "open": o, "high": h, "low": l, "close": c,
            "numEvents": 10, "volume": volume, "value": c * volume as f64
        })
    }

    fn transcript() -> Transcript {
        Transcript::new(vec![Exchange::new(
            RequestKind::IntradayBar,
            vec![
                Event::partial(vec![Message::new(
                    "IntradayBarResponse",
                    json!({"barData": {"barTickData": [
                        bar("2024-03-04T00:00:00.000", 3650.0, 3661.0, 3648.0, 3655.0, 120_000),
                        bar("2024-03-04T00:05:00.000", 3655.0, 3659.0, 3640.0, 3642.0, 95_000),
                    ]}}),
                )]),
                Event::response(vec![Message::new(
                    "IntradayBarResponse",
                    json!({"barData": {"barTickData": [
                        bar("2024-03-04T00:10:00.000", 3642.0, 3650.0, 3641.0, 3649.0, 80_000),
                    ]}}),
                )]),
            ],
        )])
    }

    fn fetcher(gateway: &ScriptedGateway) -> Fetcher {
        Fetcher::new(
            Arc::new(gateway.clone()),
            SessionConfig::default()
                .with_utc_offset(FixedOffset::east_opt(9 * 3600).unwrap())
                .with_poll_timeout(Duration::from_millis(5)),
        )
    }

    #[test]
    fn test_to_request_single_event_type() {
        let request = request().to_request(FixedOffset::east_opt(9 * 3600).unwrap()).unwrap();
        assert_eq!(request.get("eventType"), Some(&json!("TRADE")));
        assert_eq!(request.get("interval"), Some(&json!(5)));
        assert_eq!(request.get("startDateTime"), Some(&json!("2024-03-04T00:00:00")));
        assert_eq!(request.get("endDateTime"), Some(&json!("2024-03-04T06:00:00")));
    }

    #[tokio::test]
    async fn test_bars_frame() {
        let gateway = ScriptedGateway::new(transcript());
        let frame = fetcher(&gateway).bars(&request()).await.unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(frame.column_names().collect::<Vec<_>>(), bar_columns::ALL.to_vec());
        assert_eq!(frame.index().unwrap()[0], at("2024-03-04T09:00:00"));
        assert_eq!(frame.get(2, bar_columns::VOLUME), Some(80_000.0));

        for row in 0..frame.len() {
            let cell = |name| frame.get(row, name).unwrap();
            let (open, high, low, close) = (
                cell(bar_columns::OPEN),
                cell(bar_columns::HIGH),
                cell(bar_columns::LOW),
                cell(bar_columns::CLOSE),
            );
            assert!(low <= open && open <= high);
            assert!(low <= close && close <= high);
        }
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_bars_field_subset() {
        let gateway = ScriptedGateway::new(transcript());
        let frame = fetcher(&gateway)
            .bars(&request().with_fields([bar_columns::VOLUME, bar_columns::CLOSE]))
            .await
            .unwrap();
        assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["VOLUME", "CLOSE"]);
    }

    #[tokio::test]
    async fn test_bars_unknown_field() {
        let gateway = ScriptedGateway::new(transcript());
        let result = fetcher(&gateway)
            .bars(&request().with_fields(["VWAP"]))
            .await;
        assert!(matches!(result, Err(VolcurveError::UnknownColumn(name)) if name == "VWAP"));
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_missing_bar_data() {
        let gateway = ScriptedGateway::new(Transcript::new(vec![Exchange::new(
            RequestKind::IntradayBar,
            vec![Event::response(vec![Message::new("IntradayBarResponse", json!({}))])],
        )]));
        let result = fetcher(&gateway).bars(&request()).await;
        assert!(matches!(result, Err(VolcurveError::MissingElement(_))));
        assert_eq!(gateway.stops(), 1);
    }
}
