//! Intraday ticks.

use chrono::FixedOffset;
use volcurve_types::{
    DATETIME_FORMAT, EventType, SecurityId, TickRow, TickTable, TimeRange, VolcurveError,
    utc_to_local,
};

use crate::{Fetcher, Message, Request, RequestKind, ResponseReducer};

const TICK_DATA: &str = "tickData";
const CONDITION_CODES: &str = "conditionCodes";

/// Parameters of an intraday tick request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickRequest {
    /// Security.
    pub security: SecurityId,
    /// Event types to include.
    pub event_types: Vec<EventType>,
    /// Local wall-clock window.
    pub range: TimeRange,
    /// Whether to request condition codes.
    pub include_condition_codes: bool,
}

impl TickRequest {
    /// Creates a request without condition codes.
    #[must_use]
    pub const fn new(security: SecurityId, event_types: Vec<EventType>, range: TimeRange) -> Self {
        Self {
            security,
            event_types,
            range,
            include_condition_codes: false,
        }
    }

    /// Requests condition codes alongside each tick.
    #[must_use]
    pub const fn with_condition_codes(mut self, include: bool) -> Self {
        self.include_condition_codes = include;
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
        let mut request = Request::new(RequestKind::IntradayTick);
        request.set("security", self.security.as_str());
        for event_type in &self.event_types {
            request.append("eventTypes", event_type.as_str());
        }
        request
            .set("startDateTime", utc.start.format(DATETIME_FORMAT).to_string())
            .set("endDateTime", utc.end.format(DATETIME_FORMAT).to_string());
        if self.include_condition_codes {
            request.set("includeConditionCodes", true);
        }
        Ok(request)
    }
}

#[derive(Debug)]
struct TickReducer {
    offset: FixedOffset,
    table: TickTable,
}

impl ResponseReducer for TickReducer {
    type Output = TickTable;

    fn accept(&mut self, message: &Message) -> Result<(), VolcurveError> {
        let data = message.root().get_element(TICK_DATA)?.get_element(TICK_DATA)?;
        for tick in data.values() {
            let condition_codes = match self.table.condition_codes {
                Some(_) => tick.try_element(CONDITION_CODES).map(|c| c.to_text()),
                None => None,
            };
            self.table.push(TickRow {
                time: utc_to_local(tick.element_as_datetime("time")?, self.offset)?,
                event_type: tick.element_as_str("type")?.to_string(),
                value: tick.element_as_f64("value")?,
                size: tick.element_as_i64("size")?,
                condition_codes,
            });
        }
        Ok(())
    }

    fn finish(self) -> Result<TickTable, VolcurveError> {
        Ok(self.table)
    }
}

impl Fetcher {
    /// Fetches intraday ticks, with times in local wall clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails, the gateway reports an error,
    /// or a tick lacks a required element.
    pub async fn ticks(&self, request: &TickRequest) -> Result<TickTable, VolcurveError> {
        let offset = self.config().utc_offset;
        let reducer = TickReducer {
            offset,
            table: TickTable::new(request.include_condition_codes),
        };
        self.execute(request.to_request(offset)?, reducer).await
    }
}
