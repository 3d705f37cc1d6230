//! Volume curve for the members of an index.

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use std::num::NonZeroU32;
use tracing::{debug, info};
use volcurve_fetch::{BarRequest, DEFAULT_MEMBER_SUFFIX, Fetcher, MembersRequest};
use volcurve_types::{EventType, Frame, SecurityId, TimeRange, VolcurveError, bar_columns};

use crate::{BusinessCalendar, HolidayCalendar, JapanHolidays, VolumeCurve, build_curve, shorten_labels};

/// Hour of the end date the look-back window is anchored at.
pub const DEFAULT_REFERENCE_HOUR: u32 = 9;

/// Number of characters kept from each security identifier.
pub const DEFAULT_LABEL_WIDTH: usize = 4;

/// Parameters of a basket volume curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveRequest {
    /// Index whose members form the basket.
    pub index: SecurityId,
    /// Event type the bars are built from.
    pub event_type: EventType,
    /// End of the window, local wall clock.
    pub end: NaiveDateTime,
    /// Business days in the window, the last one included.
    pub days: u32,
    /// Bar length in minutes.
    pub interval: u32,
    /// Bar columns to fetch; must include `VOLUME` when non-empty.
    pub fields: Vec<String>,
    /// Hour of the start date the window opens at.
    pub reference_hour: u32,
    /// Characters kept from each identifier in the output labels.
    pub label_width: usize,
    /// Suffix appended to member tickers.
    pub member_suffix: String,
}

impl CurveRequest {
    /// Creates a request with default reference hour, label width and suffix.
    #[must_use]
    pub fn new(
        index: impl Into<SecurityId>,
        event_type: EventType,
        end: NaiveDateTime,
        days: u32,
        interval: u32,
    ) -> Self {
        Self {
            index: index.into(),
            event_type,
            end,
            days,
            interval,
            fields: Vec::new(),
            reference_hour: DEFAULT_REFERENCE_HOUR,
            label_width: DEFAULT_LABEL_WIDTH,
            member_suffix: DEFAULT_MEMBER_SUFFIX.to_string(),
        }
    }

    /// Restricts the bar columns fetched per member.
    #[must_use]
    pub fn with_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the hour the window opens at.
    #[must_use]
    pub const fn with_reference_hour(mut self, hour: u32) -> Self {
        self.reference_hour = hour;
        self
    }

    /// Sets the label width.
    #[must_use]
    pub const fn with_label_width(mut self, width: usize) -> Self {
        self.label_width = width;
        self
    }

    /// Sets the member suffix.
    #[must_use]
    pub fn with_member_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.member_suffix = suffix.into();
        self
    }

    /// Returns the bar window: from the reference hour of the first of
    /// `days` business days through the end datetime.
    ///
    /// The last business day is the end date when it is a business day and
    /// the end datetime is at or after its reference hour, otherwise the
    /// business day before it.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::InvalidDateTime`] if the reference hour is
    /// not a valid hour, or [`VolcurveError::NoBusinessDays`] if `days` is 0.
    pub fn window<H: HolidayCalendar>(&self, calendar: &BusinessCalendar<H>) -> Result<TimeRange, VolcurveError> {
        let open = NaiveTime::from_hms_opt(self.reference_hour, 0, 0).ok_or_else(|| {
            VolcurveError::InvalidDateTime(format!("reference hour {}", self.reference_hour))
        })?;
        let end_date = self.end.date();
        let earlier = self.days.checked_sub(1).ok_or(VolcurveError::NoBusinessDays {
            start: end_date,
            end: end_date,
        })?;

        let last = if calendar.is_business_day(end_date) && end_date.and_time(open) <= self.end {
            end_date
        } else {
            calendar.sub_business_days(end_date, 1)
        };
        let start = calendar.sub_business_days(last, earlier);
        Ok(TimeRange::new(start.and_time(open), self.end))
    }

    /// Counts the business days whose session opens inside the window.
    ///
    /// # Errors
    ///
    /// Returns the [`window`](Self::window) errors, or
    /// [`VolcurveError::NoBusinessDays`] if no session opens in the window.
    pub fn business_days<H: HolidayCalendar>(
        &self,
        calendar: &BusinessCalendar<H>,
    ) -> Result<NonZeroU32, VolcurveError> {
        let window = self.window(calendar)?;
        let (first, last) = (window.start.date(), window.end.date());
        let mut count = calendar.count_business_days(first, last);
        if calendar.is_business_day(last) && last.and_time(window.start.time()) > window.end {
            count = count.saturating_sub(1);
        }
        NonZeroU32::new(count).ok_or(VolcurveError::NoBusinessDays {
            start: first,
            end: last,
        })
    }
}

/// Progress notifications emitted while a basket is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveProgress<'a> {
    /// The index resolved to this many members.
    Resolved(usize),
    /// Bars for one member were fetched.
    Fetched(&'a SecurityId),
}

/// Fetches bars for every member of the index and builds the volume curve,
/// using Japanese national holidays for the business-day calendar.
///
/// # Errors
///
/// Returns the first fetch error, [`VolcurveError::UnknownColumn`] if the
/// field filter omits `VOLUME`, or [`VolcurveError::NoBusinessDays`] if the
/// window holds no business day.
pub async fn volume_curve(
    fetcher: &Fetcher,
    request: &CurveRequest,
    on_progress: impl FnMut(CurveProgress<'_>),
) -> Result<VolumeCurve, VolcurveError> {
    let end = request.end.date();
    let lookback = i32::try_from(request.days / 200 + 1).unwrap_or(i32::MAX);
    let holidays = JapanHolidays::for_years(end.year().saturating_sub(lookback)..=end.year());
    volume_curve_with_calendar(fetcher, request, &BusinessCalendar::new(holidays), on_progress).await
}

/// [`volume_curve`] with a caller-supplied business-day calendar.
///
/// # Errors
///
/// See [`volume_curve`].
pub async fn volume_curve_with_calendar<H: HolidayCalendar + Sync>(
    fetcher: &Fetcher,
    request: &CurveRequest,
    calendar: &BusinessCalendar<H>,
    mut on_progress: impl FnMut(CurveProgress<'_>),
) -> Result<VolumeCurve, VolcurveError> {
    if !request.fields.is_empty() && !request.fields.iter().any(|f| f == bar_columns::VOLUME) {
        return Err(VolcurveError::UnknownColumn(bar_columns::VOLUME.to_string()));
    }

    let window = request.window(calendar)?;
    let business_days = request.business_days(calendar)?;

    let members = fetcher
        .index_members(&MembersRequest::new(request.index.clone()).with_suffix(&request.member_suffix))
        .await?;
    on_progress(CurveProgress::Resolved(members.len()));
    info!(
        index = %request.index,
        members = members.len(),
        %window,
        business_days = business_days.get(),
        "building volume curve"
    );

    let mut wide: Frame<NaiveDateTime> = Frame::default();
    for security in &members {
        let bars = BarRequest::new(security.clone(), request.event_type, window, request.interval)
            .with_fields(request.fields.iter().cloned());
        let mut volume = fetcher.bars(&bars).await?.select(&[bar_columns::VOLUME])?;
        volume.rename_column(bar_columns::VOLUME, security.as_str())?;
        debug!(%security, bars = volume.len(), "member volume fetched");
        wide = wide.outer_join(&volume)?;
        on_progress(CurveProgress::Fetched(security));
    }

    let wide = shorten_labels(&wide, request.label_width)?;
    build_curve(&wide, business_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use volcurve_fetch::{Event, Exchange, Message, RequestKind, ScriptedGateway, Transcript};
    use volcurve_types::{SessionConfig, parse_datetime};

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn members_of(tickers: &[&str]) -> Exchange {
        let mut rows = vec![json!({"ticker": "Member Ticker and Exchange Code"})];
        rows.extend(tickers.iter().map(|t| json!({"ticker": t})));
        Exchange::new(
            RequestKind::ReferenceData,
            vec![Event::response(vec![Message::new(
                "ReferenceDataResponse",
                json!({"securityData": [{"security": "NKY Index", "fieldData": {"INDX_MEMBERS": rows}}]}),
            )])],
        )
    }

    fn members() -> Exchange {
        members_of(&["7203 JP", "6758 JP"])
    }

    fn bars(security: &str, volumes: &[(&str, i64)]) -> Exchange {
        let ticks: Vec<_> = volumes
            .iter()
            .map(|(time, volume)| {
                json!({
                    "time": time, "open": 100.0, "high": 101.0, "low": 99.0, "close": 100.5,
                    "numEvents": 3, "volume": volume, "value": 100.0
                })
            })
            .collect();
        Exchange::new(
            RequestKind::IntradayBar,
            vec![Event::response(vec![Message::new(
                "IntradayBarResponse",
                json!({"barData": {"barTickData": ticks}}),
            )])],
        )
        .for_security(security)
    }

    fn gateway() -> ScriptedGateway {
        // Times are UTC; the session offset is zero.
        ScriptedGateway::new(Transcript::new(vec![
            members(),
            bars(
                "7203 JP Equity",
                &[
                    ("2024-03-21T09:00:00", 600),
                    ("2024-03-21T09:05:00", 400),
                    ("2024-03-22T09:00:00", 300),
                    ("2024-03-22T09:05:00", 700),
                ],
            ),
            bars(
                "6758 JP Equity",
                &[("2024-03-21T09:00:00", 50), ("2024-03-22T09:05:00", 150)],
            ),
        ]))
    }

    fn fetcher(gateway: &ScriptedGateway) -> Fetcher {
        Fetcher::new(
            Arc::new(gateway.clone()),
            SessionConfig::default().with_poll_timeout(Duration::from_millis(5)),
        )
    }

    fn request() -> CurveRequest {
        CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-22T15:00:00"), 2, 5)
    }

    #[test]
    fn test_window_skips_holiday() {
        let calendar = BusinessCalendar::new(JapanHolidays);
        let request = CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-21T15:00:00"), 2, 5);
        let window = request.window(&calendar).unwrap();
        // 2024-03-20 is the vernal equinox.
        assert_eq!(window.start, at("2024-03-19T09:00:00"));
        assert_eq!(window.end, at("2024-03-21T15:00:00"));
        assert_eq!(request.business_days(&calendar).unwrap().get(), 2);
    }

    #[test]
    fn test_single_day_window_is_the_end_date() {
        let calendar = BusinessCalendar::new(JapanHolidays);
        let request = CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-22T15:00:00"), 1, 5);
        assert_eq!(request.window(&calendar).unwrap().start, at("2024-03-22T09:00:00"));
        assert_eq!(request.business_days(&calendar).unwrap().get(), 1);
    }

    #[test]
    fn test_end_before_reference_hour_excludes_end_date() {
        let calendar = BusinessCalendar::new(JapanHolidays);
        let request = CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-22T08:00:00"), 2, 5);
        let window = request.window(&calendar).unwrap();
        assert_eq!(window.start, at("2024-03-19T09:00:00"));
        assert_eq!(request.business_days(&calendar).unwrap().get(), 2);

        // A weekend end date counts back from Friday.
        let weekend = CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-23T12:00:00"), 1, 5);
        assert_eq!(weekend.window(&calendar).unwrap().start, at("2024-03-22T09:00:00"));
        assert_eq!(weekend.business_days(&calendar).unwrap().get(), 1);
    }

    #[test]
    fn test_zero_days_rejected() {
        let calendar = BusinessCalendar::new(JapanHolidays);
        let request = CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-22T15:00:00"), 0, 5);
        assert!(matches!(request.window(&calendar), Err(VolcurveError::NoBusinessDays { .. })));
    }

    #[tokio::test]
    async fn test_volume_curve_basket() {
        let gateway = gateway();
        let mut fetched = Vec::new();
        let mut resolved = 0;
        let curve = volume_curve(&fetcher(&gateway), &request(), |p| match p {
            CurveProgress::Resolved(n) => resolved = n,
            CurveProgress::Fetched(security) => fetched.push(security.clone()),
        })
        .await
        .unwrap();

        assert_eq!(resolved, 2);
        assert_eq!(fetched.len(), 2);
        assert_eq!(curve.average.column_names().collect::<Vec<_>>(), vec!["7203", "6758"]);

        // Window 2024-03-21 09:00 .. 2024-03-22 15:00 holds two business days.
        assert_relative_eq!(curve.adv.get("7203").unwrap(), 1000.0);
        assert_relative_eq!(curve.adv.get("6758").unwrap(), 100.0);
        assert_relative_eq!(curve.average.get(0, "7203").unwrap(), 450.0);
        assert_relative_eq!(curve.cumulative.get(0, "7203").unwrap(), 0.45);
        assert_relative_eq!(curve.cumulative.get(1, "7203").unwrap(), 1.0);
        assert_relative_eq!(curve.cumulative.get(1, "6758").unwrap(), 1.0);

        // One session per request: members plus two bar fetches.
        assert_eq!(gateway.starts(), 3);
        assert_eq!(gateway.stops(), 3);
    }

    #[tokio::test]
    async fn test_single_day_adv_is_raw_volume() {
        let gateway = ScriptedGateway::new(Transcript::new(vec![
            members_of(&["7203 JP"]),
            bars(
                "7203 JP Equity",
                &[("2024-03-22T09:00:00", 600), ("2024-03-22T09:05:00", 400)],
            ),
        ]));
        let request = CurveRequest::new("NKY Index", EventType::Trade, at("2024-03-22T15:00:00"), 1, 5);
        let curve = volume_curve(&fetcher(&gateway), &request, |_| {}).await.unwrap();

        assert_relative_eq!(curve.adv.get("7203").unwrap(), 1000.0);
        assert_relative_eq!(curve.average.get(0, "7203").unwrap(), 600.0);
        assert_relative_eq!(curve.cumulative.get(0, "7203").unwrap(), 0.6);
    }

    #[tokio::test]
    async fn test_field_filter_without_volume() {
        let gateway = gateway();
        let result = volume_curve(&fetcher(&gateway), &request().with_fields(["OPEN"]), |_| {}).await;
        assert!(matches!(result, Err(VolcurveError::UnknownColumn(c)) if c == "VOLUME"));
        assert_eq!(gateway.starts(), 0);
    }

    #[tokio::test]
    async fn test_member_fetch_error_propagates() {
        let gateway = ScriptedGateway::new(Transcript::new(vec![members()]));
        let result = volume_curve(&fetcher(&gateway), &request(), |_| {}).await;
        assert!(matches!(result, Err(VolcurveError::Transport(_))));
        assert_eq!(gateway.starts(), gateway.stops());
    }
}
