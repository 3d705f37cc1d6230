//! Market-data gateway client and intraday volume curves.
//!
//! This is a facade crate that re-exports functionality from the volcurve
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use volcurve_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Fetcher::new(Arc::new(BridgeGateway::new()), SessionConfig::default());
//!
//!     let members = fetcher.index_members(&MembersRequest::new("NKY Index")).await?;
//!     println!("{} members", members.len());
//!
//!     let end = parse_datetime("2024-03-22T15:00:00")?;
//!     let request = CurveRequest::new("NKY Index", EventType::Trade, end, 20, 5);
//!     let curve = volume_curve(&fetcher, &request, |_| {}).await?;
//!     println!("{:?}", curve.adv);
//!
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/volcurve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use volcurve_types::*;

// Re-export session and request handling
#[cfg(feature = "fetch")]
pub use volcurve_fetch::{
    BarRequest, BridgeGateway, Element, Event, EventKind, Exchange, FieldOverride, Fetcher,
    Gateway, HistoricalData, HistoricalRequest, Interrupt, MembersRequest, Message,
    PeriodicityAdjustment, Request, RequestKind, ResponseReducer, ScriptedGateway, Session,
    SessionError, TickRequest, Transcript,
};

// Re-export calendars and curves
#[cfg(feature = "aggregate")]
pub use volcurve_aggregate::{
    BusinessCalendar, CurveProgress, CurveRequest, HolidayCalendar, HolidaySet, JapanHolidays,
    VolumeCurve, build_curve, volume_curve, volume_curve_with_calendar,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use volcurve_format::{
    CsvFormatter, FormatError, Formatter, IndexKey, JsonFormatter, JsonStyle, OutputFormat,
};

#[cfg(all(feature = "format", feature = "parquet"))]
pub use volcurve_format::ParquetFormatter;

/// Prelude module for convenient imports.
///
/// ```
/// use volcurve_lib::prelude::*;
/// ```
pub mod prelude {
    pub use volcurve_types::{
        DateRange, EventType, FieldId, Frame, Result, SecurityId, Series, SessionConfig,
        TickTable, TimeRange, VolcurveError, parse_date, parse_datetime,
    };

    #[cfg(feature = "fetch")]
    pub use volcurve_fetch::{
        BarRequest, BridgeGateway, Fetcher, HistoricalRequest, Interrupt, MembersRequest,
        ScriptedGateway, TickRequest, Transcript,
    };

    #[cfg(feature = "aggregate")]
    pub use volcurve_aggregate::{CurveRequest, JapanHolidays, VolumeCurve, volume_curve};

    #[cfg(feature = "format")]
    pub use volcurve_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};

    #[cfg(all(feature = "format", feature = "parquet"))]
    pub use volcurve_format::ParquetFormatter;
}
