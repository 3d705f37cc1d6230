//! Core types for the volcurve market-data client.
//!
//! This crate provides the fundamental data structures used throughout volcurve:
//!
//! - [`SecurityId`] / [`FieldId`] - Opaque identifiers passed through to the gateway
//! - [`EventType`] - Intraday event type (trade, bid, ask, ...)
//! - [`DateRange`] / [`TimeRange`] - Request bounds
//! - [`SessionConfig`] - Gateway endpoint and local UTC offset
//! - [`Frame`] - Indexed table of nullable columns over a polars `DataFrame`
//! - [`TickTable`] / [`BarColumns`] - Column accumulators for intraday rows

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/volcurve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod date_range;
mod error;
mod event_type;
mod frame;
mod identifier;
mod rows;

pub use config::{
    DEFAULT_HOST, DEFAULT_PORT, REFDATA_SERVICE, SessionConfig, parse_utc_offset,
};
pub use date_range::{
    DATETIME_FORMAT, DateRange, GATEWAY_DATE_FORMAT, TimeRange, local_to_utc, parse_date,
    parse_datetime, utc_to_local,
};
pub use error::{Result, VolcurveError};
pub use event_type::{EventType, EventTypeParseError};
pub use frame::{Column, Frame, FrameKey, INDEX_COLUMN, Series};
pub use identifier::{FieldId, SecurityId};
pub use rows::{BarColumns, BarRow, TickRow, TickTable, bar_columns};
