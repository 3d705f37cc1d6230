//! Business-day calendars and intraday volume curves for volcurve.
//!
//! This crate provides:
//!
//! - [`BusinessCalendar`] - Weekday-minus-holiday arithmetic
//! - [`JapanHolidays`] / [`HolidaySet`] - Holiday sources
//! - [`build_curve`] - Bucket, average, normalise and fill a wide volume table
//! - [`volume_curve`] - Fetch an index basket and build its [`VolumeCurve`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/volcurve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod basket;
mod calendar;
mod curve;

pub use basket::{
    CurveProgress, CurveRequest, DEFAULT_LABEL_WIDTH, DEFAULT_REFERENCE_HOUR, volume_curve,
    volume_curve_with_calendar,
};
pub use calendar::{BusinessCalendar, HolidayCalendar, HolidaySet, JapanHolidays};
pub use curve::{VolumeCurve, build_curve, fill_gaps, shorten_labels};
