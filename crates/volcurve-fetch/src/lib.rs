//! Gateway sessions and requests for the volcurve market-data client.
//!
//! This crate provides the request/response pipeline:
//!
//! - [`Gateway`] / [`Session`] - Transport abstraction, one request per session
//! - [`BridgeGateway`] - Newline-delimited JSON over TCP to a bridge process
//! - [`ScriptedGateway`] - Replays a recorded [`Transcript`]
//! - [`Fetcher`] - Runs a request and guarantees the session is stopped
//! - [`poll_responses`] - Partial/final response polling loop
//! - [`HistoricalRequest`], [`TickRequest`], [`BarRequest`], [`MembersRequest`] - Request builders

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/volcurve/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bars;
mod bridge;
mod client;
mod element;
mod event;
mod historical;
mod members;
mod reduce;
mod request;
mod scripted;
mod session;
mod ticks;

pub use bars::BarRequest;
pub use bridge::{BridgeGateway, DEFAULT_CONNECT_TIMEOUT};
pub use client::Fetcher;
pub use element::Element;
pub use event::{Event, EventKind, Message};
pub use historical::{FieldOverride, HistoricalData, HistoricalRequest, PeriodicityAdjustment};
pub use members::{DEFAULT_MEMBER_SUFFIX, INDEX_MEMBERS_FIELD, MembersRequest};
pub use reduce::{
    RESPONSE_ERROR, ResponseReducer, SESSION_TERMINATED, check_response_error, poll_responses,
};
pub use request::{Request, RequestKind};
pub use scripted::{Exchange, ScriptedGateway, Transcript};
pub use session::{Gateway, Interrupt, Session, SessionError};
pub use ticks::TickRequest;
