//! Gateway and session abstractions.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use volcurve_types::{SessionConfig, VolcurveError};

use crate::{Event, Request};

/// Errors raised by a gateway transport.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The session could not be started.
    #[error("{0}")]
    Connection(String),

    /// The service could not be opened.
    #[error("service {0} unavailable")]
    ServiceUnavailable(String),

    /// The gateway closed the session.
    #[error("session closed by gateway")]
    Closed,

    /// The gateway sent something this client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// Converts into the crate-level error, attaching the endpoint to
    /// connection failures.
    #[must_use]
    pub fn into_volcurve(self, config: &SessionConfig) -> VolcurveError {
        match self {
            Self::Connection(reason) => VolcurveError::Connection {
                host: config.host.clone(),
                port: config.port,
                reason,
            },
            Self::ServiceUnavailable(service) => VolcurveError::ServiceUnavailable(service),
            Self::Json(e) => VolcurveError::Json(e),
            Self::Io(e) => VolcurveError::Io(e),
            other => VolcurveError::Transport(other.to_string()),
        }
    }
}

/// Entry point to a market-data gateway.
#[async_trait]
pub trait Gateway: Send + Sync + std::fmt::Debug {
    /// Starts a session against the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Connection`] if the session cannot be started.
    async fn start(&self, config: &SessionConfig) -> Result<Box<dyn Session>, SessionError>;
}

/// One started session.
///
/// A session carries exactly one request/response cycle and must be stopped
/// once the caller is done with it.
#[async_trait]
pub trait Session: Send {
    /// Opens a service.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ServiceUnavailable`] if the service cannot be
    /// opened.
    async fn open_service(&mut self, service: &str) -> Result<(), SessionError>;

    /// Sends a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    async fn send_request(&mut self, request: &Request) -> Result<(), SessionError>;

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns a [`crate::EventKind::Timeout`] event if nothing arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    async fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError>;

    /// Stops the session.
    async fn stop(&mut self);
}

/// Cancellation flag observed between event polls.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the call in progress.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
