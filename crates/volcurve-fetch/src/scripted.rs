//! Gateway that replays recorded transcripts.
//!
//! A [`Transcript`] lists request/response exchanges. When a request is sent,
//! the first exchange whose request kind (and security, if given) matches is
//! queued and its events are delivered one per poll. Polls on an empty queue
//! wait for the timeout and return a timeout event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;
use volcurve_types::{SessionConfig, VolcurveError};

use crate::{Event, Gateway, Request, RequestKind, Session, SessionError};

/// One recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Request operation this exchange answers.
    pub request: RequestKind,
    /// Security the request must mention, if any.
    #[serde(default)]
    pub security: Option<String>,
    /// Events delivered in order.
    pub events: Vec<Event>,
}

impl Exchange {
    /// Creates an exchange answering any request of the given kind.
    #[must_use]
    pub const fn new(request: RequestKind, events: Vec<Event>) -> Self {
        Self {
            request,
            security: None,
            events,
        }
    }

    /// Restricts the exchange to requests mentioning `security`.
    #[must_use]
    pub fn for_security(mut self, security: impl Into<String>) -> Self {
        self.security = Some(security.into());
        self
    }

    fn matches(&self, request: &Request) -> bool {
        self.request == request.kind()
            && self.security.as_deref().is_none_or(|sec| {
                request.mentions("security", sec) || request.mentions("securities", sec)
            })
    }
}

/// Recorded exchanges replayed by [`ScriptedGateway`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Exchanges in lookup order.
    pub exchanges: Vec<Exchange>,
}

impl Transcript {
    /// Creates a transcript from exchanges.
    #[must_use]
    pub const fn new(exchanges: Vec<Exchange>) -> Self {
        Self { exchanges }
    }

    /// Parses a transcript from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, VolcurveError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a transcript from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VolcurveError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    starts: usize,
    stops: usize,
    requests: Vec<Request>,
}

/// Gateway replaying a [`Transcript`].
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    transcript: Arc<Transcript>,
    state: Arc<Mutex<ScriptState>>,
    refuse_start: bool,
    refuse_service: bool,
}

impl ScriptedGateway {
    /// Creates a gateway replaying the given transcript.
    #[must_use]
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript: Arc::new(transcript),
            ..Default::default()
        }
    }

    /// Makes every session start fail.
    #[must_use]
    pub const fn refusing_connections(mut self) -> Self {
        self.refuse_start = true;
        self
    }

    /// Makes every service open fail.
    #[must_use]
    pub const fn refusing_service(mut self) -> Self {
        self.refuse_service = true;
        self
    }

    /// Number of sessions started.
    #[must_use]
    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    /// Number of sessions stopped.
    #[must_use]
    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    /// Requests sent so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn start(&self, config: &SessionConfig) -> Result<Box<dyn Session>, SessionError> {
        if self.refuse_start {
            return Err(SessionError::Connection(format!(
                "connection refused by {}",
                config.endpoint()
            )));
        }
        self.lock().starts += 1;
        Ok(Box::new(ScriptedSession {
            gateway: self.clone(),
            queue: VecDeque::new(),
            stopped: false,
        }))
    }
}

#[derive(Debug)]
struct ScriptedSession {
    gateway: ScriptedGateway,
    queue: VecDeque<Event>,
    stopped: bool,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn open_service(&mut self, service: &str) -> Result<(), SessionError> {
        if self.gateway.refuse_service {
            return Err(SessionError::ServiceUnavailable(service.to_string()));
        }
        Ok(())
    }

    async fn send_request(&mut self, request: &Request) -> Result<(), SessionError> {
        self.gateway.lock().requests.push(request.clone());
        let exchange = self
            .gateway
            .transcript
            .exchanges
            .iter()
            .find(|x| x.matches(request));
        match exchange {
            Some(exchange) => {
                debug!(request = %request.kind(), events = exchange.events.len(), "replaying exchange");
                self.queue.extend(exchange.events.iter().cloned());
                Ok(())
            }
            None => Err(SessionError::Protocol(format!(
                "no recorded exchange for {}",
                request.kind()
            ))),
        }
    }

    async fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError> {
        match self.queue.pop_front() {
            Some(event) => Ok(event),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(Event::timeout())
            }
        }
    }

    async fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.gateway.lock().stops += 1;
        }
    }
}
