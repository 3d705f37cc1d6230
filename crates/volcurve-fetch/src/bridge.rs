//! TCP transport to a gateway bridge process.
//!
//! The bridge hosts the vendor SDK and relays it as newline-delimited JSON.
//! The client writes one operation per line:
//!
//! ```text
//! {"op":"openService","service":"//blp/refdata"}
//! {"op":"sendRequest","request":{"requestType":"IntradayBarRequest","params":{...}}}
//! {"op":"stop"}
//! ```
//!
//! and reads one [`Event`] per line. After connecting, the bridge announces
//! `SessionStarted` or `SessionStartupFailure` in a `SESSION_STATUS` event;
//! `openService` is answered with `ServiceOpened` or `ServiceOpenFailure` in a
//! `SERVICE_STATUS` event.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, trace, warn};
use volcurve_types::SessionConfig;

use crate::{Event, EventKind, Gateway, Request, Session, SessionError};

/// Default time allowed for connecting and for the session handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SESSION_STARTED: &str = "SessionStarted";
const SESSION_STARTUP_FAILURE: &str = "SessionStartupFailure";
const SERVICE_OPENED: &str = "ServiceOpened";
const SERVICE_OPEN_FAILURE: &str = "ServiceOpenFailure";

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum Operation<'a> {
    OpenService { service: &'a str },
    SendRequest { request: &'a Request },
    Stop,
}

/// Gateway reached through a bridge process over TCP.
#[derive(Debug, Clone)]
pub struct BridgeGateway {
    connect_timeout: Duration,
}

impl Default for BridgeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeGateway {
    /// Creates a gateway with the default connect timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Sets the time allowed for connecting and the session handshake.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl Gateway for BridgeGateway {
    async fn start(&self, config: &SessionConfig) -> Result<Box<dyn Session>, SessionError> {
        let endpoint = config.endpoint();
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&endpoint))
            .await
            .map_err(|_| SessionError::Connection(format!("timed out connecting to {endpoint}")))?
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        debug!(%endpoint, "connected to bridge");

        let (reader, writer) = stream.into_split();
        let mut session = BridgeSession {
            reader: BufReader::new(reader),
            writer,
            buffer: Vec::new(),
            handshake_timeout: self.connect_timeout,
            stopped: false,
        };

        let started = session
            .await_status(EventKind::SessionStatus, SESSION_STARTED, SESSION_STARTUP_FAILURE)
            .await;
        match started {
            Ok(()) => Ok(Box::new(session)),
            Err(e) => {
                session.stop().await;
                Err(match e {
                    SessionError::Connection(_) => e,
                    other => SessionError::Connection(other.to_string()),
                })
            }
        }
    }
}

#[derive(Debug)]
struct BridgeSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    buffer: Vec<u8>,
    /// Bound on every status handshake, service opens included.
    handshake_timeout: Duration,
    stopped: bool,
}

impl BridgeSession {
    async fn send(&mut self, op: &Operation<'_>) -> Result<(), SessionError> {
        let mut line = serde_json::to_vec(op)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads one frame. The buffer survives a cancelled read, so a timeout
    /// never loses a partially received line.
    async fn read_event(&mut self) -> Result<Event, SessionError> {
        loop {
            let n = self.reader.read_until(b'\n', &mut self.buffer).await?;
            if n == 0 && !self.buffer.ends_with(b"\n") {
                return Err(SessionError::Closed);
            }
            if self.buffer.iter().all(u8::is_ascii_whitespace) {
                self.buffer.clear();
                continue;
            }
            let event = serde_json::from_slice(&self.buffer);
            self.buffer.clear();
            return Ok(event?);
        }
    }

    async fn await_status(
        &mut self,
        kind: EventKind,
        success: &str,
        failure: &str,
    ) -> Result<(), SessionError> {
        let timeout = self.handshake_timeout;
        tokio::time::timeout(timeout, self.read_status(kind, success, failure))
            .await
            .map_err(|_| SessionError::Connection(format!("no {success} within {timeout:?}")))?
    }

    async fn read_status(
        &mut self,
        kind: EventKind,
        success: &str,
        failure: &str,
    ) -> Result<(), SessionError> {
        loop {
            let event = self.read_event().await?;
            if event.kind != kind {
                trace!(kind = ?event.kind, "skipping event during handshake");
                continue;
            }
            if event.has_message(success) {
                return Ok(());
            }
            if let Some(message) = event.messages.iter().find(|m| m.message_type == failure) {
                return Err(SessionError::Connection(format!("{failure}: {}", message.body)));
            }
        }
    }
}

#[async_trait]
impl Session for BridgeSession {
    async fn open_service(&mut self, service: &str) -> Result<(), SessionError> {
        self.send(&Operation::OpenService { service }).await?;
        self.await_status(EventKind::ServiceStatus, SERVICE_OPENED, SERVICE_OPEN_FAILURE)
            .await
            .map_err(|e| match e {
                SessionError::Connection(reason) => {
                    debug!(service, %reason, "service open failed");
                    SessionError::ServiceUnavailable(service.to_string())
                }
                other => other,
            })
    }

    async fn send_request(&mut self, request: &Request) -> Result<(), SessionError> {
        self.send(&Operation::SendRequest { request }).await
    }

    async fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError> {
        match tokio::time::timeout(timeout, self.read_event()).await {
            Ok(event) => event,
            Err(_) => Ok(Event::timeout()),
        }
    }

    async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(e) = self.send(&Operation::Stop).await {
            warn!(error = %e, "failed to notify bridge of session stop");
        }
        if let Err(e) = self.writer.shutdown().await {
            trace!(error = %e, "shutdown after stop");
        }
    }
}
