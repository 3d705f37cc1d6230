//! Response polling loop.

use std::time::Duration;
use tracing::{debug, trace};
use volcurve_types::VolcurveError;

use crate::{EventKind, Interrupt, Message, Session};

/// Element carrying a request-level error from the gateway.
pub const RESPONSE_ERROR: &str = "responseError";

/// Status message announcing that the gateway dropped the session.
pub const SESSION_TERMINATED: &str = "SessionTerminated";

/// Accumulates response messages into a typed result.
pub trait ResponseReducer {
    /// Result produced once the final response arrived.
    type Output;

    /// Consumes one message of a partial or final response event.
    ///
    /// # Errors
    ///
    /// Returns an error if an expected element is missing or mistyped.
    fn accept(&mut self, message: &Message) -> Result<(), VolcurveError>;

    /// Produces the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the accumulated columns cannot be assembled.
    fn finish(self) -> Result<Self::Output, VolcurveError>;
}

/// Fails with [`VolcurveError::Response`] if the message carries a
/// `responseError` element.
///
/// # Errors
///
/// Returns the gateway-reported error, or a lookup error if the payload is
/// malformed.
pub fn check_response_error(message: &Message) -> Result<(), VolcurveError> {
    let Some(error) = message.root().try_element(RESPONSE_ERROR) else {
        return Ok(());
    };
    Err(VolcurveError::Response {
        category: error.element_as_str("category")?.to_string(),
        message: error.element_as_str("message")?.to_string(),
    })
}

/// Polls `session` until a final response event arrives, feeding every
/// response message to `reducer`.
///
/// The interrupt flag is checked before each poll. There is no overall
/// deadline.
///
/// # Errors
///
/// Returns the first reducer, gateway or transport error, or
/// [`VolcurveError::Interrupted`].
pub async fn poll_responses<R: ResponseReducer + ?Sized>(
    session: &mut dyn Session,
    timeout: Duration,
    reducer: &mut R,
    interrupt: &Interrupt,
) -> Result<(), VolcurveError> {
    let mut partials = 0usize;
    loop {
        if interrupt.is_set() {
            return Err(VolcurveError::Interrupted);
        }

        let event = session
            .next_event(timeout)
            .await
            .map_err(|e| VolcurveError::Transport(e.to_string()))?;

        match event.kind {
            EventKind::PartialResponse | EventKind::Response => {
                debug!(kind = ?event.kind, messages = event.messages.len(), "response event");
                for message in &event.messages {
                    check_response_error(message)?;
                    reducer.accept(message)?;
                }
            }
            EventKind::SessionStatus if event.has_message(SESSION_TERMINATED) => {
                return Err(VolcurveError::Transport("session terminated".to_string()));
            }
            EventKind::Timeout => trace!("poll timeout"),
            kind => debug!(?kind, "ignoring event"),
        }

        if event.is_final() {
            debug!(partials, "response complete");
            return Ok(());
        }
        if event.kind == EventKind::PartialResponse {
            partials += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_response_error() {
        let ok = Message::new("IntradayTickResponse", json!({"tickData": {}}));
        assert!(check_response_error(&ok).is_ok());

        let failed = Message::new(
            "IntradayTickResponse",
            json!({"responseError": {"category": "BAD_SEC", "message": "Unknown/Invalid security"}}),
        );
        match check_response_error(&failed) {
            Err(VolcurveError::Response { category, message }) => {
                assert_eq!(category, "BAD_SEC");
                assert_eq!(message, "Unknown/Invalid security");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_response_error() {
        let failed = Message::new("IntradayTickResponse", json!({"responseError": {}}));
        assert!(matches!(
            check_response_error(&failed),
            Err(VolcurveError::MissingElement(_))
        ));
    }
}
