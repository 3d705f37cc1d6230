//! Request execution against a gateway.

use std::sync::Arc;
use tracing::{debug, info};
use volcurve_types::{SessionConfig, VolcurveError};

use crate::{Gateway, Interrupt, Request, ResponseReducer, Session, poll_responses};

/// Issues requests through a gateway, one session per request.
///
/// Each call starts a session, opens the configured service, sends exactly
/// one request, polls until the final response and stops the session. The
/// session is stopped on every path once it has been started.
#[derive(Debug, Clone)]
pub struct Fetcher {
    gateway: Arc<dyn Gateway>,
    config: SessionConfig,
    interrupt: Interrupt,
}

impl Fetcher {
    /// Creates a fetcher for the given gateway and configuration.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, config: SessionConfig) -> Self {
        Self {
            gateway,
            config,
            interrupt: Interrupt::new(),
        }
    }

    /// Replaces the interrupt flag observed while polling.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns the interrupt flag.
    #[must_use]
    pub const fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Runs one request/response cycle, reducing the response with `reducer`.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::Connection`] if the session cannot be started,
    /// [`VolcurveError::ServiceUnavailable`] if the service cannot be opened,
    /// or any error raised while polling and reducing.
    pub async fn execute<R>(&self, request: Request, mut reducer: R) -> Result<R::Output, VolcurveError>
    where
        R: ResponseReducer + Send,
    {
        info!(
            request = %request.kind(),
            endpoint = %self.config.endpoint(),
            "starting session"
        );
        let mut session = self
            .gateway
            .start(&self.config)
            .await
            .map_err(|e| e.into_volcurve(&self.config))?;

        let result = self
            .exchange(session.as_mut(), &request, &mut reducer)
            .await;

        session.stop().await;
        debug!(request = %request.kind(), ok = result.is_ok(), "session stopped");

        result?;
        reducer.finish()
    }

    async fn exchange<R>(
        &self,
        session: &mut dyn Session,
        request: &Request,
        reducer: &mut R,
    ) -> Result<(), VolcurveError>
    where
        R: ResponseReducer + Send,
    {
        session
            .open_service(&self.config.service)
            .await
            .map_err(|e| e.into_volcurve(&self.config))?;
        session
            .send_request(request)
            .await
            .map_err(|e| e.into_volcurve(&self.config))?;
        debug!(request = %request.kind(), "request sent");

        poll_responses(session, self.config.poll_timeout, reducer, &self.interrupt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, EventKind, Exchange, Message, RequestKind, ScriptedGateway, Transcript};
    use serde_json::json;
    use std::time::Duration;

    /// Counts every message it sees.
    #[derive(Default)]
    struct Counter(usize);

    impl ResponseReducer for Counter {
        type Output = usize;

        fn accept(&mut self, _message: &Message) -> Result<(), VolcurveError> {
            self.0 += 1;
            Ok(())
        }

        fn finish(self) -> Result<usize, VolcurveError> {
            Ok(self.0)
        }
    }

    fn message() -> Message {
        Message::new("IntradayTickResponse", json!({"tickData": {"tickData": []}}))
    }

    fn fetcher(gateway: &ScriptedGateway) -> Fetcher {
        Fetcher::new(
            Arc::new(gateway.clone()),
            SessionConfig::default().with_poll_timeout(Duration::from_millis(5)),
        )
    }

    fn scripted(events: Vec<Event>) -> ScriptedGateway {
        ScriptedGateway::new(Transcript::new(vec![Exchange::new(
            RequestKind::IntradayTick,
            events,
        )]))
    }

    #[tokio::test]
    async fn test_partials_accumulate_until_final() {
        let gateway = scripted(vec![
            Event::timeout(),
            Event::partial(vec![message(), message()]),
            Event::partial(vec![message()]),
            Event::response(vec![message()]),
            // Never reached.
            Event::response(vec![message()]),
        ]);

        let count = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await
            .unwrap();

        assert_eq!(count, 4);
        assert_eq!(gateway.starts(), 1);
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_empty_final_response_completes() {
        let gateway = scripted(vec![Event::response(vec![])]);
        let count = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_connection_failure_never_starts() {
        let gateway = scripted(vec![]).refusing_connections();
        let result = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await;

        match result {
            Err(VolcurveError::Connection { host, port, .. }) => {
                assert_eq!(host, "localhost");
                assert_eq!(port, 8194);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(gateway.stops(), 0);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_stops_session() {
        let gateway = scripted(vec![Event::response(vec![])]).refusing_service();
        let result = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await;

        assert!(matches!(result, Err(VolcurveError::ServiceUnavailable(s)) if s == "//blp/refdata"));
        assert_eq!(gateway.stops(), 1);
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_response_error_stops_session() {
        let gateway = scripted(vec![Event::response(vec![Message::new(
            "IntradayTickResponse",
            json!({"responseError": {"category": "BAD_SEC", "message": "Unknown/Invalid security"}}),
        )])]);
        let result = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await;

        assert!(matches!(result, Err(VolcurveError::Response { category, .. }) if category == "BAD_SEC"));
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_session_terminated_is_transport_error() {
        let gateway = scripted(vec![Event::new(
            EventKind::SessionStatus,
            vec![Message::new(crate::SESSION_TERMINATED, json!({}))],
        )]);
        let result = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await;

        assert!(matches!(result, Err(VolcurveError::Transport(_))));
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_interrupt_stops_session() {
        // No final response: only the interrupt ends the poll.
        let gateway = scripted(vec![Event::partial(vec![message()])]);
        let interrupt = Interrupt::new();
        let fetcher = fetcher(&gateway).with_interrupt(interrupt.clone());

        let trigger = {
            let interrupt = interrupt.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                interrupt.trigger();
            })
        };

        let result = fetcher
            .execute(Request::new(RequestKind::IntradayTick), Counter::default())
            .await;
        trigger.await.unwrap();

        assert!(matches!(result, Err(VolcurveError::Interrupted)));
        assert_eq!(gateway.stops(), 1);
    }

    #[tokio::test]
    async fn test_unrecorded_request_stops_session() {
        let gateway = scripted(vec![]);
        let result = fetcher(&gateway)
            .execute(Request::new(RequestKind::IntradayBar), Counter::default())
            .await;

        assert!(matches!(result, Err(VolcurveError::Transport(_))));
        assert_eq!(gateway.starts(), 1);
        assert_eq!(gateway.stops(), 1);
    }
}
