//! # RPC Call Driver
//!
//! The reply listener, correlator, and deadline governor combined into the
//! per-call state machine: race the deadline against the delivery stream,
//! discard strays, resolve exactly once.

use std::time::Duration;

use tracing::debug;

use nub_types::SnippetMessage;

use crate::config::BrokerConfig;
use crate::error::RpcError;
use crate::session::{AmqpSession, BrokerSession, ReplyQueue};
use crate::{token, DEFAULT_CALL_TIMEOUT, REQUEST_QUEUE, TOKEN_LENGTH};

/// Terminal states of one exchange. Exactly one is reached per call.
#[derive(Debug)]
enum CallOutcome {
    /// A reply carrying the expected correlation token arrived.
    Matched(String),

    /// The deadline elapsed before any matching reply.
    TimedOut,

    /// The session failed while publishing or waiting.
    Failed(RpcError),
}

/// Client running correlated request/reply calls against the snippet worker.
pub struct SnippetRpcClient {
    config: BrokerConfig,
    request_queue: String,
    call_timeout: Duration,
}

impl SnippetRpcClient {
    /// Create a client with the default request queue and deadline.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            request_queue: REQUEST_QUEUE.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Override the deadline bounding each publish-then-wait exchange.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Override the well-known request queue name.
    #[must_use]
    pub fn with_request_queue(mut self, name: impl Into<String>) -> Self {
        self.request_queue = name.into();
        self
    }

    /// The deadline applied to each call.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// The request queue calls are published to.
    #[must_use]
    pub fn request_queue(&self) -> &str {
        &self.request_queue
    }

    /// Run one exchange over a dedicated connection.
    ///
    /// Connects, performs the exchange, and releases the channel and
    /// connection on every exit path, success or failure.
    pub async fn call(&self, snippet: &SnippetMessage) -> Result<String, RpcError> {
        let session = AmqpSession::connect(&self.config, self.request_queue.clone()).await?;
        let result = self.call_with_session(&session, snippet).await;
        session.close().await;
        result
    }

    /// Run one exchange over a caller-managed session.
    ///
    /// The session stays open for further calls; the per-call reply queue
    /// and consumer are still torn down before returning.
    pub async fn call_with_session<S: BrokerSession>(
        &self,
        session: &S,
        snippet: &SnippetMessage,
    ) -> Result<String, RpcError> {
        // The reply queue exists and is consumed from before the request is
        // published, so an immediate reply cannot be lost.
        let mut reply_queue = session.open_reply_queue().await?;
        let correlation = token::generate(TOKEN_LENGTH);

        let outcome = self
            .run_exchange(session, snippet, &mut reply_queue, &correlation)
            .await;

        // Terminal either way: the consumer and queue are released before
        // the result is reported.
        reply_queue.close();

        match outcome {
            CallOutcome::Matched(body) => Ok(body),
            CallOutcome::TimedOut => Err(RpcError::Timeout {
                elapsed: self.call_timeout,
            }),
            CallOutcome::Failed(error) => Err(error),
        }
    }

    /// Drive one exchange to its single terminal state.
    async fn run_exchange<S: BrokerSession>(
        &self,
        session: &S,
        snippet: &SnippetMessage,
        reply_queue: &mut ReplyQueue,
        correlation: &str,
    ) -> CallOutcome {
        let deadline = tokio::time::sleep(self.call_timeout);
        tokio::pin!(deadline);

        // The publish is bounded by the same deadline as the wait, so a
        // stalled broker cannot hang the caller.
        tokio::select! {
            published = session.publish(snippet, correlation, reply_queue.name()) => {
                if let Err(error) = published {
                    return CallOutcome::Failed(error);
                }
            }
            () = &mut deadline => return CallOutcome::TimedOut,
        }

        debug!(correlation, "Request published, waiting for reply");

        // WAITING: race the deadline against the delivery stream until a
        // terminal state is reached. Returning drops the timer, so no
        // dangling wake-up outlives the call.
        loop {
            tokio::select! {
                () = &mut deadline => return CallOutcome::TimedOut,
                delivery = reply_queue.recv() => match delivery {
                    Some(Ok(reply)) if reply.matches(correlation) => {
                        return CallOutcome::Matched(
                            String::from_utf8_lossy(&reply.body).into_owned(),
                        );
                    }
                    Some(Ok(reply)) => {
                        // Stray delivery on an exclusive queue; discard it
                        // and keep waiting.
                        debug!(
                            correlation_id = ?reply.correlation_id,
                            "Discarding non-matching reply"
                        );
                    }
                    Some(Err(error)) => return CallOutcome::Failed(error),
                    None => return CallOutcome::Failed(RpcError::ConnectivityLost),
                },
            }
        }
    }
}
