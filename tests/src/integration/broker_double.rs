//! In-memory broker double.
//!
//! Stands in for the message broker so the call flow can be exercised
//! without a running broker process. Sessions created from it implement
//! [`BrokerSession`]; the test drives the worker side by receiving
//! published requests and delivering replies to the queue they name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use nub_rpc::{BrokerSession, ReplyDelivery, ReplyQueue, RpcError, REPLY_BUFFER_CAPACITY};
use nub_types::SnippetMessage;

/// A request observed on the in-memory request queue.
#[derive(Debug, Clone)]
pub struct PublishedRequest {
    /// Serialized envelope body.
    pub body: Vec<u8>,
    /// Correlation token attached to the request.
    pub correlation_id: String,
    /// Reply queue named by the request.
    pub reply_to: String,
}

#[derive(Default)]
struct BrokerState {
    reply_queues: HashMap<String, mpsc::Sender<Result<ReplyDelivery, RpcError>>>,
    queue_seq: u64,
    fail_next_publish: bool,
}

/// In-memory stand-in for the message broker.
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    published_tx: mpsc::UnboundedSender<PublishedRequest>,
    published_rx: mpsc::UnboundedReceiver<PublishedRequest>,
}

impl InMemoryBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        let (published_tx, published_rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(BrokerState::default())),
            published_tx,
            published_rx,
        }
    }

    /// Open a session against this broker.
    pub fn session(&self) -> InMemorySession {
        InMemorySession {
            state: Arc::clone(&self.state),
            published_tx: self.published_tx.clone(),
        }
    }

    /// Wait for the next request published to the request queue.
    pub async fn next_request(&mut self) -> PublishedRequest {
        self.published_rx
            .recv()
            .await
            .expect("a request should have been published")
    }

    /// Deliver a reply to the named reply queue.
    ///
    /// Returns false when the queue does not exist or its consumer is gone.
    pub fn deliver(&self, reply_to: &str, correlation_id: Option<&str>, body: &[u8]) -> bool {
        let state = self.state.lock().unwrap();
        let Some(tx) = state.reply_queues.get(reply_to) else {
            return false;
        };
        tx.try_send(Ok(ReplyDelivery {
            correlation_id: correlation_id.map(str::to_owned),
            body: body.to_vec(),
        }))
        .is_ok()
    }

    /// Simulate the channel dying: the named reply queue disappears and its
    /// consumer sees end-of-stream.
    pub fn drop_queue(&self, reply_to: &str) {
        self.state.lock().unwrap().reply_queues.remove(reply_to);
    }

    /// Reject the next publish with a publish error.
    pub fn fail_next_publish(&self) {
        self.state.lock().unwrap().fail_next_publish = true;
    }

    /// Number of reply queues whose consumer is still attached.
    pub fn live_consumer_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .reply_queues
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Session over the in-memory broker.
#[derive(Clone)]
pub struct InMemorySession {
    state: Arc<Mutex<BrokerState>>,
    published_tx: mpsc::UnboundedSender<PublishedRequest>,
}

#[async_trait]
impl BrokerSession for InMemorySession {
    async fn open_reply_queue(&self) -> Result<ReplyQueue, RpcError> {
        let (tx, rx) = mpsc::channel(REPLY_BUFFER_CAPACITY);

        let mut state = self.state.lock().unwrap();
        state.queue_seq += 1;
        let name = format!("amq.gen-{}", state.queue_seq);
        state.reply_queues.insert(name.clone(), tx);

        Ok(ReplyQueue::new(name, rx))
    }

    async fn publish(
        &self,
        snippet: &SnippetMessage,
        token: &str,
        reply_to: &str,
    ) -> Result<(), RpcError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_next_publish {
                state.fail_next_publish = false;
                return Err(RpcError::PublishError(
                    "request queue rejected the message".to_string(),
                ));
            }
        }

        let body =
            serde_json::to_vec(snippet).map_err(|e| RpcError::PublishError(e.to_string()))?;

        self.published_tx
            .send(PublishedRequest {
                body,
                correlation_id: token.to_owned(),
                reply_to: reply_to.to_owned(),
            })
            .map_err(|_| RpcError::ConnectivityLost)
    }

    async fn close(&self) {}
}
