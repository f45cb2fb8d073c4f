//! # Broker Session
//!
//! Owns the connection and channel to the message broker for one call (or a
//! caller-managed batch of calls) and declares the exclusive per-call reply
//! queue.
//!
//! The [`BrokerSession`] trait is the seam between the call driver and the
//! transport; [`AmqpSession`] is the production implementation speaking
//! AMQP 0.9.1.

use async_trait::async_trait;
use lapin::options::{
    BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use nub_types::SnippetMessage;

use crate::config::BrokerConfig;
use crate::error::RpcError;
use crate::{token, REPLY_BUFFER_CAPACITY};

/// One message delivered to a reply queue.
#[derive(Debug, Clone)]
pub struct ReplyDelivery {
    /// Correlation token echoed by the worker, if any.
    pub correlation_id: Option<String>,

    /// Raw reply body.
    pub body: Vec<u8>,
}

impl ReplyDelivery {
    /// Whether this delivery answers the call identified by `token`.
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        self.correlation_id.as_deref() == Some(token)
    }
}

/// Handle to one exclusive, auto-delete reply queue.
///
/// Owned by exactly one in-flight call and never reused. Consuming the
/// handle closes the delivery stream, which detaches the consumer; the
/// broker deletes the queue once its consumer is gone.
pub struct ReplyQueue {
    name: String,
    inbound: mpsc::Receiver<Result<ReplyDelivery, RpcError>>,
}

impl ReplyQueue {
    /// Wrap a broker-assigned queue name and its delivery stream.
    #[must_use]
    pub fn new(name: String, inbound: mpsc::Receiver<Result<ReplyDelivery, RpcError>>) -> Self {
        Self { name, inbound }
    }

    /// Broker-assigned queue name, used as the reply-to address.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive the next delivery.
    ///
    /// `Some(Err(..))` reports a consumer failure; `None` means the channel
    /// or connection is gone.
    pub async fn recv(&mut self) -> Option<Result<ReplyDelivery, RpcError>> {
        self.inbound.recv().await
    }

    /// Release the queue's consumer.
    pub fn close(self) {
        drop(self);
    }
}

/// Transport seam between the call driver and the broker.
///
/// A session may serve one call or be reused for several; each call's reply
/// queue stays independent either way.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Declare the per-call reply queue and start consuming from it.
    ///
    /// Consumption begins before the request is published so no reply can
    /// be lost in between.
    async fn open_reply_queue(&self) -> Result<ReplyQueue, RpcError>;

    /// Serialize the snippet and publish it to the well-known request
    /// queue, tagged with the correlation token and the reply queue address.
    async fn publish(
        &self,
        snippet: &SnippetMessage,
        token: &str,
        reply_to: &str,
    ) -> Result<(), RpcError>;

    /// Release the channel and connection. Idempotent.
    async fn close(&self);
}

/// Production broker session speaking AMQP 0.9.1.
pub struct AmqpSession {
    connection: Connection,
    channel: Channel,
    request_queue: String,
}

impl AmqpSession {
    /// Establish one connection and one channel to the broker described by
    /// `config`, publishing requests to `request_queue`.
    pub async fn connect(
        config: &BrokerConfig,
        request_queue: impl Into<String>,
    ) -> Result<Self, RpcError> {
        let uri = config.amqp_uri();

        let connection = Connection::connect(&uri, ConnectionProperties::default())
            .await
            .map_err(|e| RpcError::BrokerUnavailable(e.to_string()))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| RpcError::BrokerUnavailable(e.to_string()))?;

        debug!(host = %config.host, port = config.port, "Connected to broker");

        Ok(Self {
            connection,
            channel,
            request_queue: request_queue.into(),
        })
    }
}

#[async_trait]
impl BrokerSession for AmqpSession {
    async fn open_reply_queue(&self) -> Result<ReplyQueue, RpcError> {
        // Broker-assigned name, exclusive to this channel, deleted once the
        // consumer detaches.
        let queue = self
            .channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    durable: false,
                    exclusive: true,
                    auto_delete: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| RpcError::ChannelError(e.to_string()))?;

        let queue_name = queue.name().as_str().to_owned();
        let consumer_tag = format!("nub-{}", token::generate(8));

        // Auto-ack is acceptable: the queue is exclusive and short-lived, so
        // redelivery after a crash is not a concern this design addresses.
        let mut consumer = self
            .channel
            .basic_consume(
                &queue_name,
                &consumer_tag,
                BasicConsumeOptions {
                    no_ack: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| RpcError::ChannelError(e.to_string()))?;

        let (tx, rx) = mpsc::channel(REPLY_BUFFER_CAPACITY);
        let channel = self.channel.clone();

        // Pump deliveries into the call's handle until the call resolves or
        // the consumer stream dies.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tx.closed() => break,
                    next = consumer.next() => match next {
                        Some(Ok(delivery)) => {
                            let reply = ReplyDelivery {
                                correlation_id: delivery
                                    .properties
                                    .correlation_id()
                                    .as_ref()
                                    .map(|id| id.as_str().to_owned()),
                                body: delivery.data,
                            };
                            if tx.send(Ok(reply)).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Reply consumer failed");
                            let _ = tx.send(Err(RpcError::ConnectivityLost)).await;
                            break;
                        }
                        None => break,
                    },
                }
            }

            // Detach the consumer proactively rather than leaving the queue
            // for the broker's idle cleanup.
            let _ = channel
                .basic_cancel(&consumer_tag, BasicCancelOptions::default())
                .await;
        });

        debug!(queue = %queue_name, "Reply queue declared");

        Ok(ReplyQueue::new(queue_name, rx))
    }

    async fn publish(
        &self,
        snippet: &SnippetMessage,
        token: &str,
        reply_to: &str,
    ) -> Result<(), RpcError> {
        let body =
            serde_json::to_vec(snippet).map_err(|e| RpcError::PublishError(e.to_string()))?;

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_correlation_id(token.into())
            .with_reply_to(reply_to.into());

        self.channel
            .basic_publish(
                "",
                &self.request_queue,
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await
            .map_err(|e| RpcError::PublishError(e.to_string()))?
            .await
            .map_err(|e| RpcError::PublishError(e.to_string()))?;

        debug!(queue = %self.request_queue, reply_to, "Request published");
        Ok(())
    }

    async fn close(&self) {
        // Best-effort on both so the teardown path is idempotent.
        let _ = self.channel.close(200, "call finished").await;
        let _ = self.connection.close(200, "call finished").await;
    }
}
