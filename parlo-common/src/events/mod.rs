use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use tokio::sync::{broadcast, mpsc};

pub const SUBJECT_USER_DELETE: &str = "user.delete";
pub const SUBJECT_USER_DELETE_CANCEL: &str = "user.delete.cancel";

#[derive(Debug, Clone)]
pub struct Event {
    pub subject: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub enum EventBusError {
    ConnectionFailed(String),
    PublishFailed(String),
}

impl std::error::Error for EventBusError {}

impl fmt::Display for EventBusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventBusError::ConnectionFailed(e) => {
                write!(f, "EventBusError: Connection failed: {e}")
            }
            EventBusError::PublishFailed(e) => {
                write!(f, "EventBusError: Publish failed: {e}")
            }
        }
    }
}

pub struct Subscription {
    receiver: mpsc::Receiver<Event>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

/// Publish/subscribe on named subjects. Delivery guarantees (at-least-once,
/// redelivery) are a property of the broker deployment, so consumers must be
/// idempotent regardless of the implementation behind this trait.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: Event) -> Result<(), EventBusError>;
    async fn subscribe(&self, subject: &str) -> Result<Subscription, EventBusError>;
}

pub struct RedisEventBus {
    client: redis::Client,
    connection: ConnectionManager,
}

impl RedisEventBus {
    pub async fn connect(redis_uri: &str) -> Result<Self, EventBusError> {
        let client = redis::Client::open(redis_uri)
            .map_err(|e| EventBusError::ConnectionFailed(e.to_string()))?;
        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| EventBusError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, connection })
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, event: Event) -> Result<(), EventBusError> {
        let mut connection = self.connection.clone();
        connection
            .publish::<_, _, ()>(event.subject.as_str(), event.data)
            .await
            .map_err(|e| EventBusError::PublishFailed(e.to_string()))
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, EventBusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| EventBusError::ConnectionFailed(e.to_string()))?;
        pubsub
            .subscribe(subject)
            .await
            .map_err(|e| EventBusError::ConnectionFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(128);
        tokio::spawn(async move {
            let mut message_stream = pubsub.on_message();
            while let Some(message) = message_stream.next().await {
                let event = Event {
                    subject: message.get_channel_name().to_string(),
                    data: message.get_payload_bytes().to_vec(),
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription { receiver: rx })
    }
}

/// Single-process bus used by tests and local wiring where no broker is
/// deployed.
pub struct InProcessBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(128);
        Self { sender }
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InProcessBus {
    async fn publish(&self, event: Event) -> Result<(), EventBusError> {
        // A broadcast with no subscribers is not a failure
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, EventBusError> {
        let mut broadcast_receiver = self.sender.subscribe();
        let subject = subject.to_string();

        let (tx, rx) = mpsc::channel(128);
        tokio::spawn(async move {
            loop {
                match broadcast_receiver.recv().await {
                    Ok(event) if event.subject == subject => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription { receiver: rx })
    }
}
