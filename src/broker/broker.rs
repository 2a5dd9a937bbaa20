use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;

use tracing::{debug, info, trace};

use super::consumer::{ConsumerHandle, ConsumerStats, Subscription};
use super::error::{PublishError, SubscribeError};
use super::handler::MessageHandler;
use super::publisher::Publisher;

/// One topic: a rendezvous channel plus its not-yet-claimed reader.
///
/// The reader sits behind a `Mutex` so the registry stays `Sync`.
struct Topic {
    sender: SyncSender<Vec<u8>>,
    receiver: Option<Mutex<Receiver<Vec<u8>>>>,
}

impl Topic {
    fn new() -> Self {
        let (sender, receiver) = sync_channel(0);
        Self {
            sender,
            receiver: Some(Mutex::new(receiver)),
        }
    }
}

#[derive(Default)]
struct Registry {
    topics: HashMap<String, Topic>,
    closed: bool,
}

/// Topic-addressed in-process broker.
///
/// - Each topic is created once, lazily, by whichever of `publish` or
///   `subscribe` names it first.
/// - Delivery is an unbuffered hand-off: `publish` returns only after the
///   topic's reader has taken the payload.
/// - Each topic has at most one reader.
///
/// Clones share the same topic registry.
///
/// ## Example
///
/// ```
/// use order_outbox::broker::Broker;
///
/// let broker = Broker::new();
/// let subscription = broker.subscribe("greetings").unwrap();
///
/// let publisher = broker.clone();
/// let producer = std::thread::spawn(move || publisher.publish("greetings", b"hi".to_vec()));
///
/// assert_eq!(subscription.recv(), Some(b"hi".to_vec()));
/// producer.join().unwrap().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct Broker {
    registry: Arc<RwLock<Registry>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> Result<SyncSender<Vec<u8>>, PublishError> {
        {
            let registry = self
                .registry
                .read()
                .map_err(|_| PublishError::LockPoisoned("topic lookup"))?;
            if registry.closed {
                return Err(PublishError::BrokerClosed);
            }
            if let Some(topic) = registry.topics.get(topic) {
                return Ok(topic.sender.clone());
            }
        }

        let mut registry = self
            .registry
            .write()
            .map_err(|_| PublishError::LockPoisoned("topic create"))?;
        if registry.closed {
            return Err(PublishError::BrokerClosed);
        }
        let entry = registry.topics.entry(topic.to_string()).or_insert_with(|| {
            debug!(topic, "topic created by publisher");
            Topic::new()
        });
        Ok(entry.sender.clone())
    }

    /// Hand `payload` to the reader of `topic`, blocking until it is taken.
    ///
    /// The registry lock is released before the hand-off, so a slow consumer
    /// only throttles publishers of its own topic.
    pub fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let sender = self.sender(topic)?;
        trace!(topic, bytes = payload.len(), "publishing");
        sender
            .send(payload)
            .map_err(|_| PublishError::TopicClosed(topic.to_string()))
    }

    /// Claim the sole reader of `topic`.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription, SubscribeError> {
        let mut registry = self
            .registry
            .write()
            .map_err(|_| SubscribeError::LockPoisoned("subscribe"))?;
        if registry.closed {
            return Err(SubscribeError::BrokerClosed);
        }
        let entry = registry
            .topics
            .entry(topic.to_string())
            .or_insert_with(Topic::new);
        let receiver = entry
            .receiver
            .take()
            .ok_or_else(|| SubscribeError::AlreadyConsumed(topic.to_string()))?
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        debug!(topic, "topic subscribed");
        Ok(Subscription::new(topic.to_string(), receiver))
    }

    /// Subscribe to `topic` and run `handler` on the calling thread until the
    /// broker is closed.
    pub fn consume<H: MessageHandler>(
        &self,
        topic: &str,
        handler: H,
    ) -> Result<ConsumerStats, SubscribeError> {
        Ok(self.subscribe(topic)?.run(handler))
    }

    /// Subscribe to `topic` now and run `handler` on a dedicated thread.
    pub fn spawn_consumer<H>(&self, topic: &str, handler: H) -> Result<ConsumerHandle, SubscribeError>
    where
        H: MessageHandler + 'static,
    {
        let subscription = self.subscribe(topic)?;
        let handle = thread::Builder::new()
            .name(format!("consumer-{topic}"))
            .spawn(move || subscription.run(handler))?;
        Ok(ConsumerHandle::new(topic.to_string(), handle))
    }

    /// Drop every topic channel.
    ///
    /// Running consumer loops finish once in-flight hand-offs complete;
    /// publishers blocked on a topic nobody subscribed to fail with
    /// [`PublishError::TopicClosed`]; later calls fail with `BrokerClosed`.
    pub fn close(&self) {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        if registry.closed {
            return;
        }
        registry.closed = true;
        let topics = std::mem::take(&mut registry.topics);
        drop(registry);

        info!(topics = topics.len(), "broker closed");
        drop(topics);
    }

    pub fn is_closed(&self) -> bool {
        self.registry
            .read()
            .map(|registry| registry.closed)
            .unwrap_or(true)
    }

    /// Names of all known topics, sorted.
    pub fn topics(&self) -> Vec<String> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = registry.topics.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Publisher for Broker {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        Broker::publish(self, topic, payload)
    }
}
