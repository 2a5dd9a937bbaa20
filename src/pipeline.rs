//! Wires the order service, outbox relay, broker and both consumers.
//!
//! ```text
//! OrderService::create ─► outbox ─► RelayWorker ─► Broker ─┬─► DeductItemsHandler
//!                                                           └─► SendNotificationHandler
//! ```

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::broker::{Broker, ConsumerHandle, ConsumerStats, SubscribeError};
use crate::config::Settings;
use crate::inventory::{DeductItemsHandler, InventoryService, DEDUCT_ITEMS_TOPIC};
use crate::notification::{
    LogNotifier, NotificationService, Notifier, SendNotificationHandler, SEND_NOTIFICATION_TOPIC,
};
use crate::order::{InMemoryOrderRepository, OrderService};
use crate::outbox::{OutboxRelay, RelayWorker, RetryForever, RetryPolicy, WorkerStats};
use crate::repository::HashMapRepository;
use crate::trace::Tracer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to subscribe consumer: {0}")]
    Subscribe(#[from] SubscribeError),

    #[error("failed to spawn relay worker: {0}")]
    Spawn(#[from] io::Error),
}

/// Final counters from every background thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub relay: WorkerStats,
    /// Keyed by topic.
    pub consumers: BTreeMap<String, ConsumerStats>,
}

impl ShutdownReport {
    pub fn consumer(&self, topic: &str) -> Option<&ConsumerStats> {
        self.consumers.get(topic)
    }
}

pub struct PipelineBuilder {
    poll_interval: Duration,
    retry: Box<dyn RetryPolicy>,
    tracer: Option<Tracer>,
    notifier: Option<Box<dyn Notifier>>,
    service_name: String,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            poll_interval: settings.relay.poll_interval(),
            retry: Box::new(RetryForever),
            tracer: None,
            notifier: None,
            service_name: settings.service_name,
        }
    }
}

impl PipelineBuilder {
    /// Take the relay interval, retry policy and service name from
    /// `settings`.
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.poll_interval = settings.relay.poll_interval();
        self.retry = settings.relay.retry_policy();
        self.service_name = settings.service_name.clone();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Box::new(policy);
        self
    }

    /// Tracer shared by every component. Defaults to an unrecorded tracer
    /// named after the service.
    pub fn tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Build every component, subscribe both consumers, then start the
    /// relay.
    pub fn start(self) -> Result<Pipeline, PipelineError> {
        let tracer = self.tracer.unwrap_or_else(|| Tracer::new(self.service_name));
        let broker = Broker::new();
        let repo = InMemoryOrderRepository::new();

        let orders = OrderService::new(repo.clone(), tracer.clone());
        let inventory = InventoryService::new(HashMapRepository::new(), tracer.clone());
        let notifications = match self.notifier {
            Some(notifier) => NotificationService::new(notifier, tracer.clone()),
            None => NotificationService::new(LogNotifier::new(), tracer.clone()),
        };

        let consumers = vec![
            broker.spawn_consumer(
                DEDUCT_ITEMS_TOPIC,
                DeductItemsHandler::new(inventory.clone(), tracer.clone()),
            )?,
            broker.spawn_consumer(
                SEND_NOTIFICATION_TOPIC,
                SendNotificationHandler::new(notifications.clone(), tracer.clone()),
            )?,
        ];

        let relay = OutboxRelay::new(repo, broker.clone()).with_boxed_retry_policy(self.retry);
        let worker = match RelayWorker::start(relay, self.poll_interval) {
            Ok(worker) => worker,
            Err(e) => {
                broker.close();
                for consumer in consumers {
                    consumer.join();
                }
                return Err(e.into());
            }
        };

        info!(topics = ?broker.topics(), "pipeline started");
        Ok(Pipeline {
            orders,
            inventory,
            notifications,
            broker,
            worker: Some(worker),
            consumers,
        })
    }
}

/// A running order pipeline. Dropping it without [`Pipeline::shutdown`]
/// signals the relay and closes the broker without waiting.
pub struct Pipeline {
    orders: OrderService<InMemoryOrderRepository>,
    inventory: InventoryService,
    notifications: NotificationService,
    broker: Broker,
    worker: Option<RelayWorker>,
    consumers: Vec<ConsumerHandle>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn orders(&self) -> &OrderService<InMemoryOrderRepository> {
        &self.orders
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.inventory
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// The order repository, which also stores the outbox.
    pub fn outbox(&self) -> &InMemoryOrderRepository {
        self.orders.repository()
    }

    /// Signal the relay, close the broker, then wait for the relay and both
    /// consumers.
    ///
    /// Closing before joining releases a relay blocked on a topic nobody
    /// consumes; that record stays pending. A record the relay already
    /// handed to a consumer is still processed before the consumer exits.
    pub fn shutdown(mut self) -> ShutdownReport {
        let worker = self.worker.take();
        if let Some(worker) = &worker {
            worker.signal_stop();
        }
        self.broker.close();
        let relay = worker.map(RelayWorker::stop).unwrap_or_default();

        let consumers = self
            .consumers
            .drain(..)
            .map(|consumer| {
                let topic = consumer.topic().to_string();
                (topic, consumer.join())
            })
            .collect();

        let report = ShutdownReport { relay, consumers };
        info!(
            published = report.relay.published,
            ticks = report.relay.ticks,
            "pipeline stopped"
        );
        report
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.signal_stop();
        }
        self.broker.close();
    }
}
