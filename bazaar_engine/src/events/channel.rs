//! Fire-and-forget notification fan-out.
//!
//! The engine publishes a [`Notification`] after every committed transition. Each transport
//! (websocket room broadcaster, email digester, test collector) attaches a handler to its own
//! [`NotificationChannel`]; the engine holds one [`NotificationProducer`] per channel and knows
//! nothing about the transports themselves.
//!
//! Handlers are async but stateless with respect to the engine: all they receive is the
//! notification.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::sync::mpsc;

use crate::events::Notification;

pub type Handler = Arc<dyn Fn(Notification) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct NotificationChannel {
    listener: mpsc::Receiver<Notification>,
    sender: mpsc::Sender<Notification>,
    handler: Handler,
}

impl NotificationChannel {
    pub fn new(buffer_size: usize, handler: Handler) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> NotificationProducer {
        NotificationProducer::new(self.sender.clone())
    }

    /// Runs the channel until every producer has been dropped.
    pub async fn start_handler(mut self) {
        debug!("📬️ Notification channel started");
        // Drop the internal sender so the channel shuts down when the last producer goes away.
        drop(self.sender);
        while let Some(notification) = self.listener.recv().await {
            trace!("📬️ Delivering '{}' to {}", notification.event, notification.audience);
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                (handler)(notification).await;
            });
        }
        debug!("📬️ Notification channel shut down");
    }
}

#[derive(Clone)]
pub struct NotificationProducer {
    sender: mpsc::Sender<Notification>,
}

impl NotificationProducer {
    pub fn new(sender: mpsc::Sender<Notification>) -> Self {
        Self { sender }
    }

    /// Creates a producer wired straight to a receiver. Used by tests to observe emissions
    /// without standing up a handler task.
    pub fn pair(buffer_size: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { sender }, receiver)
    }

    pub async fn publish(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification).await {
            // Best effort only. The transition this notification belongs to has already
            // committed.
            error!("📬️ Failed to publish notification: {e}");
        }
    }
}

/// The set of producers the order flow API publishes to, one per attached transport.
#[derive(Default, Clone)]
pub struct NotificationProducers {
    pub producers: Vec<NotificationProducer>,
}

impl NotificationProducers {
    pub fn attach(&mut self, producer: NotificationProducer) -> &mut Self {
        self.producers.push(producer);
        self
    }

    pub async fn publish(&self, notification: Notification) {
        for producer in &self.producers {
            producer.publish(notification.clone()).await;
        }
    }
}
