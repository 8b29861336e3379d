//! Notification sink.
//!
//! Delivery is fire-and-forget. Work running inside a transaction collects
//! notifications in an `Outbox` that is flushed only once the transaction
//! has committed.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::model::{PlayerId, VillageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Village(VillageId),
    User(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub event: String,
    pub payload: Value,
}

pub trait Notifier: Send + Sync {
    fn notify_village(&self, village: VillageId, event: &str, payload: &Value);
    fn notify_user(&self, user: PlayerId, event: &str, payload: &Value);
}

/// Logs every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_village(&self, village: VillageId, event: &str, payload: &Value) {
        tracing::info!(target: "palisade::notify", village, event, %payload, "notify village");
    }

    fn notify_user(&self, user: PlayerId, event: &str, payload: &Value) {
        tracing::info!(target: "palisade::notify", user, event, %payload, "notify user");
    }
}

/// Keeps notifications in memory until drained.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    inbox: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, recipient: Recipient, event: &str, payload: &Value) {
        tracing::debug!(target: "palisade::notify", ?recipient, event, "queued notification");
        self.inbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Notification {
                recipient,
                event: event.to_string(),
                payload: payload.clone(),
            });
    }

    /// Removes and returns everything addressed to `recipient`.
    pub fn drain(&self, recipient: Recipient) -> Vec<Notification> {
        let mut inbox = self.inbox.lock().unwrap_or_else(|e| e.into_inner());
        let (taken, kept) = inbox.drain(..).partition(|n| n.recipient == recipient);
        *inbox = kept;
        taken
    }

    pub fn all(&self) -> Vec<Notification> {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify_village(&self, village: VillageId, event: &str, payload: &Value) {
        self.push(Recipient::Village(village), event, payload);
    }

    fn notify_user(&self, user: PlayerId, event: &str, payload: &Value) {
        self.push(Recipient::User(user), event, payload);
    }
}

/// Notifications held back until the surrounding transaction commits.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<Notification>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn village(&mut self, village: VillageId, event: &str, payload: Value) {
        self.pending.push(Notification {
            recipient: Recipient::Village(village),
            event: event.to_string(),
            payload,
        });
    }

    pub fn user(&mut self, user: PlayerId, event: &str, payload: Value) {
        self.pending.push(Notification {
            recipient: Recipient::User(user),
            event: event.to_string(),
            payload,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn flush(self, notifier: &dyn Notifier) {
        for n in self.pending {
            match n.recipient {
                Recipient::Village(id) => notifier.notify_village(id, &n.event, &n.payload),
                Recipient::User(id) => notifier.notify_user(id, &n.event, &n.payload),
            }
        }
    }
}
