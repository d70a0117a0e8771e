//! Reward notifications
//!
//! Delivery is fire-and-forget: a failed notification is logged and never
//! undoes the reward that triggered it.

use async_trait::async_trait;
use common::models::{NewNotification, NotificationKind};
use common::Result;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tracing::warn;
use uuid::Uuid;

use crate::clock::Clock;

/// Notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> Result<()>;
}

/// Stores notifications in the `notifications` table
pub struct PgNotifier {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgNotifier {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(&self, notification: NewNotification) -> Result<()> {
        db::notifications::insert(&self.pool, &notification, self.clock.now())
            .await
            .map_err(|e| common::Error::Database(e.to_string()))?;
        Ok(())
    }
}

/// Keeps notifications in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<NewNotification>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<NewNotification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.sent().iter().filter(|n| n.kind == kind).count()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify(&self, notification: NewNotification) -> Result<()> {
        if self.failing {
            return Err(common::Error::Internal("notification sink unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
        Ok(())
    }
}

/// Wraps a [`Notifier`] so reward paths never fail on delivery
#[derive(Clone)]
pub struct RewardNotifier {
    inner: Arc<dyn Notifier>,
}

impl RewardNotifier {
    pub fn new(inner: Arc<dyn Notifier>) -> Self {
        Self { inner }
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: String,
        message: String,
        related_id: Option<String>,
    ) {
        let notification = NewNotification {
            user_id,
            kind,
            title,
            message,
            related_id,
        };
        if let Err(e) = self.inner.notify(notification).await {
            warn!("Failed to deliver {} notification to {}: {}", kind, user_id, e);
        }
    }
}
