//! Admin notification banners
//!
//! Every notice disappears on its own after the configured delay, or
//! earlier when dismissed. The timer removes by id, so a notice that was
//! already dismissed is never touched again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::NotificationConfig;

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// A visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

struct Inner {
    next_id: AtomicU64,
    notices: Mutex<Vec<Notice>>,
    dismiss_after: Duration,
}

/// Shared notification list. Cloning is cheap.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl NotificationCenter {
    pub fn new(config: &NotificationConfig) -> Self {
        Self::with_delay(Duration::from_millis(config.dismiss_after_ms))
    }

    pub fn with_delay(dismiss_after: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                notices: Mutex::new(Vec::new()),
                dismiss_after,
            }),
        }
    }

    /// Show a notice and schedule its removal
    pub async fn push(&self, kind: NoticeKind, message: impl Into<String>) -> Notice {
        let notice = Notice {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
            message: message.into(),
            created_at: Utc::now(),
        };
        self.inner.notices.lock().await.push(notice.clone());

        let inner = Arc::clone(&self.inner);
        let id = notice.id;
        tokio::spawn(async move {
            tokio::time::sleep(inner.dismiss_after).await;
            inner.notices.lock().await.retain(|n| n.id != id);
        });

        notice
    }

    pub async fn success(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeKind::Success, message).await
    }

    pub async fn error(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeKind::Error, message).await
    }

    pub async fn info(&self, message: impl Into<String>) -> Notice {
        self.push(NoticeKind::Info, message).await
    }

    /// Remove a notice now. Returns false when it was already gone.
    pub async fn dismiss(&self, id: u64) -> bool {
        let mut notices = self.inner.notices.lock().await;
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    /// Visible notices, oldest first
    pub async fn active(&self) -> Vec<Notice> {
        self.inner.notices.lock().await.clone()
    }
}
