use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

pub const DEFAULT_TOAST_DURATION_MS: u64 = 3_000;

/// Duration of 0 keeps a toast on screen until it is removed explicitly.
pub const STICKY_TOAST: u64 = 0;

pub type ToastId = u64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ToastPosition {
    TopLeft,
    #[default]
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub duration_ms: u64,
    pub position: ToastPosition,
    pub dismissible: bool,
    /// Optional icon name overriding the kind's default glyph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Per-toast overrides; anything left at default matches the usual
/// short-lived dismissible notification.
#[derive(Debug, Clone)]
pub struct ToastOptions {
    pub duration_ms: u64,
    pub position: ToastPosition,
    pub dismissible: bool,
    pub icon: Option<String>,
}

impl Default for ToastOptions {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_TOAST_DURATION_MS,
            position: ToastPosition::default(),
            dismissible: true,
            icon: None,
        }
    }
}

#[derive(Debug, Default)]
struct ToastStoreInner {
    toasts: Mutex<Vec<Toast>>,
    next_id: AtomicU64,
}

/// In-memory notification queue. Adding a toast schedules its own removal
/// after its duration; removal by id is idempotent, so an auto-expiry racing
/// a manual dismiss is harmless.
#[derive(Debug, Clone, Default)]
pub struct ToastStore {
    inner: Arc<ToastStoreInner>,
}

impl ToastStore {
    pub fn add_toast(&self, kind: ToastKind, message: &str, options: ToastOptions) -> ToastId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let duration_ms = options.duration_ms;
        let toast = Toast {
            id,
            kind,
            message: message.to_string(),
            duration_ms,
            position: options.position,
            dismissible: options.dismissible,
            icon: options.icon,
        };
        self.inner.toasts.lock().push(toast);

        if duration_ms != STICKY_TOAST {
            let store = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                store.remove_toast(id);
            });
        }

        id
    }

    pub fn remove_toast(&self, id: ToastId) {
        self.inner.toasts.lock().retain(|toast| toast.id != id);
    }

    pub fn clear_all(&self) {
        self.inner.toasts.lock().clear();
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.inner.toasts.lock().clone()
    }

    pub fn toasts_at(&self, position: ToastPosition) -> Vec<Toast> {
        self.inner
            .toasts
            .lock()
            .iter()
            .filter(|toast| toast.position == position)
            .cloned()
            .collect()
    }

    pub fn success(&self, message: &str) -> ToastId {
        self.add_toast(ToastKind::Success, message, ToastOptions::default())
    }

    pub fn error(&self, message: &str) -> ToastId {
        self.add_toast(ToastKind::Error, message, ToastOptions::default())
    }

    pub fn info(&self, message: &str) -> ToastId {
        self.add_toast(ToastKind::Info, message, ToastOptions::default())
    }

    pub fn warning(&self, message: &str) -> ToastId {
        self.add_toast(ToastKind::Warning, message, ToastOptions::default())
    }
}
