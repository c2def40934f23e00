//! Toast messages.
//!
//! A [`ToastBus`] is created per application and handed to whoever needs to
//! raise or display toasts. Listeners hold a [`ToastSubscription`]; dropping it
//! (or calling [`ToastSubscription::unsubscribe`]) detaches the listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use tracing::debug;

/// How long a toast stays visible.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
}

pub type ToastListener = Arc<dyn Fn(&Toast) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, ToastListener)>,
}

#[derive(Default)]
struct BusInner {
    next_toast_id: AtomicU64,
    listeners: Mutex<Listeners>,
}

impl BusInner {
    fn remove(&self, listener_id: u64) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        listeners.entries.retain(|(id, _)| *id != listener_id);
    }
}

#[derive(Clone, Default)]
pub struct ToastBus {
    inner: Arc<BusInner>,
}

impl ToastBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: ToastListener) -> ToastSubscription {
        let mut listeners = self.inner.listeners.lock().unwrap_or_else(|p| p.into_inner());
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, listener));

        ToastSubscription {
            bus: Arc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    /// Raise a toast and hand it to every current listener.
    pub fn show(&self, message: impl Into<String>, kind: ToastKind) -> Toast {
        let toast = Toast {
            id: self.inner.next_toast_id.fetch_add(1, Ordering::Relaxed) + 1,
            message: message.into(),
            kind,
        };

        // Snapshot so listeners may subscribe/unsubscribe from the callback
        let listeners: Vec<ToastListener> = {
            let listeners = self.inner.listeners.lock().unwrap_or_else(|p| p.into_inner());
            listeners.entries.iter().map(|(_, l)| l.clone()).collect()
        };
        debug!("Toast {} to {} listeners: {}", toast.id, listeners.len(), toast.message);
        for listener in listeners {
            listener(&toast);
        }

        toast
    }

    pub fn success(&self, message: impl Into<String>) -> Toast {
        self.show(message, ToastKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Toast {
        self.show(message, ToastKind::Error)
    }

    pub fn info(&self, message: impl Into<String>) -> Toast {
        self.show(message, ToastKind::Info)
    }

    pub fn listener_count(&self) -> usize {
        let listeners = self.inner.listeners.lock().unwrap_or_else(|p| p.into_inner());
        listeners.entries.len()
    }
}

/// Registration of one listener on a [`ToastBus`].
pub struct ToastSubscription {
    bus: Weak<BusInner>,
    id: u64,
    active: bool,
}

impl ToastSubscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

impl Drop for ToastSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Visible toasts of one listener, each dismissed after [`TOAST_LIFETIME`].
#[derive(Debug, Default)]
pub struct ToastTray {
    visible: Vec<(Toast, Instant)>,
}

impl ToastTray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, toast: Toast, now: Instant) {
        self.visible.push((toast, now + TOAST_LIFETIME));
    }

    /// Drop expired toasts.
    pub fn prune(&mut self, now: Instant) {
        self.visible.retain(|(_, expires_at)| *expires_at > now);
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.visible.iter().map(|(toast, _)| toast)
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
