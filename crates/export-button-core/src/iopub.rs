//! Ordered handler registry for kernel output messages.

use std::sync::{
    Arc, PoisonError, RwLock, Weak,
    atomic::{AtomicU64, Ordering},
};

use crate::IopubMessage;

/// Callback invoked synchronously for every emitted message.
pub type IopubHandler = Arc<dyn Fn(&IopubMessage) + Send + Sync>;

struct Slot {
    id: u64,
    handler: IopubHandler,
}

/// Output message signal of a kernel.
///
/// Handlers run synchronously inside [`IopubSignal::emit`], in registration
/// order.
pub struct IopubSignal {
    handlers: RwLock<Vec<Slot>>,
    next_id: AtomicU64,
}

impl Default for IopubSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl IopubSignal {
    /// Create a signal with no handlers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Attach a handler. It stays attached until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription detaches the handler immediately"]
    pub fn connect<F>(self: &Arc<Self>, handler: F) -> Subscription
    where
        F: Fn(&IopubMessage) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Slot {
                id,
                handler: Arc::new(handler),
            });
        tracing::trace!(handler_id = id, "iopub handler connected");

        Subscription {
            signal: Arc::downgrade(self),
            id,
        }
    }

    fn disconnect(&self, id: u64) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|slot| slot.id != id);
        tracing::trace!(handler_id = id, "iopub handler disconnected");
    }

    /// Deliver a message to every handler.
    pub fn emit(&self, msg: &IopubMessage) {
        // Snapshot so handlers may connect or disconnect while running.
        let handlers: Vec<IopubHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|slot| Arc::clone(&slot.handler))
            .collect();

        for handler in handlers {
            handler(msg);
        }
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Scoped handler attachment; detaches on drop.
#[must_use = "dropping the subscription detaches the handler immediately"]
pub struct Subscription {
    signal: Weak<IopubSignal>,
    id: u64,
}

impl Subscription {
    /// Detach now. Equivalent to dropping.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.upgrade() {
            signal.disconnect(self.id);
        }
    }
}
