//! In-process publish/subscribe event bus
//!
//! The bus is an explicitly constructed registry, owned by the application
//! context and shared via `Arc`. There is no global instance; collaborators
//! receive the bus they should talk to, which keeps unit tests isolated and
//! allows multiple independent buses in one process.

use serde_json::Value;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

/// Callback invoked with the event payload on every matching `emit`.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Hook invoked when a subscriber panics during `emit`.
/// Arguments are the event name and the panic message.
pub type PanicHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

struct Entry {
    id: u64,
    callback: EventCallback,
}

/// Publish/subscribe registry for in-host events.
///
/// Dispatch is synchronous: `emit` invokes every callback registered at the
/// moment of the call, in registration order, before it returns. Each
/// callback runs isolated; a panicking subscriber is reported through the
/// panic hook and does not prevent later subscribers from running.
pub struct EventBus {
    events: Mutex<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
    panic_hook: RwLock<PanicHook>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            panic_hook: RwLock::new(Arc::new(|event, message| {
                log::error!("subscriber for '{}' panicked: {}", event, message);
            })),
        }
    }

    /// Subscribe to an event.
    ///
    /// Registering the same closure twice yields two independent entries.
    /// The returned [`Subscription`] removes exactly the entry created by
    /// this call; dropping it does not unsubscribe.
    pub fn on<F>(self: &Arc<Self>, event: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut events = self.events.lock().unwrap();
        events.entry(event.to_string()).or_default().push(Entry {
            id,
            callback: Arc::new(callback),
        });
        log::trace!("subscribed #{} to '{}'", id, event);

        Subscription {
            bus: Arc::downgrade(self),
            event: event.to_string(),
            id,
        }
    }

    /// Emit an event, invoking every currently registered callback for it
    /// in registration order with the same payload.
    ///
    /// The pass iterates a snapshot: callbacks that subscribe or
    /// unsubscribe during dispatch do not affect the current pass.
    /// Re-entrant `emit` from inside a callback is allowed.
    pub fn emit(&self, event: &str, data: Value) {
        let snapshot: Vec<EventCallback> = {
            let events = self.events.lock().unwrap();
            match events.get(event) {
                Some(entries) => entries.iter().map(|e| Arc::clone(&e.callback)).collect(),
                None => return,
            }
        };

        log::trace!("emit '{}' to {} subscriber(s)", event, snapshot.len());
        for callback in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(&data))) {
                let message = panic_message(panic.as_ref());
                let hook = Arc::clone(&self.panic_hook.read().unwrap());
                hook(event, &message);
            }
        }
    }

    /// Remove all callbacks for an event unconditionally.
    pub fn off(&self, event: &str) {
        let removed = self.events.lock().unwrap().remove(event);
        if let Some(entries) = removed {
            log::debug!("cleared {} subscriber(s) for '{}'", entries.len(), event);
        }
    }

    /// Number of callbacks currently registered for an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .get(event)
            .map_or(0, |entries| entries.len())
    }

    /// Replace the hook that receives subscriber panics.
    pub fn set_panic_hook<F>(&self, hook: F)
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        *self.panic_hook.write().unwrap() = Arc::new(hook);
    }

    fn remove(&self, event: &str, id: u64) {
        let mut events = self.events.lock().unwrap();
        if let Some(entries) = events.get_mut(event) {
            entries.retain(|e| e.id != id);
            if entries.is_empty() {
                events.remove(event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle identifying one subscription on one bus.
///
/// `unsubscribe` is idempotent and removes only the entry this handle was
/// created for, even if the same closure was registered multiple times.
pub struct Subscription {
    bus: Weak<EventBus>,
    event: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.event, self.id);
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
