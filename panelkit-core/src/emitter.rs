use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::disposable::Disposable;

pub type EventListener = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

type ListenerList = Arc<Mutex<Vec<(u64, EventListener)>>>;

/// Backend → UI push channel for one named event.
///
/// Each `WebviewInstance` owns its own emitters; nothing here is shared
/// between instances.
pub struct EventEmitter {
    name: String,
    next_id: AtomicU64,
    listeners: ListenerList,
}

impl EventEmitter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            next_id: AtomicU64::new(1),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self, listener: EventListener) -> Disposable {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));

        let listeners = Arc::downgrade(&self.listeners);
        Disposable::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Deliver `payload` to every current subscriber.
    pub fn fire(&self, payload: serde_json::Value) {
        // Snapshot so listeners may (un)subscribe while being called
        let snapshot: Vec<EventListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        if snapshot.is_empty() {
            log::debug!("Event '{}' fired with no subscribers", self.name);
        }
        for listener in snapshot {
            listener(&payload);
        }
    }

    pub fn fire_json<T: Serialize>(&self, payload: &T) -> Result<(), String> {
        let value = serde_json::to_value(payload)
            .map_err(|e| format!("Failed to serialize payload for event '{}': {}", self.name, e))?;
        self.fire(value);
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("name", &self.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
