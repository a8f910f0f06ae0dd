//! In-memory channel double shared by the unit tests.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc, Mutex,
};

use serde_json::Value;

use crate::channel::{PersistenceChannel, Subscription, ValueListener};

type Listeners = Arc<Mutex<Vec<(u64, Arc<ValueListener>)>>>;

#[derive(Default)]
pub struct RecordingChannel {
    stored: Mutex<Option<Value>>,
    writes: Mutex<Vec<Value>>,
    listeners: Listeners,
    next_listener_id: AtomicU64,
    detach_calls: Arc<AtomicUsize>,
    keep_listeners_on_detach: bool,
}

impl RecordingChannel {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_value(value: Value) -> Arc<Self> {
        Arc::new(Self {
            stored: Mutex::new(Some(value)),
            ..Self::default()
        })
    }

    /// Detaching only counts the call; the listener stays registered so tests
    /// can fire it after the editor is gone.
    pub fn leaky() -> Arc<Self> {
        Arc::new(Self {
            keep_listeners_on_detach: true,
            ..Self::default()
        })
    }

    pub fn writes(&self) -> Vec<Value> {
        self.writes.lock().expect("writes lock").clone()
    }

    pub fn last_write(&self) -> Option<Value> {
        self.writes().last().cloned()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().expect("listeners lock").len()
    }

    pub fn detach_calls(&self) -> usize {
        self.detach_calls.load(Ordering::SeqCst)
    }

    /// Simulates a write made by another editor.
    pub fn emit_external(&self, value: Option<Value>) {
        *self.stored.lock().expect("stored lock") = value.clone();
        let listeners: Vec<Arc<ValueListener>> = self
            .listeners
            .lock()
            .expect("listeners lock")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(value.clone());
        }
    }
}

impl PersistenceChannel for RecordingChannel {
    fn get_value(&self) -> Option<Value> {
        self.stored.lock().expect("stored lock").clone()
    }

    fn set_value(&self, value: Value) {
        *self.stored.lock().expect("stored lock") = Some(value.clone());
        self.writes.lock().expect("writes lock").push(value);
    }

    fn on_value_changed(&self, listener: ValueListener) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .expect("listeners lock")
            .push((id, Arc::new(listener)));

        let listeners = Arc::clone(&self.listeners);
        let detach_calls = Arc::clone(&self.detach_calls);
        let keep = self.keep_listeners_on_detach;
        Subscription::new(move || {
            detach_calls.fetch_add(1, Ordering::SeqCst);
            if !keep {
                listeners
                    .lock()
                    .expect("listeners lock")
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }
}
