use std::fmt;

use serde_json::Value;

/// Callback invoked with the new raw field value when another writer
/// changes the field.
pub type ValueListener = Box<dyn Fn(Option<Value>) + Send + Sync + 'static>;

/// Host-side storage of one field value.
///
/// `set_value` is fire-and-forget: delivery failures are the channel's to
/// report, never the caller's. Listeners only hear about writes made through
/// other channel instances.
pub trait PersistenceChannel: Send + Sync {
    fn get_value(&self) -> Option<Value>;
    fn set_value(&self, value: Value);
    fn on_value_changed(&self, listener: ValueListener) -> Subscription;
}

/// Registration of a [`ValueListener`]. The listener is detached exactly once,
/// either by [`Subscription::unsubscribe`] or when the guard is dropped.
#[must_use = "dropping a Subscription detaches its listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
