//! In-process hub in front of a [`FieldBackend`].
//!
//! Every open field keeps its latest value in a cache, so reads and writes
//! through a [`FieldHandle`] never wait on the backend. Writes are applied
//! to the backend in order by a single writer task, and each one is
//! broadcast to the other handles of the same field.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use shared::domain::{FieldKey, OriginId};
use table_core::{PersistenceChannel, Subscription, ValueListener};
use tokio::{
    runtime::Handle,
    sync::{broadcast, mpsc, oneshot},
};
use tracing::{debug, error, info, warn};

use crate::{FieldBackend, StoredField};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// A write observed on a field, tagged with the handle that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub key: FieldKey,
    pub origin: OriginId,
    pub value: Option<Value>,
}

enum WriteCommand {
    Save { key: FieldKey, value: Value },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct FieldStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn FieldBackend>,
    cache: Mutex<HashMap<FieldKey, Option<Value>>>,
    changes: broadcast::Sender<FieldChange>,
    writes: mpsc::UnboundedSender<WriteCommand>,
    runtime: Handle,
}

impl StoreInner {
    fn cache(&self) -> MutexGuard<'_, HashMap<FieldKey, Option<Value>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_value(&self, key: &FieldKey) -> Option<Value> {
        self.cache().get(key).cloned().flatten()
    }
}

impl FieldStore {
    /// Starts the writer task on the current tokio runtime.
    pub fn open(backend: Arc<dyn FieldBackend>) -> Result<Self> {
        let runtime = Handle::try_current().context("field store requires a tokio runtime")?;
        let (writes, commands) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        runtime.spawn(run_writer(Arc::clone(&backend), commands));

        Ok(Self {
            inner: Arc::new(StoreInner {
                backend,
                cache: Mutex::new(HashMap::new()),
                changes,
                writes,
                runtime,
            }),
        })
    }

    /// Returns a new handle on `key` with its own origin. The first open of a
    /// field loads it from the backend; later opens share the cached value.
    pub async fn open_field(&self, key: FieldKey) -> Result<FieldHandle> {
        let cached = self.inner.cache().contains_key(&key);
        if !cached {
            let loaded = self
                .inner
                .backend
                .load_value(&key)
                .await
                .with_context(|| format!("failed to open field {key}"))?;
            self.inner.cache().entry(key.clone()).or_insert(loaded);
        }

        let origin = OriginId::new();
        debug!(%key, %origin, "opened field handle");
        Ok(FieldHandle {
            key,
            origin,
            store: self.clone(),
        })
    }

    /// Resolves once every write queued before the call has reached the
    /// backend.
    pub async fn flush(&self) -> Result<()> {
        let (done, flushed) = oneshot::channel();
        self.inner
            .writes
            .send(WriteCommand::Flush(done))
            .map_err(|_| anyhow!("field writer has stopped"))?;
        flushed.await.context("field writer stopped before flushing")?;
        Ok(())
    }

    pub async fn list_fields(&self) -> Result<Vec<StoredField>> {
        self.inner.backend.list_fields().await
    }
}

async fn run_writer(
    backend: Arc<dyn FieldBackend>,
    mut commands: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            WriteCommand::Save { key, value } => {
                if let Err(error) = backend.save_value(&key, &value).await {
                    error!(%key, "failed to persist field value: {error:#}");
                }
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    info!("field writer stopped");
}

/// One writer's view of a stored field.
#[derive(Clone)]
pub struct FieldHandle {
    key: FieldKey,
    origin: OriginId,
    store: FieldStore,
}

impl FieldHandle {
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn origin(&self) -> OriginId {
        self.origin
    }
}

impl PersistenceChannel for FieldHandle {
    fn get_value(&self) -> Option<Value> {
        self.store.inner.current_value(&self.key)
    }

    fn set_value(&self, value: Value) {
        let inner = &self.store.inner;
        // Held until the write is queued and broadcast, so the writer task
        // and listeners see writes in cache order.
        let mut cache = inner.cache();
        cache.insert(self.key.clone(), Some(value.clone()));

        if inner
            .writes
            .send(WriteCommand::Save {
                key: self.key.clone(),
                value: value.clone(),
            })
            .is_err()
        {
            error!(key = %self.key, "field writer has stopped; value kept in memory only");
        }

        let _ = inner.changes.send(FieldChange {
            key: self.key.clone(),
            origin: self.origin,
            value: Some(value),
        });
        drop(cache);
    }

    fn on_value_changed(&self, listener: ValueListener) -> Subscription {
        let mut changes = self.store.inner.changes.subscribe();
        let weak_store: Weak<StoreInner> = Arc::downgrade(&self.store.inner);
        let key = self.key.clone();
        let origin = self.origin;

        let task = self.store.inner.runtime.spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        if change.key != key || change.origin == origin {
                            continue;
                        }
                        listener(change.value);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%key, skipped, "field listener lagged; re-reading current value");
                        if let Some(store) = weak_store.upgrade() {
                            listener(store.current_value(&key));
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(move || task.abort())
    }
}

#[cfg(test)]
#[path = "tests/field_store_tests.rs"]
mod tests;
