//! Serialized cache access for one session
//!
//! Every write and delete a session issues is queued to a single task that applies them
//! in order, so a background write can never land after a later delete of the same key.
//! Reads drain the queue first and always observe the session's own latest write.
//! Failures are logged and reported as `false`; they never abort the caller.

use rivet_core::identity::IdentityKey;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{CacheRecord, CacheStore};

enum CacheOp {
    Put {
        record: CacheRecord,
        done: oneshot::Sender<bool>,
    },
    Delete {
        key: IdentityKey,
        done: oneshot::Sender<bool>,
    },
    Flush(oneshot::Sender<()>),
}

/// Ordered front of a [`CacheStore`]
pub(crate) struct CacheWriter {
    cache: Arc<dyn CacheStore>,
    queue: OnceLock<mpsc::UnboundedSender<CacheOp>>,
}

impl CacheWriter {
    pub(crate) fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            queue: OnceLock::new(),
        }
    }

    /// Queues a write and returns a receiver resolving to whether it succeeded
    pub(crate) fn enqueue_put(&self, record: CacheRecord) -> oneshot::Receiver<bool> {
        let (done, rx) = oneshot::channel();
        self.send(CacheOp::Put { record, done });
        rx
    }

    /// Writes `record` once every earlier queued operation has been applied
    pub(crate) async fn put(&self, record: CacheRecord) -> bool {
        self.enqueue_put(record).await.unwrap_or(false)
    }

    /// Deletes `key` once every earlier queued operation has been applied
    pub(crate) async fn delete(&self, key: &IdentityKey) -> bool {
        let (done, rx) = oneshot::channel();
        self.send(CacheOp::Delete {
            key: key.clone(),
            done,
        });
        rx.await.unwrap_or(false)
    }

    /// Reads `key` after draining the queue
    pub(crate) async fn get(&self, key: &IdentityKey) -> Option<CacheRecord> {
        self.flush().await;
        match self.cache.get(key).await {
            Ok(record) => {
                debug!(
                    "Cache {} for {}",
                    if record.is_some() { "hit" } else { "miss" },
                    key
                );
                record
            }
            Err(err) => {
                warn!("Reading cache record {} failed: {}", key, err);
                None
            }
        }
    }

    /// Waits until every queued operation has been applied
    pub(crate) async fn flush(&self) {
        let (done, rx) = oneshot::channel();
        self.send(CacheOp::Flush(done));
        let _ = rx.await;
    }

    fn send(&self, op: CacheOp) {
        let queue = self.queue.get_or_init(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run(Arc::clone(&self.cache), rx));
            tx
        });
        if queue.send(op).is_err() {
            warn!("Cache writer stopped; operation dropped");
        }
    }
}

async fn run(cache: Arc<dyn CacheStore>, mut ops: mpsc::UnboundedReceiver<CacheOp>) {
    while let Some(op) = ops.recv().await {
        match op {
            CacheOp::Put { record, done } => {
                let key = record.identity_key.clone();
                let ok = match cache.put(record).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!("Writing cache record {} failed: {}", key, err);
                        false
                    }
                };
                let _ = done.send(ok);
            }
            CacheOp::Delete { key, done } => {
                let ok = match cache.delete(&key).await {
                    Ok(()) => {
                        debug!("Deleted cache record {}", key);
                        true
                    }
                    Err(err) => {
                        warn!("Deleting cache record {} failed: {}", key, err);
                        false
                    }
                };
                let _ = done.send(ok);
            }
            CacheOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
