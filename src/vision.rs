//! Deduplicated street-view transforms, keyed on the view they were made for.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::backend::{BackendError, TransformResponse};
use crate::geo::ProjectedMarker;
use crate::panorama::ViewKey;

const DEFAULT_CAPACITY: usize = 64;

/// A view plus the exact set of trees shown in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VisionKey {
    pub view: ViewKey,
    pub tree_ids: Vec<u64>,
}

impl VisionKey {
    pub fn new(view: ViewKey, markers: &[ProjectedMarker]) -> Self {
        let mut tree_ids: Vec<u64> = markers
            .iter()
            .filter(|m| m.in_view)
            .map(|m| m.candidate_id)
            .collect();
        tree_ids.sort_unstable();
        Self { view, tree_ids }
    }
}

#[derive(Debug, Clone)]
pub struct VisionOutcome {
    pub key: VisionKey,
    pub response: Arc<TransformResponse>,
    /// False when this call performed the request itself.
    pub shared: bool,
}

type Slot = Arc<OnceCell<Arc<TransformResponse>>>;

#[derive(Default)]
struct Slots {
    by_key: HashMap<VisionKey, Slot>,
    order: VecDeque<VisionKey>,
}

pub struct VisionCache {
    slots: Mutex<Slots>,
    capacity: usize,
}

impl Default for VisionCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl VisionCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached result for `key`, or runs `fetch`. Concurrent
    /// callers with the same key wait on a single request. Failures are not
    /// cached, so a later call retries.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: VisionKey,
        fetch: F,
    ) -> Result<VisionOutcome, BackendError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TransformResponse, BackendError>>,
    {
        let slot = self.slot(&key);
        let ran = AtomicBool::new(false);

        let result = slot
            .get_or_try_init(|| async {
                ran.store(true, Ordering::Relaxed);
                fetch().await.map(Arc::new)
            })
            .await
            .cloned();

        match result {
            Ok(response) => {
                let shared = !ran.load(Ordering::Relaxed);
                debug!(?key, shared, "vision result ready");
                Ok(VisionOutcome {
                    key,
                    response,
                    shared,
                })
            }
            Err(e) => {
                // Another waiter may be retrying on this slot
                drop(slot);
                self.forget_if_unused(&key);
                Err(e)
            }
        }
    }

    fn slot(&self, key: &VisionKey) -> Slot {
        let mut slots = self.lock();
        if let Some(slot) = slots.by_key.get(key) {
            return slot.clone();
        }

        // Oldest idle entry goes first. Slots with a request in flight are
        // kept even if that briefly exceeds capacity.
        let slots = &mut *slots;
        while slots.order.len() >= self.capacity {
            let idle = slots.order.iter().position(|k| {
                slots
                    .by_key
                    .get(k)
                    .map(|slot| Arc::strong_count(slot) == 1)
                    .unwrap_or(true)
            });
            match idle.and_then(|i| slots.order.remove(i)) {
                Some(oldest) => {
                    slots.by_key.remove(&oldest);
                }
                None => break,
            }
        }

        let slot: Slot = Arc::new(OnceCell::new());
        slots.by_key.insert(key.clone(), slot.clone());
        slots.order.push_back(key.clone());
        slot
    }

    fn forget_if_unused(&self, key: &VisionKey) {
        let mut slots = self.lock();
        let unused = slots
            .by_key
            .get(key)
            .map(|slot| !slot.initialized() && Arc::strong_count(slot) == 1)
            .unwrap_or(false);
        if unused {
            slots.by_key.remove(key);
            slots.order.retain(|k| k != key);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
