use dashmap::DashMap;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry of per-product exclusive leases.
///
/// Cloning shares the registry. Every stock-affecting unit of work takes its
/// leases here before opening a database transaction and keeps them until the
/// transaction is finished.
#[derive(Clone, Default)]
pub struct StockLocks {
    slots: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl StockLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every listed product, deduplicated and in ascending id order,
    /// so two multi-line orders can never wait on each other in a cycle.
    pub async fn acquire<I>(&self, product_ids: I) -> StockLease
    where
        I: IntoIterator<Item = Uuid>,
    {
        let ordered: BTreeSet<Uuid> = product_ids.into_iter().collect();
        let mut lease = StockLease {
            slots: self.slots.clone(),
            guards: Vec::with_capacity(ordered.len()),
        };

        for product_id in ordered {
            let slot = self.slots.entry(product_id).or_default().clone();
            let guard = slot.lock_owned().await;
            lease.guards.push((product_id, guard));
        }

        lease
    }

    /// Number of products with a live or contended lease.
    pub fn active_slots(&self) -> usize {
        self.slots.len()
    }
}

impl fmt::Debug for StockLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockLocks")
            .field("active_slots", &self.slots.len())
            .finish()
    }
}

/// Proof that the holder may read-then-write the inventory rows of the
/// covered products. Released on drop.
pub struct StockLease {
    slots: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    // ascending by product id
    guards: Vec<(Uuid, OwnedMutexGuard<()>)>,
}

impl StockLease {
    pub fn covers(&self, product_id: Uuid) -> bool {
        self.guards
            .binary_search_by(|(id, _)| id.cmp(&product_id))
            .is_ok()
    }

    pub fn product_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.guards.iter().map(|(id, _)| *id)
    }
}

impl fmt::Debug for StockLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.product_ids()).finish()
    }
}

impl Drop for StockLease {
    fn drop(&mut self) {
        for (product_id, guard) in self.guards.drain(..).rev() {
            drop(guard);
            // Waiters hold their own clone of the slot, so a count of one
            // means nobody else is interested in this product.
            self.slots
                .remove_if(&product_id, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}
