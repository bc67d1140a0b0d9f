//! Per-product coordination of mutations.
//!
//! Two rules apply to operations by one user on the same product within one
//! reconciler:
//!
//! - identical requests issued while one is running join it and receive its
//!   outcome (a double-clicked heart issues one insert, not insert + delete);
//! - different requests run one after another, never interleaved.
//!
//! Requests issued under different users never join or queue behind each
//! other, even for the same product.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bazaar_core::{ProductId, UserId};
use tokio::sync::OnceCell;

/// What a caller asked for. Only equal requests are coalesced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Request {
    Toggle,
    SetQuantity(u32),
}

type GateKey = (UserId, ProductId);
type JoinKey = (UserId, ProductId, Request);
type Slots<T> = Mutex<HashMap<JoinKey, Arc<OnceCell<T>>>>;

pub(crate) struct InFlight<T> {
    slots: Slots<T>,
    gates: Mutex<HashMap<GateKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the owner's slot when its operation ends, including cancellation.
struct SlotGuard<'a, T> {
    slots: &'a Slots<T>,
    key: JoinKey,
    cell: Arc<OnceCell<T>>,
}

impl<T> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        let mut slots = lock(self.slots);
        if slots
            .get(&self.key)
            .is_some_and(|cell| Arc::ptr_eq(cell, &self.cell))
        {
            slots.remove(&self.key);
        }
    }
}

impl<T: Clone> InFlight<T> {
    /// Run `op` for `user` on `product`, or join an identical request that
    /// user already has running.
    pub(crate) async fn run<F, Fut>(
        &self,
        user: &UserId,
        product: &ProductId,
        request: Request,
        op: F,
    ) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let key = (user.clone(), product.clone(), request);
        let (cell, owner) = {
            let mut slots = lock(&self.slots);
            match slots.get(&key).cloned() {
                Some(cell) => (cell, false),
                None => {
                    let cell = Arc::new(OnceCell::new());
                    slots.insert(key.clone(), Arc::clone(&cell));
                    (cell, true)
                }
            }
        };

        if !owner {
            tracing::debug!(
                user_id = %user,
                product_id = %product,
                ?request,
                "Joining in-flight request"
            );
        }

        let _slot = owner.then(|| SlotGuard {
            slots: &self.slots,
            key,
            cell: Arc::clone(&cell),
        });
        let gate = self.gate(user, product);

        cell.get_or_init(|| async move {
            let _permit = gate.lock().await;
            op().await
        })
        .await
        .clone()
    }

    /// Whether any request by `user` for `product` is running or queued.
    pub(crate) fn is_pending(&self, user: &UserId, product: &ProductId) -> bool {
        lock(&self.slots)
            .keys()
            .any(|(owner, id, _)| owner == user && id == product)
    }

    /// Drop idle gates. Gates held by running operations stay alive through
    /// their own `Arc`.
    pub(crate) fn prune(&self) {
        lock(&self.gates).retain(|_, gate| Arc::strong_count(gate) > 1);
    }

    fn gate(&self, user: &UserId, product: &ProductId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            lock(&self.gates)
                .entry((user.clone(), product.clone()))
                .or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_identical_requests_share_one_run() {
        let in_flight = InFlight::<usize>::default();
        let runs = &AtomicUsize::new(0);
        let user = UserId::new("u1");
        let product = ProductId::from(1);

        let op = move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            runs.fetch_add(1, Ordering::SeqCst) + 1
        };

        let (a, b) = tokio::join!(
            in_flight.run(&user, &product, Request::Toggle, op),
            in_flight.run(&user, &product, Request::Toggle, op),
        );

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!((a, b), (1, 1));
        assert!(!in_flight.is_pending(&user, &product));
    }

    #[tokio::test]
    async fn test_sequential_requests_run_again() {
        let in_flight = InFlight::<usize>::default();
        let runs = &AtomicUsize::new(0);
        let user = UserId::new("u1");
        let product = ProductId::from(1);
        let op = move || async move { runs.fetch_add(1, Ordering::SeqCst) + 1 };

        assert_eq!(in_flight.run(&user, &product, Request::Toggle, op).await, 1);
        assert_eq!(in_flight.run(&user, &product, Request::Toggle, op).await, 2);
    }

    #[tokio::test]
    async fn test_different_requests_do_not_interleave() {
        let in_flight = InFlight::<()>::default();
        let active = &AtomicUsize::new(0);
        let max_active = &AtomicUsize::new(0);
        let user = UserId::new("u1");
        let product = ProductId::from(7);

        let op = move || async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            active.fetch_sub(1, Ordering::SeqCst);
        };

        tokio::join!(
            in_flight.run(&user, &product, Request::Toggle, op),
            in_flight.run(&user, &product, Request::SetQuantity(3), op),
        );

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prune_keeps_nothing_when_idle() {
        let in_flight = InFlight::<()>::default();
        in_flight
            .run(&UserId::new("u1"), &ProductId::from(1), Request::Toggle, || async {})
            .await;
        in_flight.prune();
        assert!(lock(&in_flight.gates).is_empty());
    }

    #[tokio::test]
    async fn test_other_users_never_join() {
        let in_flight = InFlight::<usize>::default();
        let runs = &AtomicUsize::new(0);
        let product = ProductId::from(3);
        let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));

        let op = move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            runs.fetch_add(1, Ordering::SeqCst) + 1
        };

        let (a, b) = tokio::join!(
            in_flight.run(&alice, &product, Request::Toggle, op),
            in_flight.run(&bob, &product, Request::Toggle, op),
        );

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_ne!(a, b);
        assert!(!in_flight.is_pending(&alice, &product));
    }
}
