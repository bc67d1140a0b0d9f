//! Local mirror of a user-owned remote collection.
//!
//! # Architecture
//!
//! - The remote store is authoritative; the local snapshot only changes by
//!   replacing it wholesale with the result of a fetch
//! - Every mutation awaits remote confirmation, then re-fetches the whole
//!   collection before returning
//! - Session transitions are the only other trigger: a new user clears the
//!   snapshot and loads theirs, sign-out clears it, a token refresh keeps it
//! - Fetches are tagged with the session epoch they started under and
//!   discarded if a transition happened meanwhile
//!
//! Favorites and the cart share this machinery through [`CollectionKind`];
//! see [`crate::favorites`] and [`crate::cart`].

mod inflight;

pub(crate) use inflight::Request;

use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bazaar_core::{Product, ProductId, UserId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::error::{Result, SyncError, add_breadcrumb, capture};
use crate::notify::{Notice, Notifier};
use crate::session::{Session, SessionEvent, SessionProvider, SessionSubscription};
use crate::store::{Collection, Embed, Filter, Query, RemoteStore, StoreError, decode_rows};
use inflight::InFlight;

/// Describes one user-owned collection.
pub trait CollectionKind: Send + Sync + 'static {
    /// Row type as fetched, with the product joined in.
    type Entry: DeserializeOwned + Clone + Send + Sync + 'static;

    const COLLECTION: Collection;
    /// Short name used in logs and breadcrumbs.
    const LABEL: &'static str;

    const ADDED: Notice;
    const REMOVED: Notice;
    const ALREADY_PRESENT: Notice;

    fn product_id(entry: &Self::Entry) -> &ProductId;

    fn product(entry: &Self::Entry) -> Option<&Product>;

    /// Row inserted when the product is toggled on.
    fn new_row(user_id: &UserId, product_id: &ProductId) -> Value;
}

/// Outcome of a confirmed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Added,
    Removed,
    /// The insert hit the uniqueness constraint; the row was already there.
    AlreadyPresent,
    /// A cart line's quantity changed.
    Updated,
}

struct Snapshot<E> {
    /// Bumped on every session transition.
    epoch: u64,
    /// Sequence number of the fetch that produced `entries`.
    fetched: u64,
    owner: Option<UserId>,
    entries: Arc<Vec<E>>,
}

impl<E> Default for Snapshot<E> {
    fn default() -> Self {
        Self {
            epoch: 0,
            fetched: 0,
            owner: None,
            entries: Arc::new(Vec::new()),
        }
    }
}

/// Mirror of one user-owned collection for the current session.
///
/// Reads are synchronous and never touch the network. Mutations go to the
/// remote store first and only then refresh the mirror.
pub struct Reconciler<K: CollectionKind, S, N> {
    store: S,
    sessions: SessionProvider,
    notifier: N,
    state: RwLock<Snapshot<K::Entry>>,
    fetch_seq: AtomicU64,
    in_flight: InFlight<Result<Membership>>,
    _kind: PhantomData<K>,
}

impl<K, S, N> Reconciler<K, S, N>
where
    K: CollectionKind,
    S: RemoteStore,
    N: Notifier,
{
    /// Create an empty mirror. Call [`Self::initialize`] to load it.
    pub fn new(store: S, sessions: SessionProvider, notifier: N) -> Self {
        Self {
            store,
            sessions,
            notifier,
            state: RwLock::new(Snapshot::default()),
            fetch_seq: AtomicU64::new(0),
            in_flight: InFlight::default(),
            _kind: PhantomData,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn sessions(&self) -> &SessionProvider {
        &self.sessions
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Initial load for `session`, or an empty mirror without one.
    pub async fn initialize(&self, session: Option<&Session>) {
        match session {
            Some(session) => self.start(session).await,
            None => self.clear(),
        }
    }

    /// Apply a session transition.
    pub async fn on_session_change(&self, event: SessionEvent) {
        match event {
            SessionEvent::Acquired(session) => self.start(&session).await,
            SessionEvent::Refreshed(session) => {
                if self.owner().as_ref() == Some(&session.user_id) {
                    tracing::debug!(
                        collection = %K::COLLECTION,
                        user_id = %session.user_id,
                        "Token refreshed, keeping snapshot"
                    );
                } else {
                    self.start(&session).await;
                }
            }
            SessionEvent::Cleared => self.clear(),
        }
    }

    /// Feed transitions from `subscription` into [`Self::on_session_change`]
    /// until the provider is dropped.
    pub fn listen(self: Arc<Self>, mut subscription: SessionSubscription) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                self.on_session_change(event).await;
            }
            tracing::debug!(collection = %K::COLLECTION, "Session provider closed");
        })
    }

    /// Re-fetch the collection for the active session.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NoSession` without a session, or
    /// `SyncError::Fetch` if the read fails. The snapshot is left as it was.
    pub async fn reload(&self) -> Result<()> {
        let session = self.sessions.current().ok_or(SyncError::NoSession)?;
        self.reload_as(&session).await
    }

    /// Reset for `session` and load its rows.
    async fn start(&self, session: &Session) {
        {
            let mut state = self.write_state();
            state.epoch += 1;
            state.owner = Some(session.user_id.clone());
            state.entries = Arc::new(Vec::new());
        }

        if let Err(err) = self.reload_as(session).await {
            tracing::warn!(
                collection = %K::COLLECTION,
                user_id = %session.user_id,
                error = %err,
                "Initial load failed"
            );
            self.notifier.notify(Notice::ActionFailed);
        }
    }

    fn clear(&self) {
        let mut state = self.write_state();
        state.epoch += 1;
        state.owner = None;
        state.entries = Arc::new(Vec::new());
        tracing::debug!(collection = %K::COLLECTION, "Snapshot cleared");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Last successfully fetched entries. Empty without an active session.
    pub fn current_entries(&self) -> Vec<K::Entry> {
        self.visible().map(|e| e.to_vec()).unwrap_or_default()
    }

    /// Whether `product_id` is in the collection.
    pub fn is_member(&self, product_id: &ProductId) -> bool {
        self.visible()
            .is_some_and(|entries| entries.iter().any(|e| K::product_id(e) == product_id))
    }

    /// Product ids in snapshot order.
    pub fn member_ids(&self) -> Vec<ProductId> {
        self.visible()
            .map(|entries| entries.iter().map(|e| K::product_id(e).clone()).collect())
            .unwrap_or_default()
    }

    /// Joined products in snapshot order. `None` where the join came back
    /// empty (e.g. the product was deleted).
    pub fn member_products(&self) -> Vec<Option<Product>> {
        self.visible()
            .map(|entries| entries.iter().map(|e| K::product(e).cloned()).collect())
            .unwrap_or_default()
    }

    /// Whether a mutation by the current user for `product_id` is running.
    pub fn is_pending(&self, product_id: &ProductId) -> bool {
        self.sessions
            .current_user()
            .is_some_and(|user| self.in_flight.is_pending(&user, product_id))
    }

    /// Entries, if they belong to the active session.
    pub(crate) fn visible(&self) -> Option<Arc<Vec<K::Entry>>> {
        let user = self.sessions.current_user()?;
        let state = self.read_state();
        (state.owner.as_ref() == Some(&user)).then(|| Arc::clone(&state.entries))
    }

    fn owner(&self) -> Option<UserId> {
        self.read_state().owner.clone()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `product_id` if absent, remove it if present.
    ///
    /// Returns whether the remote store confirmed the change. A duplicate
    /// insert counts as confirmed. Failures are reported through the
    /// notifier, never returned.
    pub async fn toggle(&self, product_id: &ProductId) -> bool {
        self.try_toggle(product_id).await.is_ok()
    }

    /// [`Self::toggle`] with the typed outcome.
    ///
    /// A toggle for a product that is already toggling joins the running one
    /// and shares its outcome.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NoSession` without a session, or
    /// `SyncError::RemoteUnavailable` if the mutation failed.
    pub async fn try_toggle(&self, product_id: &ProductId) -> Result<Membership> {
        let session = self.require_session()?;
        add_breadcrumb(
            K::LABEL,
            "toggle",
            Some(&[("product_id", product_id.as_str())]),
        );

        let session = &session;
        self.run_exclusive(session, product_id, Request::Toggle, move || {
            self.toggle_now(session, product_id)
        })
        .await
    }

    #[instrument(
        skip_all,
        fields(collection = %K::COLLECTION, user_id = %session.user_id, product_id = %product_id)
    )]
    async fn toggle_now(&self, session: &Session, product_id: &ProductId) -> Result<Membership> {
        let filter = Self::row_filter(&session.user_id, product_id);

        let membership = if self.is_member(product_id) {
            self.store
                .delete(Some(session), K::COLLECTION, &filter)
                .await
                .map_err(|err| self.fail(&filter, err))?;
            Membership::Removed
        } else {
            let row = K::new_row(&session.user_id, product_id);
            match self.store.insert(Some(session), K::COLLECTION, row).await {
                Ok(_) => Membership::Added,
                Err(err) if err.is_constraint_violation() => {
                    tracing::info!(code = err.code().unwrap_or("-"), "Row already present");
                    Membership::AlreadyPresent
                }
                Err(err) => return Err(self.fail(&filter, err)),
            }
        };

        self.confirm(session, membership).await;
        Ok(membership)
    }

    // =========================================================================
    // Building blocks shared by collection-specific operations
    // =========================================================================

    /// The active session, or a sign-in notice.
    pub(crate) fn require_session(&self) -> Result<Session> {
        self.sessions.current().ok_or_else(|| {
            self.notifier.notify(Notice::SignInRequired);
            SyncError::NoSession
        })
    }

    /// Run `op` under the per-product in-flight rules for `session`'s user.
    pub(crate) async fn run_exclusive<F, Fut>(
        &self,
        session: &Session,
        product_id: &ProductId,
        request: Request,
        op: F,
    ) -> Result<Membership>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Membership>>,
    {
        let outcome = self
            .in_flight
            .run(&session.user_id, product_id, request, op)
            .await;
        self.in_flight.prune();
        outcome
    }

    /// Filter selecting one user's row for one product.
    pub(crate) fn row_filter(user_id: &UserId, product_id: &ProductId) -> Filter {
        Filter::new()
            .eq("user_id", user_id)
            .eq("product_id", product_id)
    }

    /// After a confirmed mutation: refresh the mirror, then tell the user.
    ///
    /// A failed refresh is logged only; the mutation itself succeeded and
    /// the snapshot stays as it was.
    pub(crate) async fn confirm(&self, session: &Session, membership: Membership) {
        if let Err(err) = self.reload_as(session).await {
            tracing::warn!(
                collection = %K::COLLECTION,
                error = %err,
                "Refresh after mutation failed"
            );
        }

        self.notifier.notify(match membership {
            Membership::Added => K::ADDED,
            Membership::Removed => K::REMOVED,
            Membership::AlreadyPresent => K::ALREADY_PRESENT,
            Membership::Updated => Notice::CartQuantityUpdated,
        });
    }

    /// Log, report and notify a failed mutation.
    pub(crate) fn fail(&self, filter: &Filter, err: StoreError) -> SyncError {
        let err = SyncError::from_mutation(err);
        tracing::warn!(
            collection = %K::COLLECTION,
            filter = %filter,
            code = err.code().unwrap_or("-"),
            error = %err,
            "Mutation failed"
        );
        if matches!(err, SyncError::RemoteUnavailable(_)) {
            capture(&err);
        }
        self.notifier.notify(Notice::ActionFailed);
        err
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Fetch the collection for `session` and install it if still current.
    async fn reload_as(&self, session: &Session) -> Result<()> {
        let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.read_state().epoch;
        let entries = self.fetch(session).await?;

        let mut state = self.write_state();
        if state.epoch != epoch || state.owner.as_ref() != Some(&session.user_id) {
            tracing::debug!(
                collection = %K::COLLECTION,
                user_id = %session.user_id,
                "Discarding fetch from a previous session"
            );
            return Ok(());
        }
        if seq < state.fetched {
            tracing::debug!(collection = %K::COLLECTION, "Discarding superseded fetch");
            return Ok(());
        }
        state.fetched = seq;
        state.entries = Arc::new(entries);
        drop(state);
        Ok(())
    }

    async fn fetch(&self, session: &Session) -> Result<Vec<K::Entry>> {
        let filter = Filter::new().eq("user_id", &session.user_id);
        let query = Query::new(K::COLLECTION)
            .filter(filter)
            .embed(Embed::PRODUCT)
            .order_by("created_at", true);

        let rows = self
            .store
            .select(Some(session), &query)
            .await
            .and_then(decode_rows::<K::Entry>)
            .map_err(|err| {
                tracing::warn!(
                    collection = %K::COLLECTION,
                    filter = %query.filter,
                    code = err.code().unwrap_or("-"),
                    error = %err,
                    "Fetch failed"
                );
                SyncError::from_fetch(err)
            })?;

        Ok(dedupe::<K>(rows))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Snapshot<K::Entry>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Snapshot<K::Entry>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keep the first entry per product.
fn dedupe<K: CollectionKind>(entries: Vec<K::Entry>) -> Vec<K::Entry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(K::product_id(e).clone()))
        .collect()
}
