use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{
    validate_session_id, CartEntry, CartSnapshot, CatalogStatus, CheckoutPayload, Notification,
    ServiceError, ServiceRecord, ServiceResult, SessionPhase, Size,
};
use crate::observability::Metrics;
use crate::repositories::CartStorage;
use crate::services::{
    cart_storage_key, CartStore, CatalogLoader, CatalogView, CheckoutHandoff, DetailSelector,
    NotificationOutbox, Notifier,
};

struct SessionState {
    phase: SessionPhase,
    view: CatalogView,
    selector: DetailSelector,
    checked_out_at: Option<DateTime<Utc>>,
}

/// How long sessions stay in the registry without being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExpiry {
    /// Sessions untouched for this long are dropped; their cart stays stored
    pub idle_timeout: Duration,
    /// Checked-out sessions are dropped this long after checkout, together
    /// with their stored cart
    pub checked_out_retention: Duration,
}

impl Default for SessionExpiry {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            checked_out_retention: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eviction {
    Idle,
    CheckedOut,
}

impl Eviction {
    fn as_str(self) -> &'static str {
        match self {
            Eviction::Idle => "idle",
            Eviction::CheckedOut => "checked_out",
        }
    }
}

fn elapsed_since(earlier: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - earlier).to_std().unwrap_or_default()
}

/// Summary of a session as returned to the front-end
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub phase: SessionPhase,
    pub catalog_status: CatalogStatus,
    pub search_text: String,
    pub visible_services: usize,
    pub selected_service_id: Option<String>,
    pub selected_size: Option<Size>,
    pub cart_item_count: usize,
    pub cart_total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One shopper's pass through list, detail, cart and checkout. All views of
/// the session share the same cart.
pub struct BrowsingSession {
    id: String,
    cart: Arc<CartStore>,
    catalog: Arc<CatalogLoader>,
    checkout: Arc<CheckoutHandoff>,
    outbox: NotificationOutbox,
    state: RwLock<SessionState>,
    created_at: DateTime<Utc>,
    last_active_ms: AtomicI64,
}

impl BrowsingSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cart(&self) -> Arc<CartStore> {
        Arc::clone(&self.cart)
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    fn touch(&self) {
        self.last_active_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now.timestamp_millis() - self.last_active_ms.load(Ordering::Relaxed);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    /// Whether the session has outlived `expiry`. A session whose state is
    /// locked is in use and never expires.
    fn expiry(&self, expiry: &SessionExpiry, now: DateTime<Utc>) -> Option<Eviction> {
        let state = self.state.try_read().ok()?;
        let idle = self.idle_for(now) >= expiry.idle_timeout;

        match state.checked_out_at {
            Some(at) if idle || elapsed_since(at, now) >= expiry.checked_out_retention => {
                Some(Eviction::CheckedOut)
            }
            Some(_) => None,
            None => idle.then_some(Eviction::Idle),
        }
    }

    fn ensure_active(&self, state: &SessionState) -> ServiceResult<()> {
        if state.phase.is_terminal() {
            return Err(ServiceError::SessionCheckedOut {
                session_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Filter the list view by display name; empty text shows everything
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn search(&self, text: &str) -> Vec<ServiceRecord> {
        let full = self.catalog.services().await;
        let mut state = self.state.write().await;
        state.view.search(text, &full).to_vec()
    }

    pub async fn visible_services(&self) -> Vec<ServiceRecord> {
        self.state.read().await.view.filtered().to_vec()
    }

    pub async fn rows(&self) -> Vec<Vec<ServiceRecord>> {
        self.state.read().await.view.rows()
    }

    /// Open the detail view for a service, resetting any size choice
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn open_detail(&self, service_id: &str) -> ServiceResult<ServiceRecord> {
        let mut state = self.state.write().await;
        self.ensure_active(&state)?;

        let service = self.catalog.get(service_id).await?;
        state.selector.open(service.clone());
        state.phase = SessionPhase::Browsing;
        Ok(service)
    }

    pub async fn selected_size(&self) -> Option<Size> {
        self.state.read().await.selector.selected_size()
    }

    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn select_size(&self, size: Size) -> ServiceResult<()> {
        let mut state = self.state.write().await;
        self.ensure_active(&state)?;

        state.selector.select_size(size)?;
        state.phase = SessionPhase::SizeChosen;
        Ok(())
    }

    /// Add the open service in the chosen size to the cart
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn confirm_add(&self) -> ServiceResult<CartEntry> {
        let mut state = self.state.write().await;
        self.ensure_active(&state)?;

        let entry = state.selector.confirm_add(&self.cart, &self.outbox).await?;
        state.phase = SessionPhase::Added;
        Ok(entry)
    }

    /// Remove a service from the cart: every size when `size` is `None`,
    /// otherwise only that variant. Returns how many entries were removed.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn remove(&self, service_id: &str, size: Option<Size>) -> ServiceResult<usize> {
        let state = self.state.write().await;
        self.ensure_active(&state)?;

        let name = self
            .cart
            .entries()
            .await
            .into_iter()
            .find(|entry| entry.service_id() == service_id)
            .map(|entry| entry.service.name);

        let removed = match size {
            Some(size) => usize::from(self.cart.remove_variant(service_id, size).await),
            None => self.cart.remove(service_id).await,
        };

        if let Some(name) = name.filter(|_| removed > 0) {
            self.outbox
                .notify(Notification::removal_confirmed(&name))
                .await;
        }
        Ok(removed)
    }

    pub async fn cart_snapshot(&self) -> CartSnapshot {
        self.cart.snapshot().await
    }

    /// Hand the cart off to checkout. The session accepts no further changes.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn checkout(&self) -> ServiceResult<CheckoutPayload> {
        let mut state = self.state.write().await;
        self.ensure_active(&state)?;

        let payload = self
            .checkout
            .checkout(&self.id, &self.cart, &self.outbox)
            .await;
        state.phase = SessionPhase::CheckedOut;
        state.checked_out_at = Some(Utc::now());
        Ok(payload)
    }

    pub async fn drain_notifications(&self) -> Vec<Notification> {
        self.outbox.drain().await
    }

    pub async fn summary(&self) -> SessionSummary {
        let state = self.state.read().await;
        let cart = self.cart.snapshot().await;

        SessionSummary {
            session_id: self.id.clone(),
            phase: state.phase,
            catalog_status: self.catalog.status().await,
            search_text: state.view.search_text().to_string(),
            visible_services: state.view.filtered().len(),
            selected_service_id: state.selector.service().map(|s| s.id.clone()),
            selected_size: state.selector.selected_size(),
            cart_item_count: cart.item_count,
            cart_total: cart.total_amount,
            created_at: self.created_at,
        }
    }
}

/// Open browsing sessions keyed by id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<BrowsingSession>>>,
    catalog: Arc<CatalogLoader>,
    storage: Arc<dyn CartStorage>,
    checkout: Arc<CheckoutHandoff>,
    cart_key_prefix: String,
    expiry: SessionExpiry,
    metrics: Option<Arc<Metrics>>,
}

impl SessionRegistry {
    pub fn new(
        catalog: Arc<CatalogLoader>,
        storage: Arc<dyn CartStorage>,
        checkout: Arc<CheckoutHandoff>,
        cart_key_prefix: String,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            catalog,
            storage,
            checkout,
            cart_key_prefix,
            expiry: SessionExpiry::default(),
            metrics: None,
        }
    }

    pub fn with_expiry(mut self, expiry: SessionExpiry) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn catalog(&self) -> Arc<CatalogLoader> {
        Arc::clone(&self.catalog)
    }

    /// Open a session, or return the one already open under `session_id`.
    /// Activation loads the catalog and the persisted cart.
    #[instrument(skip(self))]
    pub async fn open(&self, session_id: Option<String>) -> ServiceResult<Arc<BrowsingSession>> {
        let session_id = match session_id {
            Some(id) => {
                validate_session_id(&id)?;
                id.trim().to_string()
            }
            None => Uuid::new_v4().to_string(),
        };

        if let Some(existing) = self.sessions.read().await.get(&session_id) {
            existing.touch();
            return Ok(Arc::clone(existing));
        }

        self.catalog.load().await;
        let full = self.catalog.services().await;

        let key = cart_storage_key(&self.cart_key_prefix, &session_id);
        let cart = CartStore::open(key, Arc::clone(&self.storage), self.metrics.clone()).await;

        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&session_id) {
            existing.touch();
            return Ok(Arc::clone(existing));
        }

        let session = Arc::new(BrowsingSession {
            id: session_id.clone(),
            cart: Arc::new(cart),
            catalog: Arc::clone(&self.catalog),
            checkout: Arc::clone(&self.checkout),
            outbox: NotificationOutbox::new(),
            state: RwLock::new(SessionState {
                phase: SessionPhase::Browsing,
                view: CatalogView::new(&full),
                selector: DetailSelector::new(),
                checked_out_at: None,
            }),
            created_at: Utc::now(),
            last_active_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        });
        sessions.insert(session_id, Arc::clone(&session));

        if let Some(metrics) = &self.metrics {
            metrics.set_active_sessions(sessions.len());
        }
        crate::info_with_trace!(session_id = %session.id, "Session opened");
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> ServiceResult<Arc<BrowsingSession>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|session| {
                session.touch();
                Arc::clone(session)
            })
            .ok_or_else(|| ServiceError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Close a session after its pending cart writes have landed
    #[instrument(skip(self))]
    pub async fn close(&self, session_id: &str) -> ServiceResult<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            let session =
                sessions
                    .remove(session_id)
                    .ok_or_else(|| ServiceError::SessionNotFound {
                        session_id: session_id.to_string(),
                    })?;
            if let Some(metrics) = &self.metrics {
                metrics.set_active_sessions(sessions.len());
            }
            session
        };

        session.cart.flush().await;
        crate::info_with_trace!(session_id = %session_id, "Session closed");
        Ok(())
    }

    /// Drop every session that has outlived the registry's expiry. Idle
    /// carts are flushed and stay stored for the next visit; checked-out
    /// carts are removed from storage. Returns how many sessions went.
    #[instrument(skip(self))]
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let evicted: Vec<(Arc<BrowsingSession>, Eviction)> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<(String, Eviction)> = sessions
                .iter()
                .filter_map(|(id, session)| {
                    session
                        .expiry(&self.expiry, now)
                        .map(|eviction| (id.clone(), eviction))
                })
                .collect();

            let evicted: Vec<(Arc<BrowsingSession>, Eviction)> = expired
                .into_iter()
                .filter_map(|(id, eviction)| sessions.remove(&id).map(|s| (s, eviction)))
                .collect();

            if !evicted.is_empty() {
                if let Some(metrics) = &self.metrics {
                    metrics.set_active_sessions(sessions.len());
                }
            }
            evicted
        };

        for (session, eviction) in &evicted {
            match eviction {
                Eviction::Idle => session.cart.flush().await,
                Eviction::CheckedOut => session.cart.discard().await,
            }
            crate::info_with_trace!(
                session_id = %session.id,
                reason = eviction.as_str(),
                "Session evicted"
            );
        }
        evicted.len()
    }

    /// Run [`Self::evict_expired`] every `period` until the task is aborted.
    /// `period` must be non-zero.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.evict_expired().await;
            }
        })
    }

    /// Flush every open cart
    pub async fn flush_all(&self) {
        let sessions: Vec<Arc<BrowsingSession>> =
            self.sessions.read().await.values().cloned().collect();
        for session in sessions {
            session.cart.flush().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
