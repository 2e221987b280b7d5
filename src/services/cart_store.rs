use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::models::{Cart, CartEntry, CartSnapshot, ServiceRecord, ServiceResult, Size};
use crate::observability::Metrics;
use crate::repositories::CartStorage;
use crate::services::CartPersister;

/// Storage key of a session's cart
pub fn cart_storage_key(prefix: &str, session_id: &str) -> String {
    format!("{}:{}", prefix, session_id)
}

struct CartState {
    cart: Cart,
    version: u64,
}

/// The one cart of a browsing session.
///
/// Every mutation bumps the version and queues the full serialized cart for
/// the background writer. Reads never touch storage.
pub struct CartStore {
    key: String,
    storage: Arc<dyn CartStorage>,
    state: RwLock<CartState>,
    persister: CartPersister,
    metrics: Option<Arc<Metrics>>,
}

impl CartStore {
    /// Open the cart stored under `key`, replacing the in-memory state with
    /// whatever is persisted there. Unreadable values start an empty cart.
    pub async fn open(
        key: String,
        storage: Arc<dyn CartStorage>,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let persister = CartPersister::spawn(Arc::clone(&storage), key.clone());
        let store = Self {
            key,
            storage,
            state: RwLock::new(CartState {
                cart: Cart::new(),
                version: 0,
            }),
            persister,
            metrics,
        };

        if let Some(cart) = store.read_persisted().await {
            store.state.write().await.cart = cart;
        }
        store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn read_persisted(&self) -> Option<Cart> {
        let stored = match self.storage.load(&self.key).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read persisted cart");
                return None;
            }
        };

        let Some(json) = stored else {
            debug!(key = %self.key, "No persisted cart");
            return Some(Cart::new());
        };

        match serde_json::from_str::<Cart>(&json) {
            Ok(cart) => Some(cart),
            Err(e) => {
                warn!(key = %self.key, error = %e, "Persisted cart is not valid JSON");
                None
            }
        }
    }

    /// Drain pending writes, then replace the in-memory cart with the stored one
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn reload(&self) -> usize {
        self.persister.flush().await;

        let mut state = self.state.write().await;
        if let Some(cart) = self.read_persisted().await {
            state.cart = cart;
            state.version += 1;
        }
        state.cart.len()
    }

    fn persist(&self, state: &mut CartState) {
        state.version += 1;
        match serde_json::to_string(&state.cart) {
            Ok(payload) => self.persister.enqueue(state.version, payload),
            Err(e) => warn!(key = %self.key, error = %e, "Failed to serialize cart"),
        }
    }

    fn record(&self, operation: &str, success: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cart_operation(operation, success);
        }
    }

    /// Append a service in the chosen size; rejections leave the cart as is
    #[instrument(skip(self, service), fields(key = %self.key, service_id = %service.id, size = ?size))]
    pub async fn add(&self, service: ServiceRecord, size: Option<Size>) -> ServiceResult<CartEntry> {
        let mut state = self.state.write().await;

        match state.cart.add(service, size) {
            Ok(entry) => {
                self.persist(&mut state);
                self.record("add", true);
                crate::info_with_trace!(items = state.cart.len(), "Entry added to cart");
                Ok(entry)
            }
            Err(e) => {
                self.record("add", false);
                crate::warn_with_trace!(error = %e, "Cart add rejected");
                Err(e)
            }
        }
    }

    /// Remove every entry of a service regardless of size
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn remove(&self, service_id: &str) -> usize {
        let mut state = self.state.write().await;

        let removed = state.cart.remove(service_id);
        if removed > 0 {
            self.persist(&mut state);
        }
        self.record("remove", removed > 0);
        removed
    }

    /// Remove the single entry keyed by service id and size
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn remove_variant(&self, service_id: &str, size: Size) -> bool {
        let mut state = self.state.write().await;

        let removed = state.cart.remove_variant(service_id, size);
        if removed {
            self.persist(&mut state);
        }
        self.record("remove_variant", removed);
        removed
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.cart.clear();
        self.persist(&mut state);
        self.record("clear", true);
    }

    /// Empty the cart in one step, returning what it held
    pub async fn take_all(&self) -> Vec<CartEntry> {
        let mut state = self.state.write().await;
        let entries = state.cart.take();
        self.persist(&mut state);
        self.record("clear", true);
        entries
    }

    pub async fn total(&self) -> Decimal {
        self.state.read().await.cart.total()
    }

    pub async fn entries(&self) -> Vec<CartEntry> {
        self.state.read().await.cart.entries().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.cart.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.cart.is_empty()
    }

    pub async fn snapshot(&self) -> CartSnapshot {
        let state = self.state.read().await;
        state.cart.snapshot(state.version)
    }

    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    /// Wait for every queued write to land
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    /// Wait for queued writes, then drop the stored value under this key
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn discard(&self) {
        self.persister.flush().await;
        match self.storage.remove(&self.key).await {
            Ok(()) => debug!("Persisted cart removed"),
            Err(e) => warn!(error = %e, "Failed to remove persisted cart"),
        }
    }
}
