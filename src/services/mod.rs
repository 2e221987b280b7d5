// Services module - storefront logic layer

pub mod cart_persister;
pub mod cart_store;
pub mod catalog_service;
pub mod checkout;
pub mod detail_selector;
pub mod notifier;
pub mod session;

pub use cart_persister::CartPersister;
pub use cart_store::{cart_storage_key, CartStore};
pub use catalog_service::{filter_by_name, pair_rows, CatalogLoader, CatalogView};
pub use checkout::{CheckoutHandoff, CheckoutScreen, EventBridgeHandoff, HandoffError, HandoffSink};
pub use detail_selector::DetailSelector;
pub use notifier::{NotificationOutbox, Notifier, TracingNotifier};
pub use session::{BrowsingSession, SessionExpiry, SessionRegistry, SessionSummary};
