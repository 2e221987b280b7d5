#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rust_decimal_macros::dec;
use spa_storefront::{
    handlers::{create_router, ApiState},
    models::ServiceRecord,
    repositories::{CartStorage, InMemoryCartStorage, InMemoryServiceRepository},
    services::{CatalogLoader, CheckoutHandoff, CheckoutScreen, SessionExpiry, SessionRegistry},
    Metrics,
};
use tokio::net::TcpListener;

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub storage: Arc<InMemoryCartStorage>,
    pub registry: Arc<SessionRegistry>,
}

pub fn test_service(id: &str, name: &str, price: rust_decimal::Decimal) -> ServiceRecord {
    ServiceRecord {
        id: id.to_string(),
        creator: "Test Spa".to_string(),
        price,
        name: name.to_string(),
        description: Some(format!("{} for testing", name)),
        image_url: None,
        customizations: vec![],
        sizes: vec![],
    }
}

pub fn seed_services() -> Vec<ServiceRecord> {
    vec![
        test_service("svc-1", "Foot Massage", dec!(100)),
        test_service("svc-2", "Towel Service", dec!(45.50)),
        test_service("svc-3", "Hot Stone Therapy", dec!(80)),
    ]
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_storage(Arc::new(InMemoryCartStorage::new())).await
    }

    /// Start a fresh server whose carts persist to `storage`
    pub async fn with_storage(storage: Arc<InMemoryCartStorage>) -> Self {
        Self::start(storage, SessionExpiry::default()).await
    }

    pub async fn with_expiry(expiry: SessionExpiry) -> Self {
        Self::start(Arc::new(InMemoryCartStorage::new()), expiry).await
    }

    async fn start(storage: Arc<InMemoryCartStorage>, expiry: SessionExpiry) -> Self {
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let catalog = Arc::new(
            CatalogLoader::new(Arc::new(InMemoryServiceRepository::new(seed_services())))
                .with_metrics(metrics.clone()),
        );
        let screen = Arc::new(CheckoutScreen::new());
        let checkout = Arc::new(CheckoutHandoff::new(screen.clone()).with_metrics(metrics.clone()));
        let cart_storage: Arc<dyn CartStorage> = storage.clone();
        let registry = Arc::new(
            SessionRegistry::new(catalog, cart_storage, checkout, "@cart".to_string())
                .with_expiry(expiry)
                .with_metrics(metrics.clone()),
        );

        let app = create_router(
            ApiState {
                registry: registry.clone(),
                checkout_screen: Some(screen),
                metrics,
            },
            Duration::from_secs(10),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        Self {
            client: Client::new(),
            base_url,
            storage,
            registry,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Open a session under a fixed id and return the id
    pub async fn open_session(&self, session_id: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/sessions"))
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await
            .expect("Failed to open session");
        assert_eq!(response.status().as_u16(), 201);

        let body: serde_json::Value = response.json().await.expect("Failed to parse session");
        body["session_id"]
            .as_str()
            .expect("Expected session_id")
            .to_string()
    }

    /// Open the detail view, pick a size and confirm; returns the HTTP status
    pub async fn add_to_cart(&self, session_id: &str, service_id: &str, size: &str) -> u16 {
        let response = self
            .client
            .post(self.url(&format!(
                "/api/sessions/{}/detail/{}",
                session_id, service_id
            )))
            .send()
            .await
            .expect("Failed to open detail");
        assert_eq!(response.status().as_u16(), 200);

        let response = self
            .client
            .put(self.url(&format!("/api/sessions/{}/detail/size", session_id)))
            .json(&serde_json::json!({ "size": size }))
            .send()
            .await
            .expect("Failed to select size");
        assert_eq!(response.status().as_u16(), 200);

        self.client
            .post(self.url(&format!("/api/sessions/{}/detail/confirm", session_id)))
            .send()
            .await
            .expect("Failed to confirm add")
            .status()
            .as_u16()
    }
}
