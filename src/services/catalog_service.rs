use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use crate::models::{CatalogStatus, ServiceError, ServiceRecord, ServiceResult};
use crate::observability::Metrics;
use crate::repositories::ServiceRepository;

/// Case-insensitive substring filter on the display name. Only the empty
/// string means "no filter"; whitespace is matched literally.
pub fn filter_by_name(services: &[ServiceRecord], text: &str) -> Vec<ServiceRecord> {
    if text.is_empty() {
        return services.to_vec();
    }

    let needle = text.to_lowercase();
    services
        .iter()
        .filter(|service| service.name_contains(&needle))
        .cloned()
        .collect()
}

/// Group records into rows of two for the grid; an odd count leaves the
/// last row with a single record.
pub fn pair_rows(services: &[ServiceRecord]) -> Vec<Vec<ServiceRecord>> {
    services.chunks(2).map(<[ServiceRecord]>::to_vec).collect()
}

struct CatalogState {
    status: CatalogStatus,
    services: Arc<Vec<ServiceRecord>>,
}

/// Holds the service collection read from the document store
pub struct CatalogLoader {
    repository: Arc<dyn ServiceRepository>,
    state: RwLock<CatalogState>,
    load_gate: Mutex<()>,
    metrics: Option<Arc<Metrics>>,
}

impl CatalogLoader {
    pub fn new(repository: Arc<dyn ServiceRepository>) -> Self {
        Self {
            repository,
            state: RwLock::new(CatalogState {
                status: CatalogStatus::NotLoaded,
                services: Arc::new(Vec::new()),
            }),
            load_gate: Mutex::new(()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Read the whole collection unless an earlier read already succeeded.
    /// Concurrent callers wait for the read in flight instead of issuing
    /// their own. A failed read leaves the catalog empty and is not retried
    /// here; the next activation reads again.
    #[instrument(skip(self))]
    pub async fn load(&self) -> CatalogStatus {
        let _gate = self.load_gate.lock().await;
        if self.status().await == CatalogStatus::Loaded {
            return CatalogStatus::Loaded;
        }

        self.state.write().await.status = CatalogStatus::Loading;
        crate::info_with_trace!("Loading service catalog");

        let (status, services) = match self.repository.find_all().await {
            Ok(services) => {
                crate::info_with_trace!("Catalog loaded with {} services", services.len());
                (CatalogStatus::Loaded, services)
            }
            Err(e) => {
                crate::error_with_trace!(error = %e, "Failed to load service catalog");
                (CatalogStatus::Failed, Vec::new())
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_catalog_load(status == CatalogStatus::Loaded);
        }

        let mut state = self.state.write().await;
        state.status = status;
        state.services = Arc::new(services);
        status
    }

    pub async fn status(&self) -> CatalogStatus {
        self.state.read().await.status
    }

    /// The full list
    pub async fn services(&self) -> Arc<Vec<ServiceRecord>> {
        Arc::clone(&self.state.read().await.services)
    }

    pub async fn search(&self, text: &str) -> Vec<ServiceRecord> {
        filter_by_name(&self.services().await, text)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<ServiceRecord> {
        self.state
            .read()
            .await
            .services
            .iter()
            .find(|service| service.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::ServiceNotFound { id: id.to_string() })
    }
}

/// Per-session search state over the catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    search_text: String,
    filtered: Vec<ServiceRecord>,
}

impl CatalogView {
    pub fn new(full: &[ServiceRecord]) -> Self {
        Self {
            search_text: String::new(),
            filtered: full.to_vec(),
        }
    }

    /// Replace the filtered copy; empty text resets it to the full list
    pub fn search(&mut self, text: &str, full: &[ServiceRecord]) -> &[ServiceRecord] {
        self.search_text = text.to_string();
        self.filtered = filter_by_name(full, text);
        &self.filtered
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn filtered(&self) -> &[ServiceRecord] {
        &self.filtered
    }

    pub fn rows(&self) -> Vec<Vec<ServiceRecord>> {
        pair_rows(&self.filtered)
    }
}
