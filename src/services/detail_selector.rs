use tracing::instrument;

use crate::models::{CartEntry, Notification, ServiceError, ServiceRecord, ServiceResult, Size};
use crate::services::{CartStore, Notifier};

/// Binds the service open in the detail view to one size choice
#[derive(Debug, Clone, Default)]
pub struct DetailSelector {
    service: Option<ServiceRecord>,
    selected_size: Option<Size>,
}

impl DetailSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate the view for a service. Any earlier size choice is forgotten.
    pub fn open(&mut self, service: ServiceRecord) {
        self.service = Some(service);
        self.selected_size = None;
    }

    pub fn service(&self) -> Option<&ServiceRecord> {
        self.service.as_ref()
    }

    pub fn available_sizes(&self) -> &'static [Size] {
        &Size::ALL
    }

    pub fn select_size(&mut self, size: Size) -> ServiceResult<()> {
        if self.service.is_none() {
            return Err(ServiceError::NoServiceSelected);
        }
        self.selected_size = Some(size);
        Ok(())
    }

    pub fn selected_size(&self) -> Option<Size> {
        self.selected_size
    }

    /// Forward the open service and chosen size to the cart, presenting the
    /// outcome through `notifier`
    #[instrument(skip_all, fields(service_id = ?self.service.as_ref().map(|s| s.id.as_str()), size = ?self.selected_size))]
    pub async fn confirm_add(
        &self,
        cart: &CartStore,
        notifier: &dyn Notifier,
    ) -> ServiceResult<CartEntry> {
        let service = self.service.as_ref().ok_or(ServiceError::NoServiceSelected)?;

        let Some(size) = self.selected_size else {
            notifier.notify(Notification::missing_size()).await;
            return Err(ServiceError::MissingSize);
        };

        match cart.add(service.clone(), Some(size)).await {
            Ok(entry) => {
                notifier
                    .notify(Notification::add_confirmed(&service.name, size))
                    .await;
                Ok(entry)
            }
            Err(ServiceError::DuplicateEntry { service_id, size }) => {
                notifier
                    .notify(Notification::duplicate_entry(&service.name, size))
                    .await;
                Err(ServiceError::DuplicateEntry { service_id, size })
            }
            Err(e) => Err(e),
        }
    }
}
