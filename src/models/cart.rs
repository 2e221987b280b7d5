use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ServiceError, ServiceRecord, ServiceResult, Size};

/// A service record bound to one chosen size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(flatten)]
    pub service: ServiceRecord,
    #[serde(rename = "Size")]
    pub size: Size,
}

impl CartEntry {
    pub fn new(service: ServiceRecord, size: Size) -> Self {
        Self { service, size }
    }

    pub fn service_id(&self) -> &str {
        &self.service.id
    }

    pub fn price(&self) -> Decimal {
        self.service.price
    }

    /// Two entries are the same variant when both service id and size match
    pub fn is_variant(&self, service_id: &str, size: Size) -> bool {
        self.service.id == service_id && self.size == size
    }
}

/// Ordered cart of service/size entries, insertion order preserved
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

/// Cart contents as shown by the cart view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartEntry>,
    pub item_count: usize,
    pub total_amount: Decimal,
    pub version: u64,
}

/// Payload handed to the checkout destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub order_id: String,
    pub session_id: String,
    pub cart_items: Vec<CartEntry>,
    pub total_amount: Decimal,
    pub checked_out_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CartEntry>) -> Self {
        Self { entries }
    }

    /// Append a service in the chosen size.
    ///
    /// Rejects without mutating when no size is chosen or when the same
    /// service/size pair is already present.
    pub fn add(&mut self, service: ServiceRecord, size: Option<Size>) -> ServiceResult<CartEntry> {
        let size = size.ok_or(ServiceError::MissingSize)?;

        if self.contains_variant(&service.id, size) {
            return Err(ServiceError::DuplicateEntry {
                service_id: service.id,
                size,
            });
        }

        let entry = CartEntry::new(service, size);
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove every entry of a service, whatever its size. Returns how many
    /// entries were removed.
    pub fn remove(&mut self, service_id: &str) -> usize {
        let original_len = self.entries.len();
        self.entries.retain(|entry| entry.service_id() != service_id);
        original_len - self.entries.len()
    }

    /// Remove the single entry keyed by service id and size
    pub fn remove_variant(&mut self, service_id: &str, size: Size) -> bool {
        let original_len = self.entries.len();
        self.entries
            .retain(|entry| !entry.is_variant(service_id, size));
        self.entries.len() != original_len
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Empty the cart, handing back what it held
    pub fn take(&mut self) -> Vec<CartEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Sum of entry prices, computed on every call
    pub fn total(&self) -> Decimal {
        self.entries.iter().map(CartEntry::price).sum()
    }

    pub fn contains_variant(&self, service_id: &str, size: Size) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.is_variant(service_id, size))
    }

    pub fn contains_service(&self, service_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.service_id() == service_id)
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self, version: u64) -> CartSnapshot {
        CartSnapshot {
            items: self.entries.clone(),
            item_count: self.entries.len(),
            total_amount: self.total(),
            version,
        }
    }
}

impl CheckoutPayload {
    /// Build the payload for a set of entries; the total is derived from the
    /// same entries so the two can never disagree.
    pub fn new(session_id: String, cart_items: Vec<CartEntry>) -> Self {
        let total_amount = cart_items.iter().map(CartEntry::price).sum();
        Self {
            order_id: format!("ORD-{}", Uuid::new_v4().simple()),
            session_id,
            cart_items,
            total_amount,
            checked_out_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn service(id: &str, price: Decimal) -> ServiceRecord {
        ServiceRecord {
            id: id.to_string(),
            creator: "Lan".to_string(),
            price,
            name: format!("Service {}", id),
            description: None,
            image_url: None,
            customizations: vec![],
            sizes: vec![],
        }
    }

    #[test]
    fn test_cart_creation() {
        let cart = Cart::new();

        assert!(cart.is_empty());
        assert_eq!(cart.len(), 0);
        assert_eq!(cart.total(), dec!(0));
    }

    #[test]
    fn test_add_requires_size() {
        let mut cart = Cart::new();

        let result = cart.add(service("a", dec!(100)), None);

        assert!(matches!(result, Err(ServiceError::MissingSize)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_duplicate_variant_is_rejected() {
        let mut cart = Cart::new();

        cart.add(service("a", dec!(100)), Some(Size::M)).unwrap();
        let result = cart.add(service("a", dec!(100)), Some(Size::M));

        match result {
            Err(ServiceError::DuplicateEntry { service_id, size }) => {
                assert_eq!(service_id, "a");
                assert_eq!(size, Size::M);
            }
            other => panic!("Expected DuplicateEntry, got {:?}", other),
        }
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_same_service_in_two_sizes_adds_two_entries() {
        let mut cart = Cart::new();

        cart.add(service("a", dec!(100)), Some(Size::M)).unwrap();
        cart.add(service("a", dec!(100)), Some(Size::L)).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total(), dec!(200));
    }

    #[test]
    fn test_remove_drops_every_size_of_a_service() {
        let mut cart = Cart::new();
        cart.add(service("a", dec!(100)), Some(Size::M)).unwrap();
        cart.add(service("b", dec!(40)), Some(Size::S)).unwrap();
        cart.add(service("a", dec!(100)), Some(Size::L)).unwrap();

        let removed = cart.remove("a");

        assert_eq!(removed, 2);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.entries()[0].service_id(), "b");
        assert_eq!(cart.total(), dec!(40));
        assert_eq!(cart.remove("missing"), 0);
    }

    #[test]
    fn test_remove_variant_keeps_other_sizes() {
        let mut cart = Cart::new();
        cart.add(service("a", dec!(100)), Some(Size::M)).unwrap();
        cart.add(service("a", dec!(100)), Some(Size::L)).unwrap();

        assert!(cart.remove_variant("a", Size::M));
        assert!(!cart.remove_variant("a", Size::M));

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.entries()[0].size, Size::L);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut cart = Cart::new();
        for (id, size) in [("c", Size::S), ("a", Size::XL), ("b", Size::FourXl)] {
            cart.add(service(id, dec!(1)), Some(size)).unwrap();
        }

        let ids: Vec<&str> = cart.entries().iter().map(CartEntry::service_id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_take_empties_cart() {
        let mut cart = Cart::new();
        cart.add(service("a", dec!(100)), Some(Size::M)).unwrap();

        let taken = cart.take();

        assert_eq!(taken.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_entry_serializes_flat_with_size() {
        let entry = CartEntry::new(service("a", dec!(100)), Size::ThreeXl);
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["id"], "a");
        assert_eq!(value["Size"], "3XL");
        assert_eq!(value["ServiceName"], "Service a");

        let cart = Cart::from_entries(vec![entry.clone()]);
        let json = serde_json::to_string(&cart).unwrap();
        assert!(json.starts_with('['));

        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.entries(), &[entry]);
    }

    #[test]
    fn test_checkout_payload_totals_its_items() {
        let items = vec![
            CartEntry::new(service("a", dec!(100)), Size::M),
            CartEntry::new(service("a", dec!(100)), Size::L),
        ];

        let payload = CheckoutPayload::new("session-1".to_string(), items);

        assert_eq!(payload.total_amount, dec!(200));
        assert!(payload.order_id.starts_with("ORD-"));

        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("cartItems").is_some());
        assert!(value.get("totalAmount").is_some());
    }
}
