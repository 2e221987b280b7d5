use proptest::prelude::*;
use rust_decimal::Decimal;
use spa_storefront::models::{
    validate_session_id, Cart, CheckoutPayload, ServiceError, ServiceRecord, Size,
    MAX_SESSION_ID_LENGTH,
};
use spa_storefront::services::{filter_by_name, pair_rows};

#[derive(Debug, Clone)]
enum CartOp {
    Add { service: usize, size: Option<Size> },
    Remove { service: usize },
    RemoveVariant { service: usize, size: Size },
}

prop_compose! {
    fn arb_size()(index in 0usize..Size::ALL.len()) -> Size {
        Size::ALL[index]
    }
}

prop_compose! {
    fn arb_valid_price()(cents in 1u32..100000) -> Decimal {
        Decimal::from_parts(cents, 0, 0, false, 2)
    }
}

prop_compose! {
    fn arb_service(id: String)(
        name in "[a-zA-Z ]{1,24}",
        price in arb_valid_price(),
    ) -> ServiceRecord {
        ServiceRecord {
            id: id.clone(),
            creator: "Spa".to_string(),
            price,
            name,
            description: None,
            image_url: None,
            customizations: vec![],
            sizes: vec![],
        }
    }
}

fn arb_catalog() -> impl Strategy<Value = Vec<ServiceRecord>> {
    (1usize..8).prop_flat_map(|count| {
        (0..count)
            .map(|i| arb_service(format!("svc-{}", i)))
            .collect::<Vec<_>>()
    })
}

fn arb_cart_op(services: usize) -> impl Strategy<Value = CartOp> {
    prop_oneof![
        4 => (0..services, prop::option::of(arb_size()))
            .prop_map(|(service, size)| CartOp::Add { service, size }),
        1 => (0..services).prop_map(|service| CartOp::Remove { service }),
        1 => (0..services, arb_size())
            .prop_map(|(service, size)| CartOp::RemoveVariant { service, size }),
    ]
}

fn arb_catalog_and_ops() -> impl Strategy<Value = (Vec<ServiceRecord>, Vec<CartOp>)> {
    arb_catalog().prop_flat_map(|catalog| {
        let count = catalog.len();
        (
            Just(catalog),
            prop::collection::vec(arb_cart_op(count), 0..40),
        )
    })
}

proptest! {
    #[test]
    fn test_search_returns_case_insensitive_subset(
        catalog in arb_catalog(),
        text in "[a-zA-Z ]{0,4}",
    ) {
        let filtered = filter_by_name(&catalog, &text);

        if text.is_empty() {
            prop_assert_eq!(filtered, catalog);
        } else {
            let needle = text.to_lowercase();
            let expected: Vec<ServiceRecord> = catalog
                .iter()
                .filter(|s| s.name.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            prop_assert_eq!(filtered, expected);
        }
    }

    #[test]
    fn test_rows_preserve_order_and_pair_up(catalog in arb_catalog()) {
        let rows = pair_rows(&catalog);

        prop_assert_eq!(rows.len(), (catalog.len() + 1) / 2);
        prop_assert!(rows.iter().all(|row| !row.is_empty() && row.len() <= 2));
        let flattened: Vec<ServiceRecord> = rows.into_iter().flatten().collect();
        prop_assert_eq!(flattened, catalog);
    }

    #[test]
    fn test_cart_invariants_hold_for_any_sequence(
        (catalog, ops) in arb_catalog_and_ops(),
    ) {
        let mut cart = Cart::new();

        for op in ops {
            let before = cart.len();
            match op {
                CartOp::Add { service, size } => {
                    let record = catalog[service].clone();
                    let already_present = size
                        .map(|s| cart.contains_variant(&record.id, s))
                        .unwrap_or(false);

                    match (cart.add(record, size), size) {
                        (Err(ServiceError::MissingSize), None) => {
                            prop_assert_eq!(cart.len(), before);
                        }
                        (Err(ServiceError::DuplicateEntry { .. }), Some(_)) => {
                            prop_assert!(already_present);
                            prop_assert_eq!(cart.len(), before);
                        }
                        (Ok(_), Some(_)) => {
                            prop_assert!(!already_present);
                            prop_assert_eq!(cart.len(), before + 1);
                        }
                        (other, size) => {
                            prop_assert!(false, "unexpected add outcome {:?} for {:?}", other, size);
                        }
                    }
                }
                CartOp::Remove { service } => {
                    let id = &catalog[service].id;
                    let removed = cart.remove(id);
                    prop_assert!(!cart.contains_service(id));
                    prop_assert_eq!(cart.len(), before - removed);
                }
                CartOp::RemoveVariant { service, size } => {
                    let id = &catalog[service].id;
                    let removed = cart.remove_variant(id, size);
                    prop_assert!(!cart.contains_variant(id, size));
                    prop_assert_eq!(cart.len(), before - usize::from(removed));
                }
            }

            let expected_total: Decimal = cart.entries().iter().map(|e| e.service.price).sum();
            prop_assert_eq!(cart.total(), expected_total);

            for size in Size::ALL {
                for record in &catalog {
                    let copies = cart
                        .entries()
                        .iter()
                        .filter(|e| e.is_variant(&record.id, size))
                        .count();
                    prop_assert!(copies <= 1);
                }
            }
        }
    }

    #[test]
    fn test_checkout_empties_cart_and_forwards_total(
        (catalog, ops) in arb_catalog_and_ops(),
    ) {
        let mut cart = Cart::new();
        for op in ops {
            if let CartOp::Add { service, size } = op {
                let _ = cart.add(catalog[service].clone(), size);
            }
        }

        let total_before = cart.total();
        let count_before = cart.len();

        let payload = CheckoutPayload::new("session".to_string(), cart.take());

        prop_assert!(cart.is_empty());
        prop_assert_eq!(cart.total(), Decimal::ZERO);
        prop_assert_eq!(payload.total_amount, total_before);
        prop_assert_eq!(payload.cart_items.len(), count_before);
    }

    #[test]
    fn test_session_id_validation(session_id in ".{0,40}") {
        let trimmed = session_id.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_SESSION_ID_LENGTH
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        prop_assert_eq!(validate_session_id(&session_id).is_ok(), valid);
    }
}

#[test]
fn test_two_sizes_then_remove_all() {
    let service = ServiceRecord {
        id: "a".to_string(),
        creator: "Spa".to_string(),
        price: Decimal::from(100),
        name: "Foot Massage".to_string(),
        description: None,
        image_url: None,
        customizations: vec![],
        sizes: vec![],
    };
    let mut cart = Cart::new();

    cart.add(service.clone(), Some(Size::M)).unwrap();
    cart.add(service, Some(Size::L)).unwrap();
    assert_eq!(cart.total(), Decimal::from(200));

    assert_eq!(cart.remove("a"), 2);
    assert!(cart.is_empty());
    assert_eq!(cart.total(), Decimal::ZERO);
}
