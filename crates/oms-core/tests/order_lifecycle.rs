// crates/oms-core/tests/order_lifecycle.rs
use chrono::{Duration, TimeZone, Utc};
use oms_core::{
    simulate_fills, ExecutionReport, IdGenerator, NewOrder, OrdStatus, RecordStore, RouteState,
    RoutingError, RoutingTable, Side, StoreError, VenueError,
};

fn order(id: &str, qty: u64, price: &str) -> NewOrder {
    NewOrder::new(id, Side::Buy, qty, price, "GBP")
}

fn report(id: &str, status: OrdStatus) -> ExecutionReport {
    ExecutionReport {
        cl_ord_id: id.to_string(),
        status,
        exec_type: Some(status),
    }
}

#[test]
fn duplicate_record_keeps_the_first_values() {
    let store = RecordStore::new();
    let t0 = Utc.with_ymd_and_hms(2025, 8, 4, 9, 30, 0).unwrap();

    store.create_at(&order("X", 1, "100.00"), t0).unwrap();
    let err = store
        .create_at(&order("X", 50, "250.00"), t0 + Duration::seconds(5))
        .unwrap_err();
    assert_eq!(err, StoreError::DuplicateRecord("X".to_string()));

    let record = store.get("X").unwrap();
    assert_eq!(record.quantity, "1");
    assert_eq!(record.price, "100.00");
    assert_eq!(record.status, OrdStatus::New);
    assert_eq!(record.created_at, t0);
    assert_eq!(record.updated_at, t0);
    assert_eq!(store.len(), 1);
}

#[test]
fn update_for_unknown_order_never_creates_a_record() {
    let store = RecordStore::new();

    let err = store.update(&report("ghost", OrdStatus::Fill)).unwrap_err();
    assert_eq!(err, StoreError::UnknownRecord("ghost".to_string()));
    assert!(store.get("ghost").is_none());
    assert!(store.is_empty());
}

#[test]
fn updates_overwrite_status_and_stamp() {
    let store = RecordStore::new();
    let t0 = Utc.with_ymd_and_hms(2025, 8, 4, 9, 30, 0).unwrap();
    let t1 = t0 + Duration::milliseconds(250);

    store.create_at(&order("X", 4, "100.00"), t0).unwrap();

    let previous = store
        .update_at(&report("X", OrdStatus::PartialFill), t0)
        .unwrap();
    assert_eq!(previous, OrdStatus::New);

    let previous = store.update_at(&report("X", OrdStatus::Fill), t1).unwrap();
    assert_eq!(previous, OrdStatus::PartialFill);

    let record = store.get("X").unwrap();
    assert_eq!(record.status, OrdStatus::Fill);
    assert_eq!(record.exec_type, OrdStatus::Fill);
    assert_eq!(record.created_at, t0);
    assert_eq!(record.updated_at, t1);
}

#[test]
fn report_without_exec_type_keeps_previous_exec_type() {
    let store = RecordStore::new();
    store.create(&order("X", 2, "1.5")).unwrap();

    let status_only = ExecutionReport {
        cl_ord_id: "X".to_string(),
        status: OrdStatus::PartialFill,
        exec_type: None,
    };
    store.update(&status_only).unwrap();

    let record = store.get("X").unwrap();
    assert_eq!(record.status, OrdStatus::PartialFill);
    assert_eq!(record.exec_type, OrdStatus::New);
}

#[test]
fn duplicate_route_is_rejected_and_first_origin_kept() {
    let routes = RoutingTable::new();
    routes.register("X", 1u64).unwrap();

    let err = routes.register("X", 2u64).unwrap_err();
    assert_eq!(err, RoutingError::DuplicateOrder("X".to_string()));
    assert_eq!(routes.origin("X"), Some(1));
    assert_eq!(routes.len(), 1);
}

#[test]
fn second_fill_after_terminal_is_a_routing_error() {
    let routes = RoutingTable::new();
    routes.register("X", 3u64).unwrap();

    routes.apply("X", OrdStatus::PartialFill).unwrap();
    let done = routes.apply("X", OrdStatus::Fill).unwrap();
    assert_eq!(done.origin, 3);
    assert_eq!(done.state, RouteState::Done);

    let err = routes.apply("X", OrdStatus::Fill).unwrap_err();
    assert_eq!(err, RoutingError::UnknownOrder("X".to_string()));
    assert!(routes.origin("X").is_none());
}

#[test]
fn rejection_and_cancel_are_terminal() {
    let routes = RoutingTable::new();
    routes.register("R", 1u64).unwrap();
    routes.register("C", 1u64).unwrap();

    routes.apply("R", OrdStatus::Rejected).unwrap();
    routes.apply("C", OrdStatus::Canceled).unwrap();
    assert!(routes.is_empty());
}

#[test]
fn fill_before_partial_fill_erases_route_early() {
    // Reports are applied in receipt order; a reordered partial fill
    // arriving after the fill no longer has a route.
    let routes = RoutingTable::new();
    routes.register("X", 9u64).unwrap();

    routes.apply("X", OrdStatus::Fill).unwrap();
    assert_eq!(
        routes.apply("X", OrdStatus::PartialFill),
        Err(RoutingError::UnknownOrder("X".to_string()))
    );
}

#[test]
fn venue_splits_quantity_into_partial_and_fill() {
    let [partial, fill] = simulate_fills(&order("X", 5, "100.00")).unwrap();

    assert_eq!(partial.status, OrdStatus::PartialFill);
    assert_eq!((partial.last_qty, partial.cum_qty, partial.leaves_qty), (2, 2, 3));

    assert_eq!(fill.status, OrdStatus::Fill);
    assert_eq!((fill.last_qty, fill.cum_qty, fill.leaves_qty), (3, 5, 0));
}

#[test]
fn venue_still_sends_partial_for_single_lot() {
    let [partial, fill] = simulate_fills(&order("X", 1, "100.00")).unwrap();
    assert_eq!(partial.last_qty, 0);
    assert_eq!(fill.last_qty, 1);
    assert_eq!(fill.cum_qty, 1);
}

#[test]
fn venue_refuses_non_numeric_or_zero_quantity() {
    let mut bad = order("X", 1, "100.00");
    bad.quantity = "ten".to_string();
    assert_eq!(
        simulate_fills(&bad),
        Err(VenueError::InvalidQuantity("ten".to_string()))
    );

    bad.quantity = "0".to_string();
    assert!(simulate_fills(&bad).is_err());
}

#[test]
fn status_codes_round_trip() {
    for status in [
        OrdStatus::New,
        OrdStatus::PartialFill,
        OrdStatus::Fill,
        OrdStatus::Canceled,
        OrdStatus::Rejected,
    ] {
        assert_eq!(OrdStatus::from_code(status.code()), Some(status));
    }
    assert_eq!(OrdStatus::from_code("Z"), None);
    assert_eq!(Side::from_code("2"), Some(Side::Sell));
}

#[test]
fn seeded_generators_are_reproducible() {
    let a = IdGenerator::seeded(24);
    let b = IdGenerator::seeded(24);

    let id = a.generate(15);
    assert_eq!(id.len(), 15);
    assert!(id.chars().all(|c| c.is_ascii_lowercase()));
    assert_eq!(id, b.generate(15));
    assert_ne!(a.next_id(), a.next_id());
    assert_eq!(a.generate(0), "");
}
