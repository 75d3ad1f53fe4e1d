//! End-to-end cart scenarios over the public API.
//!
//! Walks the documented flows: a widget cart with global tax
//! (3 × £10.00 → subtotal 30.00, 10% tax 3.00, total 33.00), the
//! store/restore round trip (one-shot, duplicate store rejected), and
//! merging a stored cart into a live one with quantity accumulation.

use rust_decimal::Decimal;
use testresult::TestResult;

use trolley::prelude::*;

struct Keyboard;

impl Buyable for Keyboard {
    fn identifier(&self, _options: &ItemOptions) -> ItemId {
        ItemId::from("kb-301")
    }

    fn description(&self, options: &ItemOptions) -> String {
        match options.get("layout") {
            Some(layout) => format!("Keyboard ({layout})"),
            None => "Keyboard".to_string(),
        }
    }

    fn price(&self, _options: &ItemOptions) -> Decimal {
        Decimal::new(49_95, 2)
    }

    fn weight(&self, _options: &ItemOptions) -> Decimal {
        Decimal::new(8, 1)
    }
}

struct Customer;

impl InstanceIdentifier for Customer {
    fn instance_identifier(&self) -> Instance {
        Instance::from("customer-42")
    }

    fn instance_global_discount(&self) -> Decimal {
        Decimal::from(5)
    }
}

fn widget_spec(qty: i64) -> ItemSpec<'static> {
    ItemSpec::explicit(
        1,
        "Widget",
        Decimal::from(qty),
        Decimal::from(10),
        Decimal::from(2),
    )
}

#[test]
fn widget_cart_scenario() -> TestResult {
    let mut cart = Cart::default();

    cart.add(widget_spec(3))?;

    assert_eq!(cart.count(), Decimal::from(3));
    assert_eq!(cart.count_items(), 1);
    assert_eq!(cart.subtotal(), Decimal::from(30));
    assert_eq!(cart.subtotal_formatted(), "30.00");

    cart.set_global_tax(Decimal::from(10));

    assert_eq!(cart.tax(), Decimal::from(3));
    assert_eq!(cart.total(), Decimal::from(33));
    assert_eq!(cart.tax_formatted(), "3.00");
    assert_eq!(cart.total_formatted(), "33.00");
    assert_eq!(cart.weight(), Decimal::from(6));

    Ok(())
}

#[test]
fn buyable_snapshot_flows_through_totals() -> TestResult {
    let mut cart = Cart::default();

    let item = cart.add(ItemSpec::buyable_with_options(
        &Keyboard,
        Decimal::from(2),
        ItemOptions::from_pairs([("layout", "ISO")]),
    ))?;

    assert_eq!(item.name(), "Keyboard (ISO)");
    assert_eq!(cart.subtotal(), Decimal::new(99_90, 2));
    assert_eq!(cart.weight(), Decimal::new(16, 1));

    Ok(())
}

#[test]
fn duplicate_store_is_rejected() -> TestResult {
    let mut cart = Cart::default();

    cart.add(widget_spec(1))?;
    cart.store("user-7")?;

    let second = cart.store("user-7");

    assert!(matches!(
        second,
        Err(CartError::AlreadyStored { identifier, .. }) if identifier == "user-7"
    ));

    Ok(())
}

#[test]
fn restore_is_a_one_shot_move() -> TestResult {
    let gateway = MemoryStorageGateway::default();
    let mut cart = Cart::builder().gateway(gateway.clone()).build();

    let row_id = cart.add(widget_spec(3))?.row_id().clone();
    cart.store("user-7")?;

    cart.clear();
    assert!(cart.is_empty());

    assert!(cart.restore("user-7"));
    assert_eq!(cart.count(), Decimal::from(3));
    assert!(cart.get(&row_id).is_ok());
    assert!(cart.created_at().is_some());

    // The record was consumed; a second restore finds nothing.
    assert!(gateway.is_empty());
    assert!(!cart.restore("user-7"));

    Ok(())
}

#[test]
fn restore_replaces_rather_than_sums() -> TestResult {
    let gateway = MemoryStorageGateway::default();
    let mut cart = Cart::builder().gateway(gateway.clone()).build();

    cart.add(widget_spec(3))?;
    cart.store("user-7")?;

    // The live line keeps moving after the store.
    let row_id = cart.content().first().map(|i| i.row_id().clone());
    if let Some(row_id) = &row_id {
        cart.update(row_id, UpdateSpec::Qty(Decimal::from(9)))?;
    }

    assert!(cart.restore("user-7"));

    // The stored quantity wins outright.
    assert_eq!(cart.count(), Decimal::from(3));

    Ok(())
}

#[test]
fn erase_drops_the_record_and_keeps_live_content() -> TestResult {
    let gateway = MemoryStorageGateway::default();
    let events = RecordingEventBus::default();
    let mut cart = Cart::builder()
        .gateway(gateway.clone())
        .events(events.clone())
        .build();

    cart.add(widget_spec(2))?;
    cart.store("user-7")?;

    assert!(!cart.erase("someone-else"));
    assert!(cart.erase("user-7"));
    assert!(gateway.is_empty());
    assert_eq!(cart.count(), Decimal::from(2));
    assert_eq!(
        events.names().last().copied(),
        Some("erased")
    );

    Ok(())
}

#[test]
fn merge_sums_quantities_and_retains_the_record() -> TestResult {
    let gateway = MemoryStorageGateway::default();

    // One shopper stores a cart with two widgets…
    let mut stored = Cart::builder().gateway(gateway.clone()).build();
    stored.add(widget_spec(2))?;
    stored.store("user-7")?;

    // …and a later session with three widgets merges it in.
    let mut live = Cart::builder().gateway(gateway.clone()).build();
    live.add(widget_spec(3))?;

    assert!(live.merge("user-7", false, false, false, &Instance::default()));

    assert_eq!(live.count_items(), 1);
    assert_eq!(live.count(), Decimal::from(5));
    assert_eq!(gateway.len(), 1);

    Ok(())
}

#[test]
fn merge_honours_keep_flags_and_dispatch() -> TestResult {
    let gateway = MemoryStorageGateway::default();

    let mut stored = Cart::builder().gateway(gateway.clone()).build();
    stored.add(ItemSpec::Attributes(ItemAttributes {
        id: Some(ItemId::from(8)),
        name: Some("Gadget".to_string()),
        price: Some(Decimal::from(20)),
        tax_rate: Some(Decimal::from(9)),
        discount_rate: Some(Decimal::from(5)),
        ..ItemAttributes::default()
    }))?;
    stored.store("user-7")?;

    let events = RecordingEventBus::default();
    let mut keeping = Cart::builder()
        .gateway(gateway.clone())
        .events(events.clone())
        .build();
    keeping.set_global_tax(Decimal::from(21));

    assert!(keeping.merge("user-7", true, true, true, &Instance::default()));

    let merged = keeping.content().first().expect("merged line");
    assert_eq!(merged.tax_rate(), Decimal::from(9));
    assert_eq!(merged.discount_rate(), Decimal::from(5));
    assert_eq!(events.names(), vec!["adding", "added", "merged"]);

    // Without the keep flags, a fresh cart's global rates overwrite the
    // stored ones, and no per-line notifications fire.
    let silent = RecordingEventBus::default();
    let mut overriding = Cart::builder()
        .gateway(gateway.clone())
        .events(silent.clone())
        .build();
    overriding.set_global_tax(Decimal::from(21));

    assert!(overriding.merge("user-7", false, false, false, &Instance::default()));

    let overridden = overriding.content().first().expect("merged line");
    assert_eq!(overridden.tax_rate(), Decimal::from(21));
    assert_eq!(overridden.discount_rate(), Decimal::ZERO);
    assert_eq!(silent.names(), vec!["merged"]);

    Ok(())
}

#[test]
fn merge_against_a_missing_record_is_a_no_op() {
    let mut cart = Cart::default();

    assert!(!cart.merge("nobody", false, false, false, &Instance::default()));
}

#[test]
fn instance_owner_names_the_cart_and_discounts_it() -> TestResult {
    let mut cart = Cart::default();

    cart.switch_instance_for(&Customer);
    cart.add(widget_spec(2))?;

    assert_eq!(cart.instance(), &Instance::from("customer-42"));
    assert_eq!(cart.discount(), Decimal::ONE);
    assert_eq!(cart.subtotal(), Decimal::from(19));

    Ok(())
}

#[test]
fn coupons_and_shipping_fold_over_the_cart() -> TestResult {
    let config = CartConfig {
        shipping: ShippingConfig {
            standard_zones: vec!["NL".to_string()],
            ..ShippingConfig::default()
        },
        ..CartConfig::default()
    };

    let mut cart = Cart::builder().config(config).build();
    cart.add(widget_spec(2))?;

    let coupons = [
        Coupon::relative("SPRING10", Decimal::from(10)),
        Coupon::absolute("WELCOME5", Decimal::from(5)),
    ];

    assert_eq!(cart.coupon_discount(&coupons), Decimal::from(7));

    let domestic = ShippingContext {
        free_shipping: false,
        country: Some("NL".to_string()),
    };
    let abroad = ShippingContext {
        free_shipping: false,
        country: Some("US".to_string()),
    };
    let free = ShippingContext {
        free_shipping: true,
        country: Some("US".to_string()),
    };

    assert_eq!(cart.shipping(&domestic), Decimal::ONE);
    assert_eq!(cart.shipping(&abroad), Decimal::from(2));
    assert_eq!(cart.shipping(&free), Decimal::ZERO);

    Ok(())
}

#[test]
fn snapshots_survive_a_serialization_round_trip() -> TestResult {
    let session = MemorySessionStore::default();
    let mut cart = Cart::builder().session(session.clone()).build();

    cart.add(ItemSpec::explicit_with_options(
        1,
        "Widget",
        Decimal::from(2),
        Decimal::from(10),
        Decimal::from(2),
        ItemOptions::from_pairs([("color", "red"), ("size", "XL")]),
    ))?;

    let snapshot = session.get(&Instance::default()).expect("missing slot");
    let json = snapshot.to_json()?;
    let back = CartSnapshot::from_json(&json)?;

    assert_eq!(back.version(), SNAPSHOT_VERSION);
    assert_eq!(back, snapshot);

    Ok(())
}
