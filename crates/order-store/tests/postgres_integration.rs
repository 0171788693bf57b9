//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and run
//! one at a time, since each truncates the tables.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CartId, CartItemId, EventId, OrderId, ShippingAddress, UserRef};
use order_store::{
    CartItemRecord, CartRecord, ChangeSet, OrderEventRecord, OrderLineRecord, OrderQuery,
    OrderRecord, OrderStore, OrderStoreExt, PostgresOrderStore, StoreError, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_events, order_lines, orders, cart_items, carts")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn new_cart(user: &str) -> CartRecord {
    let now = Utc::now();
    CartRecord {
        id: CartId::new(),
        user_ref: UserRef::from(user),
        status: "OPEN".to_string(),
        items: vec![],
        created_at: now,
        updated_at: now,
        version: Version::initial(),
    }
}

fn new_item(product: &str, quantity: i32, price: i64) -> CartItemRecord {
    let now = Utc::now();
    CartItemRecord {
        id: CartItemId::new(),
        product_ref: product.to_string(),
        quantity,
        unit_price_cents: price,
        currency: "USD".to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn new_order(user: &str) -> OrderRecord {
    let now = Utc::now();
    OrderRecord {
        id: OrderId::new(),
        user_ref: UserRef::from(user),
        status: "PENDING".to_string(),
        total_cents: 17500,
        currency: "USD".to_string(),
        placed_at: None,
        shipping: ShippingAddress {
            recipient: Some("Ada Lovelace".to_string()),
            city: Some("London".to_string()),
            ..Default::default()
        },
        payment_method: Default::default(),
        customer: Default::default(),
        lines: vec![OrderLineRecord {
            product_ref: "SKU-1".to_string(),
            product_name: None,
            quantity: 2,
            unit_price_cents: 5000,
            currency: "USD".to_string(),
        }],
        created_at: now,
        updated_at: now,
        version: Version::initial(),
    }
}

fn status_event(order_id: OrderId, from: &str, to: &str) -> OrderEventRecord {
    OrderEventRecord {
        id: EventId::new(),
        order_id,
        event_type: "OrderStatusChanged".to_string(),
        payload: serde_json::json!({"from": from, "to": to}),
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[serial]
async fn cart_round_trip_keeps_item_order() {
    let store = get_test_store().await;
    let mut cart = new_cart("u-1");
    cart.items.push(new_item("SKU-B", 1, 100));
    cart.items.push(new_item("SKU-A", 2, 200));

    store.save_cart(cart.clone()).await.unwrap();

    let loaded = store.get_cart(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded.version, Version::first());
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].product_ref, "SKU-B");
    assert_eq!(loaded.items[1].product_ref, "SKU-A");
    assert_eq!(loaded.items[1].quantity, 2);
}

#[tokio::test]
#[serial]
async fn cart_update_replaces_items() {
    let store = get_test_store().await;
    let mut cart = new_cart("u-1");
    cart.items.push(new_item("SKU-A", 1, 100));
    store.save_cart(cart.clone()).await.unwrap();

    cart.version = Version::first();
    cart.items.clear();
    cart.items.push(new_item("SKU-C", 3, 300));
    store.save_cart(cart.clone()).await.unwrap();

    let loaded = store.get_cart(cart.id).await.unwrap().unwrap();
    assert_eq!(loaded.version, Version::new(2));
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].product_ref, "SKU-C");
}

#[tokio::test]
#[serial]
async fn stale_cart_write_is_a_conflict() {
    let store = get_test_store().await;
    let mut cart = new_cart("u-1");
    store.save_cart(cart.clone()).await.unwrap();

    cart.version = Version::first();
    store.save_cart(cart.clone()).await.unwrap();

    // Second writer still holds version 1
    let result = store.save_cart(cart).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(2)
    ));
}

#[tokio::test]
#[serial]
async fn checkout_change_set_is_atomic() {
    let store = get_test_store().await;
    let mut cart = new_cart("u-1");
    cart.items.push(new_item("SKU-A", 1, 100));
    store.save_cart(cart.clone()).await.unwrap();

    // Stale cart version: the order insert must roll back with it
    let order = new_order("u-1");
    cart.status = "CHECKED_OUT".to_string();
    let changes = ChangeSet::new().put_order(order.clone()).put_cart(cart);

    assert!(store.commit(changes).await.is_err());
    assert!(store.get_order(order.id).await.unwrap().is_none());

    let stored_cart = store
        .find_open_cart(&UserRef::from("u-1"))
        .await
        .unwrap();
    assert!(stored_cart.is_some());
}

#[tokio::test]
#[serial]
async fn order_with_lines_and_events() {
    let store = get_test_store().await;
    let mut order = new_order("u-1");
    store.save_order(order.clone(), vec![]).await.unwrap();

    order.version = Version::first();
    order.status = "PAID".to_string();
    order.placed_at = Some(Utc::now());
    store
        .save_order(order.clone(), vec![status_event(order.id, "PENDING", "PAID")])
        .await
        .unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, "PAID");
    assert!(loaded.placed_at.is_some());
    assert_eq!(loaded.lines.len(), 1);
    assert_eq!(loaded.shipping.city.as_deref(), Some("London"));

    let events = store.get_order_events(order.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["from"], "PENDING");
}

#[tokio::test]
#[serial]
async fn query_orders_by_user_and_status() {
    let store = get_test_store().await;
    store.save_order(new_order("u-1"), vec![]).await.unwrap();
    store.save_order(new_order("u-1"), vec![]).await.unwrap();
    store.save_order(new_order("u-2"), vec![]).await.unwrap();

    let mine = store.query_orders(OrderQuery::for_user("u-1")).await.unwrap();
    assert_eq!(mine.len(), 2);

    let pending = store
        .query_orders(OrderQuery::new().status("PENDING").limit(1))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let lower = store
        .query_orders(OrderQuery::new().status("pending"))
        .await
        .unwrap();
    assert_eq!(lower.len(), 3);
}

#[tokio::test]
#[serial]
async fn find_open_cart_ignores_status_case() {
    let store = get_test_store().await;
    let mut cart = new_cart("u-1");
    cart.status = "open".to_string();
    store.save_cart(cart.clone()).await.unwrap();

    let found = store
        .find_open_cart(&UserRef::from("u-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, cart.id);
}

#[tokio::test]
#[serial]
async fn find_cart_by_item_id() {
    let store = get_test_store().await;
    let mut cart = new_cart("u-1");
    let item = new_item("SKU-A", 1, 100);
    cart.items.push(item.clone());
    store.save_cart(cart.clone()).await.unwrap();

    let found = store.find_cart_by_item(item.id).await.unwrap().unwrap();
    assert_eq!(found.id, cart.id);
}
