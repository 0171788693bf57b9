use std::hint::black_box;
use std::sync::Arc;

use common::UserRef;
use criterion::{Criterion, criterion_group, criterion_main};
use dispatch::{
    DispatchConfig, Dispatcher, InMemoryPaymentAuthority, LoggingNotifier, LoggingStockAdjuster,
};
use domain::{
    Cart, CartService, CheckoutService, Money, NewCartItem, Order, OrderDetails, OrderStatus,
};
use order_store::InMemoryOrderStore;

fn bench_status_machine(c: &mut Criterion) {
    c.bench_function("domain/can_transition_all_pairs", |b| {
        b.iter(|| {
            let mut allowed = 0;
            for from in OrderStatus::ALL {
                for to in OrderStatus::ALL {
                    if black_box(from).can_transition_to(black_box(to)) {
                        allowed += 1;
                    }
                }
            }
            allowed
        });
    });

    c.bench_function("domain/order_happy_path", |b| {
        b.iter(|| {
            let mut order = Order::new(
                UserRef::from("bench"),
                Money::from_cents(17500),
                "USD",
                vec![],
                OrderDetails::default(),
            );
            order.mark_paid().unwrap();
            order.ship().unwrap();
            order.deliver().unwrap();
            black_box(order.domain_events().len())
        });
    });
}

fn bench_cart_total(c: &mut Criterion) {
    let mut cart = Cart::new(UserRef::from("bench"));
    for i in 0..100 {
        cart.add_item(&format!("SKU-{i:03}"), i % 5 + 1, Money::from_cents(199 + i as i64), "USD")
            .unwrap();
    }

    c.bench_function("domain/cart_total_100_items", |b| {
        b.iter(|| black_box(&cart).total().unwrap());
    });
}

fn bench_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/checkout_in_memory", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryOrderStore::new();
                let (dispatcher, worker) = Dispatcher::new(
                    &DispatchConfig::default(),
                    Arc::new(LoggingStockAdjuster),
                    Arc::new(LoggingNotifier),
                );
                drop(worker);

                let carts = CartService::new(store.clone());
                let checkout = CheckoutService::new(
                    store,
                    dispatcher,
                    Arc::new(InMemoryPaymentAuthority::new()),
                );

                let user = UserRef::from("bench");
                let cart = carts.get_or_create_active_cart(&user).await.unwrap();
                carts
                    .add_item(cart.id(), &user, NewCartItem::new("SKU-1", 2, 5000))
                    .await
                    .unwrap();
                checkout.checkout(cart.id(), &user, None).await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_status_machine, bench_cart_total, bench_checkout);
criterion_main!(benches);
