use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Cart, CartService, Money, OrderService, OrderStatus, ProductCatalog, ProductId,
    ShippingAddress, UserId,
};
use document_store::InMemoryDocumentStore;

fn bench_cart_totals(c: &mut Criterion) {
    let products: Vec<ProductId> = (0..50).map(|_| ProductId::new()).collect();

    c.bench_function("domain/cart_add_50_lines", |b| {
        b.iter(|| {
            let mut cart = Cart::new(UserId::new());
            for (i, product) in products.iter().enumerate() {
                cart.add(*product, 2, Money::from_cents(100 + i as i64));
            }
            cart.total_price()
        });
    });
}

fn bench_add_to_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let catalog = ProductCatalog::new(store.clone());
    let carts = CartService::new(store);
    let product = rt.block_on(async {
        catalog
            .create_product("Bench Widget", Money::from_cents(1000), u32::MAX)
            .await
            .unwrap()
            .id
    });

    c.bench_function("domain/add_to_cart", |b| {
        b.iter(|| {
            rt.block_on(async {
                carts.add_item(UserId::new(), product, 1).await.unwrap();
            });
        });
    });
}

fn bench_place_and_cancel(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let catalog = ProductCatalog::new(store.clone());
    let carts = CartService::new(store.clone());
    let orders = OrderService::new(store);
    let products: Vec<ProductId> = rt.block_on(async {
        let mut ids = Vec::new();
        for i in 0..5 {
            let product = catalog
                .create_product(&format!("Item {i}"), Money::from_cents(250), 1_000_000)
                .await
                .unwrap();
            ids.push(product.id);
        }
        ids
    });

    c.bench_function("domain/place_and_cancel_5_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let user = UserId::new();
                for product in &products {
                    carts.add_item(user, *product, 2).await.unwrap();
                }
                let order = orders
                    .place_order(user, ShippingAddress::default())
                    .await
                    .unwrap();
                orders
                    .set_status(order.id(), OrderStatus::Cancelled)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_cart_totals,
    bench_add_to_cart,
    bench_place_and_cancel
);
criterion_main!(benches);
