mod common;

use assert_matches::assert_matches;
use common::TestApp;
use retail_backoffice::entities::{inventory, order, order_item};
use retail_backoffice::errors::ServiceError;
use retail_backoffice::services::orders::{CartLine, NewOrder};
use retail_backoffice::services::products::ProductUpdate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use uuid::Uuid;

fn cart(lines: Vec<(Uuid, i32, Decimal)>, discount: Decimal) -> NewOrder {
    NewOrder {
        lines: lines
            .into_iter()
            .map(|(product_id, quantity, unit_price)| CartLine {
                product_id,
                quantity,
                unit_price,
            })
            .collect(),
        payment_method: "CASH".to_string(),
        discount,
    }
}

#[tokio::test]
async fn selling_out_stock_then_rejecting_the_next_order() {
    let app = TestApp::new().await;
    let p = app.seed_product("Rice 5kg", dec!(10.00), Some(5)).await;
    let orders = app.state.services.orders.clone();

    let first = orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 5, dec!(10.00))], Decimal::ZERO),
        )
        .await
        .expect("first order succeeds");
    assert_eq!(first.items.len(), 1);
    assert_eq!(app.stock_of(p.id).await, 0);

    let second = orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 1, dec!(10.00))], Decimal::ZERO),
        )
        .await;
    assert_matches!(
        second,
        Err(ServiceError::InsufficientStock { product_id, requested: 1, available: 0 }) if product_id == p.id
    );
    assert_eq!(app.stock_of(p.id).await, 0);
    assert_eq!(app.count(order::Entity).await, 1);
}

#[tokio::test]
async fn order_totals_are_exact_and_persisted() {
    let app = TestApp::new().await;
    let a = app.seed_product("Notebook", dec!(10.00), Some(10)).await;
    let b = app.seed_product("Pen", dec!(5.50), Some(10)).await;

    let created = app
        .state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(
                vec![(a.id, 2, dec!(10.00)), (b.id, 1, dec!(5.50))],
                dec!(3.00),
            ),
        )
        .await
        .expect("order succeeds");

    assert_eq!(created.order.subtotal, dec!(25.50));
    assert_eq!(created.order.discount, dec!(3.00));
    assert_eq!(created.order.total, dec!(22.50));
    assert_eq!(created.order.status, order::OrderStatus::Paid);
    assert_eq!(created.items[0].product_name.as_deref(), Some("Notebook"));
    assert_eq!(created.items[0].line_total, dec!(20.00));
    assert_eq!(created.items[1].product_name.as_deref(), Some("Pen"));

    let fetched = app
        .state
        .services
        .orders
        .get_order(app.tenant_id, created.order.id)
        .await
        .expect("order is readable");
    assert_eq!(fetched.order.total, dec!(22.50));
    assert_eq!(fetched.order.order_number, created.order.order_number);
    assert_eq!(fetched.items.len(), 2);
    assert!(fetched.items.iter().all(|item| item.product_name.is_some()));

    assert_eq!(app.stock_of(a.id).await, 8);
    assert_eq!(app.stock_of(b.id).await, 9);
}

#[tokio::test]
async fn missing_second_product_rolls_back_everything() {
    let app = TestApp::new().await;
    let p = app.seed_product("Soap", dec!(3.00), Some(4)).await;
    let ghost = Uuid::new_v4();

    let result = app
        .state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 2, dec!(3.00)), (ghost, 1, dec!(1.00))], Decimal::ZERO),
        )
        .await;

    assert_matches!(result, Err(ServiceError::ProductNotFound { product_id }) if product_id == ghost);
    assert_eq!(app.count(order::Entity).await, 0);
    assert_eq!(app.count(order_item::Entity).await, 0);
    assert_eq!(app.stock_of(p.id).await, 4);
}

#[tokio::test]
async fn insufficient_stock_on_last_line_writes_nothing() {
    let app = TestApp::new().await;
    let a = app.seed_product("Apples", dec!(1.00), Some(10)).await;
    let b = app.seed_product("Bread", dec!(2.00), Some(10)).await;
    let c = app.seed_product("Cheese", dec!(4.00), Some(1)).await;

    let result = app
        .state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(
                vec![
                    (a.id, 3, dec!(1.00)),
                    (b.id, 2, dec!(2.00)),
                    (c.id, 2, dec!(4.00)),
                ],
                Decimal::ZERO,
            ),
        )
        .await;

    let err = result.expect_err("last line exceeds stock");
    assert_eq!(err.shortfall(), Some(1));
    assert_matches!(err, ServiceError::InsufficientStock { product_id, .. } if product_id == c.id);

    assert_eq!(app.count(order::Entity).await, 0);
    assert_eq!(app.count(order_item::Entity).await, 0);
    assert_eq!(app.stock_of(a.id).await, 10);
    assert_eq!(app.stock_of(b.id).await, 10);
    assert_eq!(app.stock_of(c.id).await, 1);
}

#[tokio::test]
async fn product_without_inventory_row_counts_as_zero_stock() {
    let app = TestApp::new().await;
    let p = app.seed_product("Candles", dec!(2.00), None).await;

    let result = app
        .state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 1, dec!(2.00))], Decimal::ZERO),
        )
        .await;

    assert_matches!(result, Err(ServiceError::InsufficientStock { available: 0, .. }));
    assert_eq!(app.count(inventory::Entity).await, 0);
}

#[tokio::test]
async fn empty_and_invalid_carts_are_rejected_before_any_write() {
    let app = TestApp::new().await;
    let p = app.seed_product("Tea", dec!(1.00), Some(3)).await;
    let orders = app.state.services.orders.clone();

    assert_matches!(
        orders
            .create_order(app.tenant_id, app.cashier_id, cart(vec![], Decimal::ZERO))
            .await,
        Err(ServiceError::EmptyCart)
    );
    assert_matches!(
        orders
            .create_order(
                app.tenant_id,
                app.cashier_id,
                cart(vec![(p.id, 0, dec!(1.00))], Decimal::ZERO)
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        orders
            .create_order(
                app.tenant_id,
                app.cashier_id,
                cart(vec![(p.id, 1, dec!(1.00))], dec!(-1.00))
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(app.count(order::Entity).await, 0);
    assert_eq!(app.stock_of(p.id).await, 3);
}

#[tokio::test]
async fn deleted_and_foreign_products_are_not_found() {
    let app = TestApp::new().await;
    let deleted = app.seed_product("Old stock", dec!(1.00), Some(5)).await;
    app.state
        .services
        .products
        .delete_product(app.tenant_id, deleted.id)
        .await
        .expect("soft delete");

    let other_tenant = Uuid::new_v4();
    let foreign = app
        .seed_product_for(other_tenant, "Foreign", dec!(1.00), Some(5))
        .await;

    for product_id in [deleted.id, foreign.id] {
        let result = app
            .state
            .services
            .orders
            .create_order(
                app.tenant_id,
                app.cashier_id,
                cart(vec![(product_id, 1, dec!(1.00))], Decimal::ZERO),
            )
            .await;
        assert_matches!(result, Err(ServiceError::ProductNotFound { product_id: id }) if id == product_id);
    }
    assert_eq!(app.count(order::Entity).await, 0);
}

#[tokio::test]
async fn captured_unit_price_survives_price_changes() {
    let app = TestApp::new().await;
    let p = app.seed_product("Coffee", dec!(5.00), Some(5)).await;

    let created = app
        .state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 1, dec!(5.00))], Decimal::ZERO),
        )
        .await
        .expect("order succeeds");

    app.state
        .services
        .products
        .update_product(
            app.tenant_id,
            p.id,
            ProductUpdate {
                price: Some(dec!(7.50)),
                ..Default::default()
            },
        )
        .await
        .expect("price update");

    let fetched = app
        .state
        .services
        .orders
        .get_order(app.tenant_id, created.order.id)
        .await
        .expect("order readable");
    assert_eq!(fetched.items[0].unit_price, dec!(5.00));
}

#[tokio::test]
async fn orders_are_tenant_scoped_and_listed_newest_first() {
    let app = TestApp::new().await;
    let p = app.seed_product("Milk", dec!(1.50), Some(10)).await;
    let orders = app.state.services.orders.clone();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let created = orders
            .create_order(
                app.tenant_id,
                app.cashier_id,
                cart(vec![(p.id, 1, dec!(1.50))], Decimal::ZERO),
            )
            .await
            .expect("order succeeds");
        numbers.push(created.order.order_number);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let listed = orders.list_orders(app.tenant_id).await.expect("list");
    let listed_numbers: Vec<String> = listed.into_iter().map(|o| o.order_number).collect();
    numbers.reverse();
    assert_eq!(listed_numbers, numbers);

    assert!(orders
        .list_orders(Uuid::new_v4())
        .await
        .expect("list other tenant")
        .is_empty());

    let first_id = orders.list_orders(app.tenant_id).await.unwrap()[0].id;
    assert_matches!(
        orders.get_order(Uuid::new_v4(), first_id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn lease_wait_beyond_deadline_times_out_and_rolls_back() {
    let app = TestApp::with_config(|cfg| cfg.transaction_timeout_ms = 150).await;
    let p = app.seed_product("Flour", dec!(2.00), Some(5)).await;

    // Another unit of work holds the product.
    let held = app.state.services.ledger.lock([p.id]).await;

    let result = app
        .state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 1, dec!(2.00))], Decimal::ZERO),
        )
        .await;
    assert_matches!(result, Err(ServiceError::TransactionTimeout(_)));
    assert!(result.unwrap_err().is_retryable());

    drop(held);
    assert_eq!(app.count(order::Entity).await, 0);
    assert_eq!(app.stock_of(p.id).await, 5);

    // The lease is free again once the holder is gone.
    app.state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 1, dec!(2.00))], Decimal::ZERO),
        )
        .await
        .expect("order succeeds after release");
    assert_eq!(app.stock_of(p.id).await, 4);
}

#[tokio::test]
async fn overflowing_cart_is_a_validation_error_and_writes_nothing() {
    let app = TestApp::new().await;
    let p = app.seed_product("Gold bar", dec!(1.00), Some(10)).await;
    let orders = app.state.services.orders.clone();

    let result = orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 2, Decimal::MAX)], Decimal::ZERO),
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    let result = orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
            cart(vec![(p.id, 1, dec!(1.005))], Decimal::ZERO),
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    assert_eq!(app.count(order::Entity).await, 0);
    assert_eq!(app.stock_of(p.id).await, 10);
}

#[tokio::test]
async fn order_lines_come_back_in_submitted_order() {
    let app = TestApp::new().await;
    let products = [
        app.seed_product("Zucchini", dec!(1.00), Some(10)).await,
        app.seed_product("Apple", dec!(2.00), Some(10)).await,
        app.seed_product("Mango", dec!(3.00), Some(10)).await,
    ];
    let orders = app.state.services.orders.clone();

    let lines = vec![
        (products[2].id, 1, dec!(3.00)),
        (products[0].id, 2, dec!(1.00)),
        (products[1].id, 3, dec!(2.00)),
        (products[0].id, 1, dec!(1.00)),
    ];
    let expected: Vec<Uuid> = lines.iter().map(|(id, _, _)| *id).collect();

    let created = orders
        .create_order(app.tenant_id, app.cashier_id, cart(lines, Decimal::ZERO))
        .await
        .expect("order succeeds");

    let fetched = orders
        .get_order(app.tenant_id, created.order.id)
        .await
        .expect("order is readable");
    let ids: Vec<Uuid> = fetched.items.iter().map(|item| item.product_id).collect();
    let line_numbers: Vec<i32> = fetched.items.iter().map(|item| item.line_no).collect();
    assert_eq!(ids, expected);
    assert_eq!(line_numbers, vec![1, 2, 3, 4]);
    assert_eq!(fetched.items, created.items);
}
