mod common;

use chrono::Utc;
use common::TestApp;
use retail_backoffice::services::orders::{CartLine, NewOrder};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn place(app: &TestApp, lines: Vec<(Uuid, i32, Decimal)>, discount: Decimal) {
    app.state
        .services
        .orders
        .create_order(
            app.tenant_id,
            app.cashier_id,
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
            },
        )
        .await
        .expect("order succeeds");
}

#[tokio::test]
async fn analytics_summarize_paid_orders_of_the_tenant() {
    let app = TestApp::new().await;
    let bread = app.seed_product("Bread", dec!(2.50), Some(100)).await;
    let eggs = app.seed_product("Eggs", dec!(3.00), Some(100)).await;

    place(&app, vec![(bread.id, 4, dec!(2.50))], Decimal::ZERO).await;
    place(
        &app,
        vec![(bread.id, 1, dec!(2.50)), (eggs.id, 2, dec!(3.00))],
        dec!(0.50),
    )
    .await;

    // Another tenant's sales stay out of the figures.
    let other_tenant = Uuid::new_v4();
    let foreign = app
        .seed_product_for(other_tenant, "Foreign", dec!(9.00), Some(5))
        .await;
    app.state
        .services
        .orders
        .create_order(
            other_tenant,
            Uuid::new_v4(),
            NewOrder {
                lines: vec![CartLine {
                    product_id: foreign.id,
                    quantity: 1,
                    unit_price: dec!(9.00),
                }],
                payment_method: "CASH".to_string(),
                discount: Decimal::ZERO,
            },
        )
        .await
        .unwrap();

    let analytics = app
        .state
        .services
        .analytics
        .order_analytics(app.tenant_id)
        .await
        .expect("analytics");

    assert_eq!(analytics.summary.total_orders, 2);
    assert_eq!(analytics.summary.total_sales, dec!(18.00));
    assert_eq!(analytics.summary.average_order_value, dec!(9.00));

    assert_eq!(analytics.sales_by_day.len(), 1);
    assert_eq!(analytics.sales_by_day[0].date, Utc::now().date_naive());
    assert_eq!(analytics.sales_by_day[0].order_count, 2);
    assert_eq!(analytics.sales_by_month.len(), 1);
    assert_eq!(analytics.sales_by_month[0].total_sales, dec!(18.00));

    assert_eq!(analytics.top_products.len(), 2);
    assert_eq!(analytics.top_products[0].product_name, "Bread");
    assert_eq!(analytics.top_products[0].quantity_sold, 5);
    assert_eq!(analytics.top_products[1].product_name, "Eggs");
    assert_eq!(analytics.top_products[1].quantity_sold, 2);
}

#[tokio::test]
async fn analytics_for_tenant_without_orders_are_zero() {
    let app = TestApp::new().await;
    let analytics = app
        .state
        .services
        .analytics
        .order_analytics(app.tenant_id)
        .await
        .expect("analytics");

    assert!(analytics.sales_by_day.is_empty());
    assert!(analytics.sales_by_month.is_empty());
    assert!(analytics.top_products.is_empty());
    assert_eq!(analytics.summary.total_orders, 0);
    assert_eq!(analytics.summary.total_sales, Decimal::ZERO);
    assert_eq!(analytics.summary.average_order_value, Decimal::ZERO);
}
