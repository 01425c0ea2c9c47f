mod common;

use assert_matches::assert_matches;
use common::TestApp;
use retail_backoffice::entities::{pre_release, pre_release_item};
use retail_backoffice::errors::ServiceError;
use retail_backoffice::services::pre_releases::{NewPreRelease, TransferLine};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn transfer(lines: Vec<(Uuid, i32)>) -> NewPreRelease {
    NewPreRelease {
        store_id: Uuid::new_v4(),
        remarks: Some("weekend restock".to_string()),
        photo_url: None,
        lines: lines
            .into_iter()
            .map(|(product_id, quantity)| TransferLine {
                product_id,
                quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn oversized_transfer_floors_stock_and_is_listed_with_names() {
    let app = TestApp::new().await;
    let p = app.seed_product("Detergent", dec!(4.00), Some(10)).await;
    let service = app.state.services.pre_releases.clone();

    let id = service
        .create_pre_release(app.tenant_id, app.cashier_id, transfer(vec![(p.id, 100)]))
        .await
        .expect("transfer succeeds despite shortfall");
    assert_eq!(app.stock_of(p.id).await, 0);

    let mine = service
        .list_mine(app.tenant_id, app.cashier_id)
        .await
        .expect("list own transfers");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].pre_release.id, id);
    assert_eq!(
        mine[0].pre_release.status,
        pre_release::PreReleaseStatus::Pending
    );
    assert_eq!(mine[0].items.len(), 1);
    assert_eq!(mine[0].items[0].quantity, 100);
    assert_eq!(mine[0].items[0].product_name.as_deref(), Some("Detergent"));
}

#[tokio::test]
async fn partial_shortfall_clamps_to_zero() {
    let app = TestApp::new().await;
    let p = app.seed_product("Sugar", dec!(1.00), Some(3)).await;

    app.state
        .services
        .pre_releases
        .create_pre_release(app.tenant_id, app.cashier_id, transfer(vec![(p.id, 5)]))
        .await
        .expect("transfer succeeds");

    assert_eq!(app.stock_of(p.id).await, 0);
}

#[tokio::test]
async fn within_stock_transfer_decrements_exactly() {
    let app = TestApp::new().await;
    let a = app.seed_product("Oil", dec!(6.00), Some(8)).await;
    let b = app.seed_product("Salt", dec!(0.50), Some(2)).await;

    app.state
        .services
        .pre_releases
        .create_pre_release(
            app.tenant_id,
            app.cashier_id,
            transfer(vec![(a.id, 3), (b.id, 2)]),
        )
        .await
        .expect("transfer succeeds");

    assert_eq!(app.stock_of(a.id).await, 5);
    assert_eq!(app.stock_of(b.id).await, 0);
    assert_eq!(app.count(pre_release_item::Entity).await, 2);
}

#[tokio::test]
async fn empty_transfer_is_rejected() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .pre_releases
        .create_pre_release(app.tenant_id, app.cashier_id, transfer(vec![]))
        .await;

    assert_matches!(result, Err(ServiceError::EmptyTransfer));
    assert_eq!(app.count(pre_release::Entity).await, 0);
}

#[tokio::test]
async fn unknown_product_aborts_the_whole_transfer() {
    let app = TestApp::new().await;
    let p = app.seed_product("Matches", dec!(0.50), Some(6)).await;
    let ghost = Uuid::new_v4();

    let result = app
        .state
        .services
        .pre_releases
        .create_pre_release(
            app.tenant_id,
            app.cashier_id,
            transfer(vec![(p.id, 2), (ghost, 1)]),
        )
        .await;

    assert_matches!(result, Err(ServiceError::ProductNotFound { product_id }) if product_id == ghost);
    assert_eq!(app.count(pre_release::Entity).await, 0);
    assert_eq!(app.count(pre_release_item::Entity).await, 0);
    assert_eq!(app.stock_of(p.id).await, 6);
}

#[tokio::test]
async fn list_mine_only_returns_own_transfers_newest_first() {
    let app = TestApp::new().await;
    let p = app.seed_product("Batteries", dec!(3.00), Some(50)).await;
    let service = app.state.services.pre_releases.clone();

    let first = service
        .create_pre_release(app.tenant_id, app.cashier_id, transfer(vec![(p.id, 1)]))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = service
        .create_pre_release(app.tenant_id, app.cashier_id, transfer(vec![(p.id, 2)]))
        .await
        .unwrap();
    service
        .create_pre_release(app.tenant_id, app.admin_id, transfer(vec![(p.id, 3)]))
        .await
        .unwrap();

    let mine = service
        .list_mine(app.tenant_id, app.cashier_id)
        .await
        .unwrap();
    let ids: Vec<Uuid> = mine.iter().map(|r| r.pre_release.id).collect();
    assert_eq!(ids, vec![second, first]);

    assert!(service
        .list_mine(Uuid::new_v4(), app.cashier_id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(app.stock_of(p.id).await, 44);
}

#[tokio::test]
async fn transfer_lines_are_listed_in_submitted_order() {
    let app = TestApp::new().await;
    let late = app.seed_product("Yeast", dec!(1.00), Some(5)).await;
    let early = app.seed_product("Butter", dec!(2.00), Some(5)).await;
    let middle = app.seed_product("Milk", dec!(3.00), Some(5)).await;
    let service = app.state.services.pre_releases.clone();

    let submitted = vec![(late.id, 1), (early.id, 1), (middle.id, 1)];
    let expected: Vec<Uuid> = submitted.iter().map(|(id, _)| *id).collect();
    service
        .create_pre_release(app.tenant_id, app.cashier_id, transfer(submitted))
        .await
        .expect("transfer succeeds");
    service
        .create_pre_release(
            app.tenant_id,
            app.cashier_id,
            transfer(vec![(middle.id, 1), (late.id, 1)]),
        )
        .await
        .expect("second transfer succeeds");

    let mine = service
        .list_mine(app.tenant_id, app.cashier_id)
        .await
        .expect("list own transfers");
    assert_eq!(mine.len(), 2);

    let first = mine
        .iter()
        .find(|details| details.items.len() == 3)
        .expect("three-line transfer is listed");
    let ids: Vec<Uuid> = first.items.iter().map(|item| item.product_id).collect();
    let line_numbers: Vec<i32> = first.items.iter().map(|item| item.line_no).collect();
    assert_eq!(ids, expected);
    assert_eq!(line_numbers, vec![1, 2, 3]);
}
