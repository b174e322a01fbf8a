mod support;

use chrono::Utc;
use kasir_common::Rupiah;
use kasir_engine::{
    db_types::{TransactionQueryFilter, TransactionStatus, UpdateTransaction},
    helpers::payment_deadline,
    OrderFlowApi,
    PaymentApi,
    PosDatabaseError,
};
use support::{cashier, new_test_db, order_of, pending_payment, seed_product, seed_tenant, stock_of};

#[tokio::test]
async fn create_order_computes_totals_and_reserves_stock() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let roti = seed_product(&db, &ctx, "Roti Bakar", 25_000, 5).await;
    let api = OrderFlowApi::new(db.clone());

    let order = api.create_order(&ctx, order_of(&[(kopi.id, 2), (roti.id, 1)], 100_000)).await.unwrap();

    let trx = &order.transaction;
    assert!(trx.transaction_number.starts_with("TRX-"));
    assert_eq!(trx.status, TransactionStatus::Pending);
    assert_eq!(trx.subtotal, Rupiah::from(85_000));
    assert_eq!(trx.tax, Rupiah::from(9_350));
    assert_eq!(trx.total, Rupiah::from(94_350));
    assert_eq!(trx.change_amount, Rupiah::from(5_650));
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].product_name, "Kopi Susu");
    assert_eq!(order.items[0].subtotal, Rupiah::from(60_000));
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 8);
    assert_eq!(stock_of(&db, &ctx, roti.id).await, 4);
}

#[tokio::test]
async fn transaction_numbers_are_sequential_per_day() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let api = OrderFlowApi::new(db);

    let first = api.create_order(&ctx, order_of(&[(kopi.id, 1)], 50_000)).await.unwrap();
    let second = api.create_order(&ctx, order_of(&[(kopi.id, 1)], 50_000)).await.unwrap();
    assert!(first.transaction.transaction_number.ends_with("-001"));
    assert!(second.transaction.transaction_number.ends_with("-002"));
}

#[tokio::test]
async fn insufficient_stock_rejects_the_whole_order() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 5).await;
    let roti = seed_product(&db, &ctx, "Roti Bakar", 25_000, 1).await;
    let api = OrderFlowApi::new(db.clone());

    let err = api.create_order(&ctx, order_of(&[(kopi.id, 2), (roti.id, 3)], 200_000)).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::InsufficientStock { requested: 3, available: 1, .. }));
    // The reservation for the first line item must have been rolled back with the rest of the order.
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 5);
    assert_eq!(stock_of(&db, &ctx, roti.id).await, 1);

    let page = api.search_orders(&ctx, TransactionQueryFilter::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 5).await;
    let api = OrderFlowApi::new(db.clone());

    let err = api.create_order(&ctx, order_of(&[(kopi.id, 0)], 50_000)).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::InvalidQuantity { quantity: 0, .. }));
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 5);
}

#[tokio::test]
async fn unknown_product_rejects_the_order() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let api = OrderFlowApi::new(db);

    let err = api.create_order(&ctx, order_of(&[(999, 1)], 50_000)).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::ProductNotFound(999)));
}

#[tokio::test]
async fn cancelling_restores_stock_exactly_once() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let api = OrderFlowApi::new(db.clone());

    let order = api.create_order(&ctx, order_of(&[(kopi.id, 4)], 200_000)).await.unwrap();
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 6);

    let cancelled = api.cancel_order(&ctx, order.transaction.id).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Cancelled);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);

    let err = api.cancel_order(&ctx, order.transaction.id).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::TransactionAlreadyCancelled(_)));
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
}

#[tokio::test]
async fn updating_items_swaps_reservations_and_recomputes_totals() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let roti = seed_product(&db, &ctx, "Roti Bakar", 25_000, 5).await;
    let api = OrderFlowApi::new(db.clone());

    let order = api.create_order(&ctx, order_of(&[(kopi.id, 2)], 100_000)).await.unwrap();
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 8);

    let update = UpdateTransaction { items: order_of(&[(roti.id, 1)], 0).items.into(), ..Default::default() };
    let updated = api.update_order(&ctx, order.transaction.id, update).await.unwrap();

    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
    assert_eq!(stock_of(&db, &ctx, roti.id).await, 4);
    assert_eq!(updated.items.len(), 1);
    // The tax amount rung up at creation (11% of the original 60 000 subtotal) is kept as-is.
    assert_eq!(updated.transaction.subtotal, Rupiah::from(25_000));
    assert_eq!(updated.transaction.tax, Rupiah::from(6_600));
    assert_eq!(updated.transaction.total, Rupiah::from(31_600));
}

#[tokio::test]
async fn empty_updates_are_rejected() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let api = OrderFlowApi::new(db);

    let order = api.create_order(&ctx, order_of(&[(kopi.id, 1)], 50_000)).await.unwrap();
    let err = api.update_order(&ctx, order.transaction.id, UpdateTransaction::default()).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::EmptyUpdate));
}

#[tokio::test]
async fn deleting_an_order_does_not_restore_stock() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let api = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = api.create_order(&ctx, order_of(&[(kopi.id, 2)], 100_000)).await.unwrap();
    // A payment attempt must not get in the way of the hard delete; its rows go with the transaction.
    let payment = payments
        .record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now())))
        .await
        .unwrap();
    api.delete_order(&ctx, order.transaction.id).await.unwrap();

    assert!(api.fetch_order(&ctx, order.transaction.id).await.unwrap().is_none());
    assert!(payments.payment(&ctx, payment.id).await.unwrap().is_none());
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 8);
}

#[tokio::test]
async fn tenants_cannot_see_each_others_orders() {
    let db = new_test_db().await;
    let senja = seed_tenant(&db, "Kopi Senja").await;
    let pagi = seed_tenant(&db, "Kopi Pagi").await;
    let ctx_senja = cashier(senja);
    let ctx_pagi = cashier(pagi);
    let kopi = seed_product(&db, &ctx_senja, "Kopi Susu", 30_000, 10).await;
    let api = OrderFlowApi::new(db.clone());

    let order = api.create_order(&ctx_senja, order_of(&[(kopi.id, 1)], 50_000)).await.unwrap();

    assert!(api.fetch_order(&ctx_pagi, order.transaction.id).await.unwrap().is_none());
    let err = api.cancel_order(&ctx_pagi, order.transaction.id).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::TransactionNotFound(_)));
    let page = api.search_orders(&ctx_pagi, TransactionQueryFilter::default()).await.unwrap();
    assert_eq!(page.total, 0);
    // The other tenant cannot order this tenant's products either.
    let err = api.create_order(&ctx_pagi, order_of(&[(kopi.id, 1)], 50_000)).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::ProductNotFound(_)));
}

#[tokio::test]
async fn search_filters_by_status_and_customer() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 20).await;
    let api = OrderFlowApi::new(db);

    let first = api.create_order(&ctx, order_of(&[(kopi.id, 1)], 50_000)).await.unwrap();
    let mut second_order = order_of(&[(kopi.id, 1)], 50_000);
    second_order.customer_name = Some("Siti".to_string());
    api.create_order(&ctx, second_order).await.unwrap();
    api.cancel_order(&ctx, first.transaction.id).await.unwrap();

    let pending = TransactionQueryFilter::default().with_status(TransactionStatus::Pending);
    let page = api.search_orders(&ctx, pending).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.transactions[0].transaction.customer_name.as_deref(), Some("Siti"));

    let by_name = TransactionQueryFilter::default().with_search("Bud");
    let page = api.search_orders(&ctx, by_name).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.transactions[0].transaction.status, TransactionStatus::Cancelled);
}
