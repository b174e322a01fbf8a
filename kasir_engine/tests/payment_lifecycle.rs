mod support;

use chrono::{Duration, Utc};
use kasir_engine::{
    db_types::{GatewayUpdate, PaymentStatus, TransactionStatus},
    helpers::payment_deadline,
    OrderFlowApi,
    PaymentApi,
    PosDatabaseError,
};
use support::{cashier, new_test_db, order_of, pending_payment, seed_product, seed_tenant, stock_of};

fn callback(code: &str) -> GatewayUpdate {
    GatewayUpdate {
        result_code: code.to_string(),
        reference: Some("D12345".to_string()),
        raw_payload: Some(format!("{{\"resultCode\":\"{code}\"}}")),
    }
}

#[tokio::test]
async fn successful_callback_completes_the_transaction() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 2)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);

    let updated = payments.process_callback(&payment.merchant_order_id, callback("00")).await.unwrap();
    assert_eq!(updated.status, PaymentStatus::Success);
    assert!(updated.paid_at.is_some());
    assert!(updated.callback_data.is_some());

    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Completed);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 8);
}

#[tokio::test]
async fn failed_callback_cancels_the_transaction_and_restores_stock() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 3)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();

    let updated = payments.process_callback(&payment.merchant_order_id, callback("EE")).await.unwrap();
    assert_eq!(updated.status, PaymentStatus::Failed);

    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Cancelled);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
}

#[tokio::test]
async fn replayed_callbacks_leave_terminal_payments_untouched() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 2)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();
    payments.process_callback(&payment.merchant_order_id, callback("00")).await.unwrap();

    // A replay of the same callback, and even a contradictory one, must change nothing.
    let replay = payments.process_callback(&payment.merchant_order_id, callback("00")).await.unwrap();
    assert_eq!(replay.status, PaymentStatus::Success);
    let contradiction = payments.process_callback(&payment.merchant_order_id, callback("EE")).await.unwrap();
    assert_eq!(contradiction.status, PaymentStatus::Success);

    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Completed);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 8);
}

#[tokio::test]
async fn unknown_merchant_order_id_is_an_error() {
    let db = new_test_db().await;
    let payments = PaymentApi::new(db);
    let err = payments.process_callback("1-TRX-20240601-001-120000", callback("00")).await.unwrap_err();
    assert!(matches!(err, PosDatabaseError::MerchantOrderNotFound(_)));
}

#[tokio::test]
async fn completed_transactions_cannot_take_another_payment() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 1)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();
    payments.process_callback(&payment.merchant_order_id, callback("00")).await.unwrap();

    let err = payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await;
    assert!(matches!(err.unwrap_err(), PosDatabaseError::TransactionNotPayable(_)));
}

#[tokio::test]
async fn sweep_expires_overdue_payments_exactly_once() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 4)], 0)).await.unwrap();
    let overdue = Utc::now() - Duration::minutes(5);
    let payment = payments.record_new_payment(&ctx, pending_payment(&order.transaction, overdue)).await.unwrap();
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 6);

    let swept = payments.sweep_expired(&ctx, Utc::now()).await.unwrap();
    assert_eq!(swept, 1);
    let payment = payments.payment(&ctx, payment.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Expired);
    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Cancelled);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);

    // Sweeping again finds nothing to do and, crucially, does not restore stock a second time.
    let swept = payments.sweep_expired(&ctx, Utc::now()).await.unwrap();
    assert_eq!(swept, 0);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
}

#[tokio::test]
async fn late_success_after_sweep_does_not_double_restore_stock() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 2)], 0)).await.unwrap();
    let overdue = Utc::now() - Duration::minutes(5);
    let payment = payments.record_new_payment(&ctx, pending_payment(&order.transaction, overdue)).await.unwrap();
    payments.sweep_expired(&ctx, Utc::now()).await.unwrap();
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);

    // The customer paid just after the sweep. The payment is terminal, so the callback is a no-op.
    let late = payments.process_callback(&payment.merchant_order_id, callback("00")).await.unwrap();
    assert_eq!(late.status, PaymentStatus::Expired);
    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Cancelled);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
}

#[tokio::test]
async fn pending_callback_leaves_the_order_open() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 1)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();

    let updated = payments.process_callback(&payment.merchant_order_id, callback("01")).await.unwrap();
    assert_eq!(updated.status, PaymentStatus::Pending);
    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Pending);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 9);
}

#[tokio::test]
async fn status_poll_can_cancel_a_payment() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 2)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();

    let update = GatewayUpdate { result_code: "02".to_string(), reference: None, raw_payload: None };
    let updated = payments.process_poll_result(&ctx, payment.id, update).await.unwrap();
    assert_eq!(updated.status, PaymentStatus::Cancelled);
    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Cancelled);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
}

#[tokio::test]
async fn unknown_poll_result_expires_the_payment() {
    let db = new_test_db().await;
    let tenant = seed_tenant(&db, "Kopi Senja").await;
    let ctx = cashier(tenant);
    let kopi = seed_product(&db, &ctx, "Kopi Susu", 30_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let order = orders.create_order(&ctx, order_of(&[(kopi.id, 2)], 0)).await.unwrap();
    let payment =
        payments.record_new_payment(&ctx, pending_payment(&order.transaction, payment_deadline(Utc::now()))).await.unwrap();

    // A poll that comes back with an unrecognised code means the gateway has let the payment lapse. The same code
    // on the callback path reports a failed attempt instead.
    let update = GatewayUpdate { result_code: "EE".to_string(), reference: None, raw_payload: None };
    let updated = payments.process_poll_result(&ctx, payment.id, update).await.unwrap();
    assert_eq!(updated.status, PaymentStatus::Expired);
    let order = orders.fetch_order(&ctx, order.transaction.id).await.unwrap().unwrap();
    assert_eq!(order.transaction.status, TransactionStatus::Cancelled);
    assert_eq!(stock_of(&db, &ctx, kopi.id).await, 10);
}

#[tokio::test]
async fn sweeps_are_tenant_scoped() {
    let db = new_test_db().await;
    let senja = seed_tenant(&db, "Kopi Senja").await;
    let pagi = seed_tenant(&db, "Kopi Pagi").await;
    let ctx_senja = cashier(senja);
    let ctx_pagi = cashier(pagi);
    let kopi = seed_product(&db, &ctx_senja, "Kopi Susu", 30_000, 10).await;
    let teh = seed_product(&db, &ctx_pagi, "Teh Manis", 10_000, 10).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentApi::new(db.clone());

    let overdue = Utc::now() - Duration::minutes(5);
    let order_senja = orders.create_order(&ctx_senja, order_of(&[(kopi.id, 1)], 0)).await.unwrap();
    payments.record_new_payment(&ctx_senja, pending_payment(&order_senja.transaction, overdue)).await.unwrap();
    let order_pagi = orders.create_order(&ctx_pagi, order_of(&[(teh.id, 1)], 0)).await.unwrap();
    payments.record_new_payment(&ctx_pagi, pending_payment(&order_pagi.transaction, overdue)).await.unwrap();

    let swept = payments.sweep_expired(&ctx_senja, Utc::now()).await.unwrap();
    assert_eq!(swept, 1);
    let untouched = orders.fetch_order(&ctx_pagi, order_pagi.transaction.id).await.unwrap().unwrap();
    assert_eq!(untouched.transaction.status, TransactionStatus::Pending);

    // The all-tenants sweep picks up the remainder.
    let swept = payments.sweep_all_expired(Utc::now()).await.unwrap();
    assert_eq!(swept, 1);
    assert_eq!(stock_of(&db, &ctx_pagi, teh.id).await, 10);
}
