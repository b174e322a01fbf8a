//! Shared scaffolding for the engine integration tests: throwaway databases and seed data.

use kasir_common::Rupiah;
use kasir_engine::{
    db_types::{NewProduct, NewTransaction, NewTransactionItem, OrderType, Product, Role, TenantContext},
    OrderFlowApi,
    PosDatabase,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
}

pub fn random_db_path() -> String {
    format!("sqlite://../data/test_store_{}.db", rand::random::<u64>())
}

/// Creates a fresh database and returns a connected backend.
pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub fn cashier(tenant_id: i64) -> TenantContext {
    TenantContext::new(tenant_id, 101, Role::Cashier)
}

pub async fn seed_tenant(db: &SqliteDatabase, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO tenants (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding tenant")
}

pub async fn seed_product(db: &SqliteDatabase, ctx: &TenantContext, name: &str, price: i64, stock: i64) -> Product {
    let api = OrderFlowApi::new(db.clone());
    let product = NewProduct {
        category_id: None,
        name: name.to_string(),
        price: Rupiah::from(price),
        cost: Rupiah::from(0),
        stock,
        sku: None,
        is_available: true,
    };
    api.add_product(ctx, product).await.expect("Error seeding product")
}

pub fn order_of(items: &[(i64, i64)], paid: i64) -> NewTransaction {
    let items = items
        .iter()
        .map(|(product_id, quantity)| NewTransactionItem { product_id: *product_id, quantity: *quantity, notes: None })
        .collect();
    NewTransaction {
        order_type: OrderType::DineIn,
        customer_name: Some("Budi".to_string()),
        payment_method: "cash".to_string(),
        paid_amount: Rupiah::from(paid),
        discount: Rupiah::from(0),
        tax_rate: 0.11,
        notes: None,
        items,
    }
}

pub fn pending_payment(
    trx: &kasir_engine::db_types::Transaction,
    expired_at: chrono::DateTime<chrono::Utc>,
) -> kasir_engine::db_types::NewPayment {
    let now = chrono::Utc::now();
    kasir_engine::db_types::NewPayment {
        transaction_id: trx.id,
        merchant_order_id: kasir_engine::helpers::new_merchant_order_id(trx.tenant_id, &trx.transaction_number, now),
        reference: Some("D12345".to_string()),
        payment_url: Some("https://sandbox.duitku.com/pay/D12345".to_string()),
        va_number: None,
        qr_string: None,
        payment_method: "SP".to_string(),
        amount: trx.total,
        status_code: Some("00".to_string()),
        status_message: Some("SUCCESS".to_string()),
        expired_at: Some(expired_at),
    }
}

pub async fn stock_of(db: &SqliteDatabase, ctx: &TenantContext, product_id: i64) -> i64 {
    db.fetch_product(ctx, product_id).await.expect("Error fetching product").expect("Product missing").stock
}
