use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product, TransactionItem},
    traits::PosDatabaseError,
};

pub async fn insert_product(
    tenant_id: i64,
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, PosDatabaseError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (tenant_id, category_id, name, price, cost, stock, sku, is_available)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(tenant_id)
    .bind(product.category_id)
    .bind(product.name)
    .bind(product.price)
    .bind(product.cost)
    .bind(product.stock)
    .bind(product.sku)
    .bind(product.is_available)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(
    tenant_id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1 AND tenant_id = $2")
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_products(tenant_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE tenant_id = $1 ORDER BY name").bind(tenant_id).fetch_all(conn).await
}

/// Atomically subtracts `quantity` from a product's stock level. The `stock >= quantity` guard in the WHERE clause
/// makes the check-and-decrement a single statement, so two concurrent orders can never both take the last unit.
pub async fn reserve_stock(
    tenant_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, PosDatabaseError> {
    let updated: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND tenant_id = $3 AND stock >= $1
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .bind(tenant_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(product) => {
            debug!("🛒️ Reserved {quantity} x product [{product_id}]. {} left in stock", product.stock);
            Ok(product)
        },
        None => match fetch_product(tenant_id, product_id, conn).await? {
            Some(p) => Err(PosDatabaseError::InsufficientStock {
                product_id,
                requested: quantity,
                available: p.stock,
            }),
            None => Err(PosDatabaseError::ProductNotFound(product_id)),
        },
    }
}

/// Adds `delta` to a product's stock level. Negative deltas are guarded so stock never goes below zero.
pub async fn adjust_stock(
    tenant_id: i64,
    product_id: i64,
    delta: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, PosDatabaseError> {
    if delta < 0 {
        return reserve_stock(tenant_id, product_id, -delta, conn).await;
    }
    let updated: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND tenant_id = $3
            RETURNING *;
        "#,
    )
    .bind(delta)
    .bind(product_id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?;
    updated.ok_or(PosDatabaseError::ProductNotFound(product_id))
}

/// Returns the line items' quantities to stock, e.g. when a transaction is cancelled. A product that has been
/// deleted since the sale is skipped silently; there is nothing to restore to.
pub async fn restore_stock_for_items(
    tenant_id: i64,
    items: &[TransactionItem],
    conn: &mut SqliteConnection,
) -> Result<(), PosDatabaseError> {
    for item in items {
        sqlx::query(
            "UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND tenant_id = $3",
        )
        .bind(item.quantity)
        .bind(item.product_id)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await?;
        debug!("🛒️ Restored {} x product [{}] to stock", item.quantity, item.product_id);
    }
    Ok(())
}
