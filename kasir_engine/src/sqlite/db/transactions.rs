use chrono::Utc;
use kasir_common::Rupiah;
use log::debug;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        NewTransaction,
        Product,
        Transaction,
        TransactionItem,
        TransactionQueryFilter,
        TransactionStatus,
        UpdateTransaction,
    },
    traits::PosDatabaseError,
};

/// Issues the next transaction number for the tenant, in the form `TRX-YYYYMMDD-NNN`. A per-tenant, per-day counter
/// row is upserted atomically, so concurrent orders can never be handed the same number.
pub async fn next_transaction_number(tenant_id: i64, conn: &mut SqliteConnection) -> Result<String, PosDatabaseError> {
    let day = Utc::now().format("%Y%m%d").to_string();
    let seq: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO transaction_counters (tenant_id, day, last_seq) VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, day) DO UPDATE SET last_seq = last_seq + 1
            RETURNING last_seq;
        "#,
    )
    .bind(tenant_id)
    .bind(&day)
    .fetch_one(conn)
    .await?;
    Ok(format!("TRX-{day}-{seq:03}"))
}

/// Inserts a transaction header with zeroed totals. The caller inserts the line items and then fills in the totals
/// with [`update_totals`] once the sum is known, all inside one database transaction.
pub async fn insert_transaction(
    tenant_id: i64,
    cashier_id: i64,
    transaction_number: &str,
    transaction: &NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, PosDatabaseError> {
    let inserted: Transaction = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                tenant_id,
                transaction_number,
                cashier_id,
                customer_name,
                order_type,
                discount,
                payment_method,
                paid_amount,
                notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(tenant_id)
    .bind(transaction_number)
    .bind(cashier_id)
    .bind(&transaction.customer_name)
    .bind(transaction.order_type)
    .bind(transaction.discount)
    .bind(&transaction.payment_method)
    .bind(transaction.paid_amount)
    .bind(&transaction.notes)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Transaction [{transaction_number}] inserted with id {}", inserted.id);
    Ok(inserted)
}

/// Inserts a line item, snapshotting the product's name and current price.
pub async fn insert_item(
    transaction_id: i64,
    product: &Product,
    quantity: i64,
    notes: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<TransactionItem, PosDatabaseError> {
    let subtotal = product.price * quantity;
    let item = sqlx::query_as(
        r#"
            INSERT INTO transaction_items (transaction_id, product_id, product_name, quantity, unit_price, subtotal, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(transaction_id)
    .bind(product.id)
    .bind(&product.name)
    .bind(quantity)
    .bind(product.price)
    .bind(subtotal)
    .bind(notes)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_transaction(
    tenant_id: i64,
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1 AND tenant_id = $2")
        .bind(transaction_id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await
}

/// Fetches a transaction header by primary key alone. Only for internal paths (e.g. the gateway callback) where no
/// tenant context exists; everything client-facing goes through [`fetch_transaction`].
pub async fn fetch_transaction_unscoped(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE id = $1").bind(transaction_id).fetch_optional(conn).await
}

pub async fn fetch_items(transaction_id: i64, conn: &mut SqliteConnection) -> Result<Vec<TransactionItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transaction_items WHERE transaction_id = $1 ORDER BY id")
        .bind(transaction_id)
        .fetch_all(conn)
        .await
}

pub async fn update_totals(
    transaction_id: i64,
    subtotal: Rupiah,
    tax: Rupiah,
    total: Rupiah,
    change: Rupiah,
    conn: &mut SqliteConnection,
) -> Result<Transaction, PosDatabaseError> {
    let updated = sqlx::query_as(
        r#"
            UPDATE transactions
            SET subtotal = $1, tax = $2, total = $3, change_amount = $4, updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            RETURNING *;
        "#,
    )
    .bind(subtotal)
    .bind(tax)
    .bind(total)
    .bind(change)
    .bind(transaction_id)
    .fetch_one(conn)
    .await?;
    Ok(updated)
}

/// Applies the header-level fields of a partial update. Line item replacement is handled by the caller.
pub async fn update_header(
    transaction_id: i64,
    update: &UpdateTransaction,
    conn: &mut SqliteConnection,
) -> Result<Transaction, PosDatabaseError> {
    let mut builder = QueryBuilder::new("UPDATE transactions SET ");
    let mut fields = builder.separated(", ");
    if let Some(name) = &update.customer_name {
        fields.push("customer_name = ");
        fields.push_bind_unseparated(name.clone());
    }
    if let Some(order_type) = update.order_type {
        fields.push("order_type = ");
        fields.push_bind_unseparated(order_type);
    }
    if let Some(method) = &update.payment_method {
        fields.push("payment_method = ");
        fields.push_bind_unseparated(method.clone());
    }
    if let Some(paid) = update.paid_amount {
        fields.push("paid_amount = ");
        fields.push_bind_unseparated(paid);
    }
    if let Some(discount) = update.discount {
        fields.push("discount = ");
        fields.push_bind_unseparated(discount);
    }
    if let Some(notes) = &update.notes {
        fields.push("notes = ");
        fields.push_bind_unseparated(notes.clone());
    }
    fields.push("updated_at = CURRENT_TIMESTAMP");
    builder.push(" WHERE id = ");
    builder.push_bind(transaction_id);
    builder.push(" RETURNING *");
    let updated = builder.build_query_as::<Transaction>().fetch_one(conn).await?;
    Ok(updated)
}

pub async fn update_status(
    transaction_id: i64,
    status: TransactionStatus,
    conn: &mut SqliteConnection,
) -> Result<Transaction, PosDatabaseError> {
    let updated = sqlx::query_as(
        "UPDATE transactions SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(transaction_id)
    .fetch_one(conn)
    .await?;
    Ok(updated)
}

pub async fn cancel_transactions(ids: &[i64], conn: &mut SqliteConnection) -> Result<u64, PosDatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut builder =
        QueryBuilder::new("UPDATE transactions SET status = 'cancelled', updated_at = CURRENT_TIMESTAMP WHERE id IN (");
    let mut values = builder.separated(", ");
    for id in ids {
        values.push_bind(*id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_items(transaction_id: i64, conn: &mut SqliteConnection) -> Result<u64, PosDatabaseError> {
    let result =
        sqlx::query("DELETE FROM transaction_items WHERE transaction_id = $1").bind(transaction_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_transaction(transaction_id: i64, conn: &mut SqliteConnection) -> Result<u64, PosDatabaseError> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1").bind(transaction_id).execute(conn).await?;
    Ok(result.rows_affected())
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, tenant_id: i64, query: &TransactionQueryFilter) {
    builder.push(" WHERE tenant_id = ");
    builder.push_bind(tenant_id);
    if let Some(status) = query.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(order_type) = query.order_type {
        builder.push(" AND order_type = ");
        builder.push_bind(order_type);
    }
    if let Some(term) = &query.search {
        let pattern = format!("%{term}%");
        builder.push(" AND (transaction_number LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR customer_name LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR notes LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(since) = query.since {
        builder.push(" AND DATE(created_at) >= ");
        builder.push_bind(since);
    }
    if let Some(until) = query.until {
        builder.push(" AND DATE(created_at) <= ");
        builder.push_bind(until);
    }
}

/// Fetches one page of transactions matching the filter, newest first.
pub async fn search_transactions(
    tenant_id: i64,
    query: &TransactionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM transactions");
    push_filters(&mut builder, tenant_id, query);
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(query.page_size());
    builder.push(" OFFSET ");
    builder.push_bind(query.offset());
    builder.build_query_as::<Transaction>().fetch_all(conn).await
}

pub async fn count_transactions(
    tenant_id: i64,
    query: &TransactionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM transactions");
    push_filters(&mut builder, tenant_id, query);
    builder.build_query_scalar::<i64>().fetch_one(conn).await
}
