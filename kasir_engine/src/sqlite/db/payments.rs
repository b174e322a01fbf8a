use chrono::{DateTime, Utc};
use log::debug;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::PosDatabaseError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PosDatabaseError> {
    let inserted: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                transaction_id,
                merchant_order_id,
                reference,
                payment_url,
                va_number,
                qr_string,
                payment_method,
                amount,
                status_code,
                status_message,
                expired_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(payment.transaction_id)
    .bind(&payment.merchant_order_id)
    .bind(&payment.reference)
    .bind(&payment.payment_url)
    .bind(&payment.va_number)
    .bind(&payment.qr_string)
    .bind(&payment.payment_method)
    .bind(payment.amount)
    .bind(&payment.status_code)
    .bind(&payment.status_message)
    .bind(payment.expired_at)
    .fetch_one(conn)
    .await?;
    debug!("💳️ Payment [{}] recorded for transaction {}", inserted.merchant_order_id, inserted.transaction_id);
    Ok(inserted)
}

pub async fn fetch_payment(
    tenant_id: i64,
    payment_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT p.* FROM payments p
            JOIN transactions t ON p.transaction_id = t.id
            WHERE p.id = $1 AND t.tenant_id = $2
        "#,
    )
    .bind(payment_id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_payment_by_merchant_order_id(
    merchant_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE merchant_order_id = $1")
        .bind(merchant_order_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_payments_for_transaction(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1 ORDER BY id")
        .bind(transaction_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_successful_payment(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE transaction_id = $1 AND status = 'success'")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
}

pub async fn update_status(
    payment_id: i64,
    status: PaymentStatus,
    status_code: Option<&str>,
    status_message: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PosDatabaseError> {
    let updated = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = $1,
                status_code = COALESCE($2, status_code),
                status_message = COALESCE($3, status_message),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(status_code)
    .bind(status_message)
    .bind(payment_id)
    .fetch_one(conn)
    .await?;
    Ok(updated)
}

/// Marks a payment as successful, stamping `paid_at` and capturing the gateway reference.
pub async fn mark_success(
    payment_id: i64,
    status_code: Option<&str>,
    status_message: Option<&str>,
    reference: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PosDatabaseError> {
    let updated = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = 'success',
                status_code = COALESCE($1, status_code),
                status_message = COALESCE($2, status_message),
                reference = COALESCE($3, reference),
                paid_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(status_code)
    .bind(status_message)
    .bind(reference)
    .bind(payment_id)
    .fetch_one(conn)
    .await?;
    Ok(updated)
}

/// Stores the raw callback body against the payment for audit, and captures the gateway reference if one came
/// along with it.
pub async fn record_callback(
    payment_id: i64,
    raw_payload: &str,
    reference: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), PosDatabaseError> {
    sqlx::query(
        r#"
            UPDATE payments
            SET callback_data = $1, reference = COALESCE($2, reference), updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
        "#,
    )
    .bind(raw_payload)
    .bind(reference)
    .bind(payment_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Voids every still-pending payment against a transaction, e.g. when the transaction is cancelled.
pub async fn cancel_pending_for_transaction(
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<u64, PosDatabaseError> {
    let result = sqlx::query(
        r#"
            UPDATE payments SET status = 'cancelled', updated_at = CURRENT_TIMESTAMP
            WHERE transaction_id = $1 AND status = 'pending'
        "#,
    )
    .bind(transaction_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Removes every payment row belonging to a transaction. Only for the hard-delete path; the foreign key on
/// `payments.transaction_id` would otherwise reject deleting the header.
pub async fn delete_for_transaction(transaction_id: i64, conn: &mut SqliteConnection) -> Result<u64, PosDatabaseError> {
    let result =
        sqlx::query("DELETE FROM payments WHERE transaction_id = $1").bind(transaction_id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Finds pending payments whose expiry deadline has passed, optionally restricted to one tenant.
pub async fn find_expired_pending(
    tenant_id: Option<i64>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
            SELECT p.* FROM payments p
            JOIN transactions t ON p.transaction_id = t.id
            WHERE p.status = 'pending' AND p.expired_at IS NOT NULL AND p.expired_at < "#,
    );
    builder.push_bind(now);
    if let Some(tenant_id) = tenant_id {
        builder.push(" AND t.tenant_id = ");
        builder.push_bind(tenant_id);
    }
    builder.build_query_as::<Payment>().fetch_all(conn).await
}

pub async fn expire_payments(ids: &[i64], conn: &mut SqliteConnection) -> Result<u64, PosDatabaseError> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut builder =
        QueryBuilder::new("UPDATE payments SET status = 'expired', updated_at = CURRENT_TIMESTAMP WHERE id IN (");
    let mut values = builder.separated(", ");
    for id in ids {
        values.push_bind(*id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}
