//! `SqliteDatabase` is a concrete implementation of the POS engine storage backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the [`PosDatabase`] trait. Every multi-step
//! operation runs inside a single database transaction: either the whole order (header, line items, stock
//! reservations) lands, or none of it does.
use std::{collections::HashSet, fmt::Debug};

use chrono::{DateTime, Utc};
use kasir_common::Rupiah;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{db_url, new_pool, payments, products, transactions};
use crate::{
    db_types::{
        GatewayUpdate,
        NewPayment,
        NewProduct,
        NewTransaction,
        NewTransactionItem,
        Payment,
        PaymentStatus,
        Product,
        TenantContext,
        Transaction,
        TransactionAggregate,
        TransactionItem,
        TransactionPage,
        TransactionQueryFilter,
        TransactionStatus,
        UpdateTransaction,
    },
    traits::{PosDatabase, PosDatabaseError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Reserves stock and inserts line items for an order, returning the items and the running subtotal. Runs on
    /// the caller's connection so it participates in the enclosing database transaction.
    async fn insert_items(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
        items: &[NewTransactionItem],
        conn: &mut SqliteConnection,
    ) -> Result<Vec<TransactionItem>, PosDatabaseError> {
        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(PosDatabaseError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: item.quantity,
                });
            }
            let product: Product =
                products::reserve_stock(ctx.tenant_id, item.product_id, item.quantity, &mut *conn).await?;
            let line =
                transactions::insert_item(transaction_id, &product, item.quantity, item.notes.as_deref(), &mut *conn)
                    .await?;
            inserted.push(line);
        }
        Ok(inserted)
    }

    async fn fetch_aggregate(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
        conn: &mut SqliteConnection,
    ) -> Result<Option<TransactionAggregate>, PosDatabaseError> {
        let Some(transaction) = transactions::fetch_transaction(ctx.tenant_id, transaction_id, &mut *conn).await?
        else {
            return Ok(None);
        };
        let items = transactions::fetch_items(transaction_id, conn).await?;
        Ok(Some(TransactionAggregate { transaction, items }))
    }

    /// Applies a gateway state change to a non-terminal payment. Terminal payments are returned untouched, which
    /// makes replayed callbacks and late status polls harmless. The callback and poll paths map unknown result
    /// codes differently, so the caller supplies the resolved status.
    async fn apply_update(
        &self,
        payment: Payment,
        status: PaymentStatus,
        update: GatewayUpdate,
        conn: &mut SqliteConnection,
    ) -> Result<Payment, PosDatabaseError> {
        let mut payment = payment;
        if let Some(raw) = &update.raw_payload {
            payments::record_callback(payment.id, raw, update.reference.as_deref(), &mut *conn).await?;
            payment.callback_data = Some(raw.clone());
        }
        if payment.status.is_terminal() {
            info!(
                "💳️ Payment [{}] is already {}; ignoring gateway result code {}",
                payment.merchant_order_id, payment.status, update.result_code
            );
            return Ok(payment);
        }
        let code = Some(update.result_code.as_str());
        let payment = match status {
            PaymentStatus::Success => {
                let payment =
                    payments::mark_success(payment.id, code, None, update.reference.as_deref(), &mut *conn).await?;
                transactions::update_status(payment.transaction_id, TransactionStatus::Completed, &mut *conn).await?;
                info!("💳️ Payment [{}] succeeded; transaction {} completed", payment.merchant_order_id, payment.transaction_id);
                payment
            },
            PaymentStatus::Pending => payments::update_status(payment.id, PaymentStatus::Pending, code, None, conn).await?,
            status => {
                let payment = payments::update_status(payment.id, status, code, None, &mut *conn).await?;
                self.cancel_for_failed_payment(&payment, &mut *conn).await?;
                payment
            },
        };
        Ok(payment)
    }

    /// Cancels the transaction behind a failed or cancelled payment, restoring its stock. The not-already-cancelled
    /// guard ensures stock is restored at most once, even if the expiry sweep got there first.
    async fn cancel_for_failed_payment(
        &self,
        payment: &Payment,
        conn: &mut SqliteConnection,
    ) -> Result<(), PosDatabaseError> {
        let Some(trx) = transactions::fetch_transaction_unscoped(payment.transaction_id, &mut *conn).await? else {
            return Ok(());
        };
        if trx.status == TransactionStatus::Cancelled {
            return Ok(());
        }
        let items = transactions::fetch_items(trx.id, &mut *conn).await?;
        products::restore_stock_for_items(trx.tenant_id, &items, &mut *conn).await?;
        payments::cancel_pending_for_transaction(trx.id, &mut *conn).await?;
        transactions::update_status(trx.id, TransactionStatus::Cancelled, conn).await?;
        info!("🔄️ Transaction [{}] cancelled after failed payment [{}]", trx.transaction_number, payment.merchant_order_id);
        Ok(())
    }

    async fn sweep(&self, tenant_id: Option<i64>, now: DateTime<Utc>) -> Result<usize, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let expired = payments::find_expired_pending(tenant_id, now, &mut tx).await?;
        if expired.is_empty() {
            return Ok(0);
        }
        let payment_ids = expired.iter().map(|p| p.id).collect::<Vec<i64>>();
        let mut seen = HashSet::new();
        let trx_ids = expired.iter().map(|p| p.transaction_id).filter(|id| seen.insert(*id)).collect::<Vec<i64>>();
        let mut cancelled = Vec::with_capacity(trx_ids.len());
        for trx_id in trx_ids {
            let Some(trx) = transactions::fetch_transaction_unscoped(trx_id, &mut tx).await? else {
                continue;
            };
            if trx.status == TransactionStatus::Cancelled {
                continue;
            }
            let items = transactions::fetch_items(trx.id, &mut tx).await?;
            products::restore_stock_for_items(trx.tenant_id, &items, &mut tx).await?;
            cancelled.push(trx.id);
        }
        payments::expire_payments(&payment_ids, &mut tx).await?;
        transactions::cancel_transactions(&cancelled, &mut tx).await?;
        tx.commit().await?;
        info!("🕰️ Expiry sweep: {} payment(s) expired, {} transaction(s) cancelled", payment_ids.len(), cancelled.len());
        Ok(cancelled.len())
    }
}

impl PosDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_product(&self, ctx: &TenantContext, product: NewProduct) -> Result<Product, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(ctx.tenant_id, product, &mut conn).await
    }

    async fn fetch_product(&self, ctx: &TenantContext, product_id: i64) -> Result<Option<Product>, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(ctx.tenant_id, product_id, &mut conn).await?)
    }

    async fn fetch_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_products(ctx.tenant_id, &mut conn).await?)
    }

    async fn adjust_stock(&self, ctx: &TenantContext, product_id: i64, delta: i64) -> Result<Product, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let product = products::adjust_stock(ctx.tenant_id, product_id, delta, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn create_transaction(
        &self,
        ctx: &TenantContext,
        transaction: NewTransaction,
    ) -> Result<TransactionAggregate, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let number = transactions::next_transaction_number(ctx.tenant_id, &mut tx).await?;
        let header =
            transactions::insert_transaction(ctx.tenant_id, ctx.actor_id, &number, &transaction, &mut tx).await?;
        let items = self.insert_items(ctx, header.id, &transaction.items, &mut tx).await?;
        let subtotal: Rupiah = items.iter().map(|i| i.subtotal).sum();
        let tax = subtotal.apply_rate(transaction.tax_rate);
        let total = subtotal + tax - transaction.discount;
        let change = transaction.paid_amount.saturating_change(total);
        let header = transactions::update_totals(header.id, subtotal, tax, total, change, &mut tx).await?;
        tx.commit().await?;
        Ok(TransactionAggregate { transaction: header, items })
    }

    async fn fetch_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Option<TransactionAggregate>, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        self.fetch_aggregate(ctx, transaction_id, &mut conn).await
    }

    async fn search_transactions(
        &self,
        ctx: &TenantContext,
        filter: TransactionQueryFilter,
    ) -> Result<TransactionPage, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let total = transactions::count_transactions(ctx.tenant_id, &filter, &mut conn).await?;
        let headers = transactions::search_transactions(ctx.tenant_id, &filter, &mut conn).await?;
        let mut results = Vec::with_capacity(headers.len());
        for transaction in headers {
            let items = transactions::fetch_items(transaction.id, &mut conn).await?;
            results.push(TransactionAggregate { transaction, items });
        }
        Ok(TransactionPage { total, page: filter.page(), page_size: filter.page_size(), transactions: results })
    }

    async fn update_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
        update: UpdateTransaction,
    ) -> Result<TransactionAggregate, PosDatabaseError> {
        if update.is_empty() {
            return Err(PosDatabaseError::EmptyUpdate);
        }
        let mut tx = self.pool.begin().await?;
        let header = transactions::fetch_transaction(ctx.tenant_id, transaction_id, &mut tx)
            .await?
            .ok_or(PosDatabaseError::TransactionNotFound(transaction_id))?;
        match header.status {
            TransactionStatus::Cancelled => return Err(PosDatabaseError::TransactionAlreadyCancelled(transaction_id)),
            TransactionStatus::Completed => return Err(PosDatabaseError::TransactionCompleted(transaction_id)),
            TransactionStatus::Pending => {},
        }
        let mut header = if update.has_header_fields() {
            transactions::update_header(transaction_id, &update, &mut tx).await?
        } else {
            header
        };
        let items = match &update.items {
            Some(new_items) => {
                let old_items = transactions::fetch_items(transaction_id, &mut tx).await?;
                products::restore_stock_for_items(ctx.tenant_id, &old_items, &mut tx).await?;
                transactions::delete_items(transaction_id, &mut tx).await?;
                self.insert_items(ctx, transaction_id, new_items, &mut tx).await?
            },
            None => transactions::fetch_items(transaction_id, &mut tx).await?,
        };
        // Totals are recomputed whenever anything that feeds them changed. The existing tax amount is kept; a
        // different tax treatment means voiding the order and ringing it up again.
        if update.items.is_some() || update.discount.is_some() || update.paid_amount.is_some() {
            let subtotal: Rupiah = items.iter().map(|i| i.subtotal).sum();
            let total = subtotal + header.tax - header.discount;
            let change = header.paid_amount.saturating_change(total);
            header = transactions::update_totals(transaction_id, subtotal, header.tax, total, change, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("📝️ Transaction [{}] updated", header.transaction_number);
        Ok(TransactionAggregate { transaction: header, items })
    }

    async fn cancel_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Transaction, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let header = transactions::fetch_transaction(ctx.tenant_id, transaction_id, &mut tx)
            .await?
            .ok_or(PosDatabaseError::TransactionNotFound(transaction_id))?;
        match header.status {
            TransactionStatus::Cancelled => return Err(PosDatabaseError::TransactionAlreadyCancelled(transaction_id)),
            TransactionStatus::Completed => return Err(PosDatabaseError::TransactionCompleted(transaction_id)),
            TransactionStatus::Pending => {},
        }
        let items = transactions::fetch_items(transaction_id, &mut tx).await?;
        products::restore_stock_for_items(ctx.tenant_id, &items, &mut tx).await?;
        payments::cancel_pending_for_transaction(transaction_id, &mut tx).await?;
        let header = transactions::update_status(transaction_id, TransactionStatus::Cancelled, &mut tx).await?;
        tx.commit().await?;
        info!("🔄️ Transaction [{}] cancelled by user {}", header.transaction_number, ctx.actor_id);
        Ok(header)
    }

    async fn delete_transaction(&self, ctx: &TenantContext, transaction_id: i64) -> Result<(), PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let header = transactions::fetch_transaction(ctx.tenant_id, transaction_id, &mut tx)
            .await?
            .ok_or(PosDatabaseError::TransactionNotFound(transaction_id))?;
        payments::delete_for_transaction(transaction_id, &mut tx).await?;
        transactions::delete_items(transaction_id, &mut tx).await?;
        transactions::delete_transaction(transaction_id, &mut tx).await?;
        tx.commit().await?;
        warn!("🗑️ Transaction [{}] hard-deleted by user {}", header.transaction_number, ctx.actor_id);
        Ok(())
    }

    async fn insert_payment(&self, ctx: &TenantContext, payment: NewPayment) -> Result<Payment, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let trx_id = payment.transaction_id;
        let header = transactions::fetch_transaction(ctx.tenant_id, trx_id, &mut tx)
            .await?
            .ok_or(PosDatabaseError::TransactionNotFound(trx_id))?;
        if header.status != TransactionStatus::Pending {
            return Err(PosDatabaseError::TransactionNotPayable(trx_id));
        }
        if payments::fetch_successful_payment(trx_id, &mut tx).await?.is_some() {
            return Err(PosDatabaseError::TransactionAlreadyPaid(trx_id));
        }
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn fetch_payment(&self, ctx: &TenantContext, payment_id: i64) -> Result<Option<Payment>, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_payment(ctx.tenant_id, payment_id, &mut conn).await?)
    }

    async fn fetch_payments_for_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Vec<Payment>, PosDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction(ctx.tenant_id, transaction_id, &mut conn)
            .await?
            .ok_or(PosDatabaseError::TransactionNotFound(transaction_id))?;
        Ok(payments::fetch_payments_for_transaction(transaction_id, &mut conn).await?)
    }

    async fn apply_gateway_update(
        &self,
        merchant_order_id: &str,
        update: GatewayUpdate,
    ) -> Result<Payment, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_merchant_order_id(merchant_order_id, &mut tx)
            .await?
            .ok_or_else(|| PosDatabaseError::MerchantOrderNotFound(merchant_order_id.to_string()))?;
        let status = update.status();
        let payment = self.apply_update(payment, status, update, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn apply_poll_update(
        &self,
        ctx: &TenantContext,
        payment_id: i64,
        update: GatewayUpdate,
    ) -> Result<Payment, PosDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment(ctx.tenant_id, payment_id, &mut tx)
            .await?
            .ok_or(PosDatabaseError::PaymentNotFound(payment_id))?;
        let status = update.poll_status();
        let payment = self.apply_update(payment, status, update, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn sweep_expired(&self, ctx: &TenantContext, now: DateTime<Utc>) -> Result<usize, PosDatabaseError> {
        self.sweep(Some(ctx.tenant_id), now).await
    }

    async fn sweep_all_expired(&self, now: DateTime<Utc>) -> Result<usize, PosDatabaseError> {
        self.sweep(None, now).await
    }
}
