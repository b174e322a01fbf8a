use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{
    GatewayUpdate,
    NewPayment,
    NewProduct,
    NewTransaction,
    Payment,
    Product,
    TenantContext,
    Transaction,
    TransactionAggregate,
    TransactionPage,
    TransactionQueryFilter,
    UpdateTransaction,
};

#[derive(Debug, Clone, Error)]
pub enum PosDatabaseError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product [{0}] does not exist")]
    ProductNotFound(i64),
    #[error("Insufficient stock for product [{product_id}]: requested {requested}, only {available} available")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Invalid quantity {quantity} for product [{product_id}]")]
    InvalidQuantity { product_id: i64, quantity: i64 },
    #[error("Transaction [{0}] does not exist")]
    TransactionNotFound(i64),
    #[error("Transaction [{0}] is already cancelled")]
    TransactionAlreadyCancelled(i64),
    #[error("Transaction [{0}] is completed and can no longer be cancelled")]
    TransactionCompleted(i64),
    #[error("Transaction [{0}] already has a successful payment")]
    TransactionAlreadyPaid(i64),
    #[error("Transaction [{0}] is not payable in its current state")]
    TransactionNotPayable(i64),
    #[error("Payment [{0}] does not exist")]
    PaymentNotFound(i64),
    #[error("No payment matches merchant order id [{0}]")]
    MerchantOrderNotFound(String),
    #[error("The update request does not change anything")]
    EmptyUpdate,
}

impl From<sqlx::Error> for PosDatabaseError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The storage contract for the POS engine.
///
/// Implementations must make each operation atomic: a failure partway through (for example, an out-of-stock line
/// item in the middle of an order) must leave no trace of the attempt. Every tenant-scoped method takes a
/// [`TenantContext`] and must never return or mutate rows belonging to a different tenant.
#[allow(async_fn_in_trait)]
pub trait PosDatabase: Clone {
    /// The URL of the database, for logging.
    fn url(&self) -> &str;

    //----------------------------------------- Products ------------------------------------------------------------

    async fn insert_product(&self, ctx: &TenantContext, product: NewProduct) -> Result<Product, PosDatabaseError>;

    async fn fetch_product(&self, ctx: &TenantContext, product_id: i64) -> Result<Option<Product>, PosDatabaseError>;

    async fn fetch_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, PosDatabaseError>;

    /// Adds `delta` (which may be negative) to a product's stock level. Fails with `InsufficientStock` if the
    /// adjustment would take the level below zero.
    async fn adjust_stock(&self, ctx: &TenantContext, product_id: i64, delta: i64) -> Result<Product, PosDatabaseError>;

    //--------------------------------------- Transactions ----------------------------------------------------------

    /// Creates a transaction with its line items in a single atomic unit of work. Stock for every line item is
    /// reserved as part of the same unit; if any product has insufficient stock the whole order is rejected and no
    /// stock is taken.
    async fn create_transaction(
        &self,
        ctx: &TenantContext,
        transaction: NewTransaction,
    ) -> Result<TransactionAggregate, PosDatabaseError>;

    async fn fetch_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Option<TransactionAggregate>, PosDatabaseError>;

    /// Searches a tenant's transactions, newest first, with pagination.
    async fn search_transactions(
        &self,
        ctx: &TenantContext,
        filter: TransactionQueryFilter,
    ) -> Result<TransactionPage, PosDatabaseError>;

    /// Applies a partial update to a pending transaction. Replacing line items releases the old reservations and
    /// makes new ones atomically.
    async fn update_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
        update: UpdateTransaction,
    ) -> Result<TransactionAggregate, PosDatabaseError>;

    /// Cancels a pending transaction, restoring the stock its line items had reserved and voiding any pending
    /// payments against it. Completed transactions cannot be cancelled; cancelling twice is an error.
    async fn cancel_transaction(&self, ctx: &TenantContext, transaction_id: i64) -> Result<Transaction, PosDatabaseError>;

    /// Hard-deletes a transaction and its line items. Stock is deliberately *not* restored; this is a bookkeeping
    /// correction for administrators, not a cancellation.
    async fn delete_transaction(&self, ctx: &TenantContext, transaction_id: i64) -> Result<(), PosDatabaseError>;

    //----------------------------------------- Payments ------------------------------------------------------------

    /// Records a freshly created gateway payment against a transaction. Fails if the transaction already has a
    /// successful payment, or is not in a payable state.
    async fn insert_payment(&self, ctx: &TenantContext, payment: NewPayment) -> Result<Payment, PosDatabaseError>;

    async fn fetch_payment(&self, ctx: &TenantContext, payment_id: i64) -> Result<Option<Payment>, PosDatabaseError>;

    async fn fetch_payments_for_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Vec<Payment>, PosDatabaseError>;

    /// Applies a gateway state change to a payment identified by its merchant order id. This is the callback path:
    /// it is *not* tenant-scoped, since the gateway does not authenticate as a tenant; the merchant order id alone
    /// identifies the payment. Terminal payments are left untouched, so replayed callbacks are harmless.
    async fn apply_gateway_update(
        &self,
        merchant_order_id: &str,
        update: GatewayUpdate,
    ) -> Result<Payment, PosDatabaseError>;

    /// Applies a gateway state change to a payment fetched by a status poll. Same semantics as
    /// [`apply_gateway_update`](Self::apply_gateway_update), but tenant-scoped and addressed by payment id.
    async fn apply_poll_update(
        &self,
        ctx: &TenantContext,
        payment_id: i64,
        update: GatewayUpdate,
    ) -> Result<Payment, PosDatabaseError>;

    //------------------------------------------ Sweeps -------------------------------------------------------------

    /// Expires every pending payment whose deadline has passed for the given tenant, cancelling the associated
    /// transactions and restoring their stock. Returns the number of transactions swept. Stock for a transaction
    /// is restored at most once, no matter how often the sweep runs.
    async fn sweep_expired(&self, ctx: &TenantContext, now: DateTime<Utc>) -> Result<usize, PosDatabaseError>;

    /// As [`sweep_expired`](Self::sweep_expired), but across all tenants. Used by the background worker.
    async fn sweep_all_expired(&self, now: DateTime<Utc>) -> Result<usize, PosDatabaseError>;
}
