use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        NewProduct,
        NewTransaction,
        Product,
        TenantContext,
        Transaction,
        TransactionAggregate,
        TransactionPage,
        TransactionQueryFilter,
        UpdateTransaction,
    },
    traits::{PosDatabase, PosDatabaseError},
};

/// `OrderFlowApi` is the primary API for the cashier-facing transaction lifecycle: creating orders, searching and
/// updating them, and cancelling or deleting them.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: PosDatabase
{
    /// Submit a new order. The order, its line items and the stock reservations land atomically; an out-of-stock
    /// line item rejects the entire order and leaves stock untouched.
    pub async fn create_order(
        &self,
        ctx: &TenantContext,
        order: NewTransaction,
    ) -> Result<TransactionAggregate, PosDatabaseError> {
        let result = self.db.create_transaction(ctx, order).await?;
        info!(
            "🛍️ Order [{}] created for tenant {} by user {}. Total: {}",
            result.transaction.transaction_number, ctx.tenant_id, ctx.actor_id, result.transaction.total
        );
        Ok(result)
    }

    pub async fn fetch_order(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Option<TransactionAggregate>, PosDatabaseError> {
        self.db.fetch_transaction(ctx, transaction_id).await
    }

    pub async fn search_orders(
        &self,
        ctx: &TenantContext,
        filter: TransactionQueryFilter,
    ) -> Result<TransactionPage, PosDatabaseError> {
        let page = self.db.search_transactions(ctx, filter).await?;
        trace!("🛍️ Search returned {} of {} transaction(s) for tenant {}", page.transactions.len(), page.total, ctx.tenant_id);
        Ok(page)
    }

    /// Apply a partial update to a pending order. Replacing the line items releases the old stock reservations and
    /// makes the new ones atomically; the monetary totals are recomputed.
    pub async fn update_order(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
        update: UpdateTransaction,
    ) -> Result<TransactionAggregate, PosDatabaseError> {
        let result = self.db.update_transaction(ctx, transaction_id, update).await?;
        debug!("🛍️ Order [{}] updated by user {}", result.transaction.transaction_number, ctx.actor_id);
        Ok(result)
    }

    /// Cancel a pending order, restoring its stock and voiding any pending payments against it.
    pub async fn cancel_order(&self, ctx: &TenantContext, transaction_id: i64) -> Result<Transaction, PosDatabaseError> {
        self.db.cancel_transaction(ctx, transaction_id).await
    }

    /// Hard-delete an order. This is a destructive bookkeeping correction: stock is *not* restored. Callers are
    /// responsible for checking that the actor is allowed to do this.
    pub async fn delete_order(&self, ctx: &TenantContext, transaction_id: i64) -> Result<(), PosDatabaseError> {
        self.db.delete_transaction(ctx, transaction_id).await
    }

    //----------------------------------------- Products ------------------------------------------------------------

    pub async fn add_product(&self, ctx: &TenantContext, product: NewProduct) -> Result<Product, PosDatabaseError> {
        let product = self.db.insert_product(ctx, product).await?;
        info!("🛒️ Product [{}] added for tenant {}", product.name, ctx.tenant_id);
        Ok(product)
    }

    pub async fn fetch_product(&self, ctx: &TenantContext, product_id: i64) -> Result<Option<Product>, PosDatabaseError> {
        self.db.fetch_product(ctx, product_id).await
    }

    pub async fn products(&self, ctx: &TenantContext) -> Result<Vec<Product>, PosDatabaseError> {
        self.db.fetch_products(ctx).await
    }

    /// Manually adjust a product's stock level, e.g. after a delivery or a stock take.
    pub async fn adjust_stock(
        &self,
        ctx: &TenantContext,
        product_id: i64,
        delta: i64,
    ) -> Result<Product, PosDatabaseError> {
        let product = self.db.adjust_stock(ctx, product_id, delta).await?;
        info!("🛒️ Stock for product [{}] adjusted by {delta} to {}", product.name, product.stock);
        Ok(product)
    }
}
