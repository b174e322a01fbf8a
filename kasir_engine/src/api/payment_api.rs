use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{GatewayUpdate, NewPayment, Payment, TenantContext},
    traits::{PosDatabase, PosDatabaseError},
};

/// `PaymentApi` handles the gateway payment lifecycle: recording newly created payments, applying callback and
/// status-poll results, and sweeping expired payments.
pub struct PaymentApi<B> {
    db: B,
}

impl<B> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> PaymentApi<B>
where B: PosDatabase
{
    /// Record a freshly created gateway payment against a transaction. Fails if the transaction already has a
    /// successful payment, or is not in a payable state.
    pub async fn record_new_payment(&self, ctx: &TenantContext, payment: NewPayment) -> Result<Payment, PosDatabaseError> {
        let payment = self.db.insert_payment(ctx, payment).await?;
        info!(
            "💳️ Payment [{}] of {} recorded against transaction {}",
            payment.merchant_order_id, payment.amount, payment.transaction_id
        );
        Ok(payment)
    }

    pub async fn payment(&self, ctx: &TenantContext, payment_id: i64) -> Result<Option<Payment>, PosDatabaseError> {
        self.db.fetch_payment(ctx, payment_id).await
    }

    pub async fn payments_for_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: i64,
    ) -> Result<Vec<Payment>, PosDatabaseError> {
        self.db.fetch_payments_for_transaction(ctx, transaction_id).await
    }

    /// Apply a server-to-server callback from the gateway. Not tenant-scoped: the merchant order id alone
    /// identifies the payment. The caller must have verified the callback signature already.
    pub async fn process_callback(
        &self,
        merchant_order_id: &str,
        update: GatewayUpdate,
    ) -> Result<Payment, PosDatabaseError> {
        debug!("💳️ Processing callback for [{merchant_order_id}] with result code {}", update.result_code);
        self.db.apply_gateway_update(merchant_order_id, update).await
    }

    /// Apply the result of a status poll against the gateway to a payment.
    pub async fn process_poll_result(
        &self,
        ctx: &TenantContext,
        payment_id: i64,
        update: GatewayUpdate,
    ) -> Result<Payment, PosDatabaseError> {
        self.db.apply_poll_update(ctx, payment_id, update).await
    }

    /// Expire overdue pending payments for one tenant, cancelling their transactions and restoring stock. Returns
    /// the number of transactions swept.
    pub async fn sweep_expired(&self, ctx: &TenantContext, now: DateTime<Utc>) -> Result<usize, PosDatabaseError> {
        self.db.sweep_expired(ctx, now).await
    }

    /// As [`sweep_expired`](Self::sweep_expired), but across all tenants. Used by the background worker.
    pub async fn sweep_all_expired(&self, now: DateTime<Utc>) -> Result<usize, PosDatabaseError> {
        self.db.sweep_all_expired(now).await
    }
}
