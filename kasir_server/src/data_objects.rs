use serde::{Deserialize, Serialize};

/// Request body for opening a gateway payment against a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub transaction_id: i64,
    /// Duitku payment method code, e.g. "SP" for ShopeePay or "VC" for credit card.
    pub payment_method: String,
    /// Customer email forwarded to the gateway. Falls back to a per-tenant noreply address.
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

/// Query parameters for the payment status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentStatusQuery {
    /// When true and the payment is still pending, the gateway is polled before answering.
    #[serde(default)]
    pub realtime: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub swept: usize,
}
