//! Wire types for the Duitku REST API. Field names follow Duitku's camelCase convention.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    pub merchant_code: String,
    pub payment_amount: i64,
    pub payment_method: String,
    pub merchant_order_id: String,
    pub product_details: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_va_name: Option<String>,
    pub callback_url: String,
    pub return_url: String,
    pub expiry_period: i64,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryResponse {
    pub status_code: String,
    pub status_message: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub va_number: Option<String>,
    #[serde(default)]
    pub qr_string: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub merchant_code: String,
    pub merchant_order_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status_code: String,
    pub status_message: String,
    #[serde(default)]
    pub merchant_order_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// The server-to-server callback body. Duitku posts this either as JSON or as a url-encoded form, and omits
/// fields freely, so everything that is not needed for signature verification is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    pub merchant_code: String,
    pub amount: String,
    pub merchant_order_id: String,
    pub result_code: String,
    pub signature: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub product_detail: Option<String>,
    #[serde(default)]
    pub additional_param: Option<String>,
    #[serde(default)]
    pub payment_code: Option<String>,
    #[serde(default)]
    pub merchant_user_id: Option<String>,
    #[serde(default)]
    pub publisher_order_id: Option<String>,
    #[serde(default)]
    pub sp_user_hash: Option<String>,
    #[serde(default)]
    pub settlement_date: Option<String>,
    #[serde(default)]
    pub issuer_code: Option<String>,
}
