use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::DuitkuConfig,
    data_objects::{CallbackPayload, InquiryRequest, InquiryResponse, StatusRequest, StatusResponse},
    signature::{callback_signature, inquiry_signature, status_signature},
    DuitkuApiError,
    RESULT_SUCCESS,
};

/// How long to wait on the gateway before giving up. Duitku is occasionally slow, but a cashier standing at the
/// till cannot wait forever.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// The parameters the POS supplies when opening a new payment; everything else in the
/// [`InquiryRequest`] comes from configuration.
#[derive(Debug, Clone)]
pub struct NewInquiry {
    pub merchant_order_id: String,
    pub amount: i64,
    pub payment_method: String,
    pub product_details: String,
    pub email: String,
    pub customer_name: Option<String>,
}

#[derive(Clone)]
pub struct DuitkuApi {
    config: DuitkuConfig,
    client: Arc<Client>,
}

impl DuitkuApi {
    pub fn new(config: DuitkuConfig) -> Result<Self, DuitkuApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| DuitkuApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &DuitkuConfig {
        &self.config
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, DuitkuApiError> {
        let url = format!("{}{path}", self.config.base_url());
        trace!("Posting to gateway: {url}");
        let response =
            self.client.post(url).json(body).send().await.map_err(|e| DuitkuApiError::Unreachable(e.to_string()))?;
        if response.status().is_success() {
            response.json::<T>().await.map_err(|e| DuitkuApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| DuitkuApiError::Unreachable(e.to_string()))?;
            Err(DuitkuApiError::QueryError { status, message })
        }
    }

    /// Opens a payment with the gateway. Returns the gateway's inquiry response (payment URL, VA number, etc.) or
    /// an error if the gateway rejected the inquiry.
    pub async fn create_inquiry(&self, inquiry: NewInquiry) -> Result<InquiryResponse, DuitkuApiError> {
        let signature = inquiry_signature(
            &self.config.merchant_code,
            &inquiry.merchant_order_id,
            inquiry.amount,
            self.config.api_key.reveal(),
        );
        let request = InquiryRequest {
            merchant_code: self.config.merchant_code.clone(),
            payment_amount: inquiry.amount,
            payment_method: inquiry.payment_method,
            merchant_order_id: inquiry.merchant_order_id.clone(),
            product_details: inquiry.product_details,
            email: inquiry.email,
            customer_va_name: inquiry.customer_name,
            callback_url: self.config.callback_url.clone(),
            return_url: self.config.return_url.clone(),
            expiry_period: self.config.expiry_period_mins,
            signature,
        };
        let response: InquiryResponse = self.post("/webapi/api/merchant/v2/inquiry", &request).await?;
        if response.status_code != RESULT_SUCCESS {
            return Err(DuitkuApiError::Rejected {
                code: response.status_code,
                message: response.status_message,
            });
        }
        debug!("💳️ Gateway opened payment [{}], ref {:?}", inquiry.merchant_order_id, response.reference);
        Ok(response)
    }

    /// Polls the gateway for the current status of a payment.
    pub async fn transaction_status(&self, merchant_order_id: &str) -> Result<StatusResponse, DuitkuApiError> {
        let signature =
            status_signature(&self.config.merchant_code, merchant_order_id, self.config.api_key.reveal());
        let request = StatusRequest {
            merchant_code: self.config.merchant_code.clone(),
            merchant_order_id: merchant_order_id.to_string(),
            signature,
        };
        self.post("/webapi/api/merchant/transactionStatus", &request).await
    }

    /// Verifies the MD5 signature on a callback body against our merchant credentials. The merchant code comes
    /// from our configuration, not the payload, so a caller cannot pick the code the signature is checked over.
    pub fn verify_callback(&self, payload: &CallbackPayload) -> bool {
        let expected = callback_signature(
            &self.config.merchant_code,
            &payload.amount,
            &payload.merchant_order_id,
            self.config.api_key.reveal(),
        );
        let valid = expected.eq_ignore_ascii_case(&payload.signature);
        if !valid {
            warn!("💳️ Callback signature mismatch for [{}]", payload.merchant_order_id);
        }
        valid
    }
}
