//! A thin client for the Duitku payment gateway.
//!
//! Covers the three interactions the POS backend needs: creating a payment inquiry, polling a transaction's
//! status, and verifying the signature on server-to-server callbacks. Each interaction signs its parameters with
//! the MD5 scheme Duitku prescribes for it; the field orders differ between the three, which is why the
//! [`signature`] module spells them out individually.

mod api;
mod config;
mod error;

mod data_objects;
pub mod signature;

pub use api::{DuitkuApi, NewInquiry};
pub use config::DuitkuConfig;
pub use data_objects::{CallbackPayload, InquiryRequest, InquiryResponse, StatusRequest, StatusResponse};
pub use error::DuitkuApiError;

/// Duitku's result code for a successful or settled payment.
pub const RESULT_SUCCESS: &str = "00";
/// Duitku's result code for a payment that is still being processed.
pub const RESULT_PENDING: &str = "01";
/// Duitku's result code for a cancelled payment.
pub const RESULT_CANCELLED: &str = "02";
