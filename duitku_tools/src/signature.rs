//! Duitku's MD5 request signatures.
//!
//! Each interaction concatenates a different set of fields, in a different order, before hashing. Getting the
//! order wrong produces a signature the gateway silently rejects, so each scheme gets its own function rather
//! than a generic "hash these parts" helper.

use md5::{Digest, Md5};

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Signature for the payment inquiry request: `merchantCode + merchantOrderId + paymentAmount + apiKey`.
pub fn inquiry_signature(merchant_code: &str, merchant_order_id: &str, amount: i64, api_key: &str) -> String {
    md5_hex(&format!("{merchant_code}{merchant_order_id}{amount}{api_key}"))
}

/// Signature for the transaction status poll: `merchantCode + merchantOrderId + apiKey`.
pub fn status_signature(merchant_code: &str, merchant_order_id: &str, api_key: &str) -> String {
    md5_hex(&format!("{merchant_code}{merchant_order_id}{api_key}"))
}

/// Signature on the server-to-server callback: `merchantCode + amount + merchantOrderId + apiKey`.
///
/// `amount` is the verbatim string from the callback body. Duitku formats it with decimals ("94350.00"), and the
/// hash must cover exactly the bytes that were sent.
pub fn callback_signature(merchant_code: &str, amount: &str, merchant_order_id: &str, api_key: &str) -> String {
    md5_hex(&format!("{merchant_code}{amount}{merchant_order_id}{api_key}"))
}
