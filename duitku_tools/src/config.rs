use kasir_common::{parse_boolean_flag, Secret};
use log::*;

const SANDBOX_BASE_URL: &str = "https://sandbox.duitku.com";
const PRODUCTION_BASE_URL: &str = "https://passport.duitku.com";

#[derive(Debug, Clone, Default)]
pub struct DuitkuConfig {
    pub merchant_code: String,
    pub api_key: Secret<String>,
    pub sandbox: bool,
    pub callback_url: String,
    pub return_url: String,
    /// How long, in minutes, a customer has to settle a payment before Duitku expires it.
    pub expiry_period_mins: i64,
}

impl DuitkuConfig {
    pub fn new_from_env_or_default() -> Self {
        let merchant_code = std::env::var("DUITKU_MERCHANT_CODE").unwrap_or_else(|_| {
            warn!("DUITKU_MERCHANT_CODE not set, using a (probably useless) default");
            "D0000".to_string()
        });
        let api_key = Secret::new(std::env::var("DUITKU_API_KEY").unwrap_or_else(|_| {
            warn!("DUITKU_API_KEY not set, using a (probably useless) default");
            "00000000000000000000".to_string()
        }));
        let sandbox = parse_boolean_flag(std::env::var("DUITKU_SANDBOX").ok(), true);
        let callback_url = std::env::var("DUITKU_CALLBACK_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api/payments/callback".to_string());
        let return_url = std::env::var("DUITKU_RETURN_URL").unwrap_or_else(|_| "http://localhost:8000/".to_string());
        let expiry_period_mins = std::env::var("DUITKU_EXPIRY_PERIOD_MINS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60);
        Self { merchant_code, api_key, sandbox, callback_url, return_url, expiry_period_mins }
    }

    pub fn base_url(&self) -> &'static str {
        if self.sandbox {
            SANDBOX_BASE_URL
        } else {
            PRODUCTION_BASE_URL
        }
    }
}
