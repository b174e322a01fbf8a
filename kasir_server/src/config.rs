use std::env;

use duitku_tools::DuitkuConfig;
use log::*;

const DEFAULT_KG_HOST: &str = "127.0.0.1";
const DEFAULT_KG_PORT: u16 = 8000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How often the background worker sweeps for expired payments.
    pub sweep_interval_secs: u64,
    /// Payment gateway credentials and endpoints.
    pub duitku: DuitkuConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_KG_HOST.to_string(),
            port: DEFAULT_KG_PORT,
            database_url: String::default(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            duitku: DuitkuConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16, database_url: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            database_url: database_url.to_string(),
            ..Default::default()
        }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("KG_HOST").unwrap_or_else(|_| DEFAULT_KG_HOST.to_string());
        let port = env::var("KG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("{s} is not a valid port for KG_PORT. {e} Using the default, {DEFAULT_KG_PORT}, instead.");
                    DEFAULT_KG_PORT
                })
            })
            .unwrap_or(DEFAULT_KG_PORT);
        let database_url = env::var("KG_DATABASE_URL").unwrap_or_else(|_| {
            warn!("KG_DATABASE_URL is not set. Using the default sqlite database");
            "sqlite://data/kasirgo.db".to_string()
        });
        let sweep_interval_secs = env::var("KG_EXPIRY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        let duitku = DuitkuConfig::new_from_env_or_default();
        Self { host, port, database_url, sweep_interval_secs, duitku }
    }
}
