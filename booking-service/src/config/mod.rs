use config::{Config as Cfg, Environment, File};
use secrecy::Secret;
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::booking::ProcessorKind;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub payfast: PayFastConfig,
    #[serde(default)]
    pub yoco: YocoConfig,
    /// Fallback when the customer does not choose a processor.
    #[serde(default = "default_processor")]
    pub default_processor: ProcessorKind,
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: String,
}

fn default_processor() -> ProcessorKind {
    ProcessorKind::Payfast
}

fn default_audit_log_path() -> String {
    "data/payment_notifications.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayFastConfig {
    #[serde(default)]
    pub merchant_id: String,
    #[serde(default)]
    pub merchant_key: String,
    /// Optional passphrase that salts ITN signatures; empty means unsalted.
    #[serde(default = "empty_secret")]
    pub passphrase: Secret<String>,
    #[serde(default = "default_true")]
    pub sandbox: bool,
    #[serde(default)]
    pub return_url: String,
    #[serde(default)]
    pub cancel_url: String,
    #[serde(default)]
    pub notify_url: String,
}

impl Default for PayFastConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            merchant_key: String::new(),
            passphrase: empty_secret(),
            sandbox: true,
            return_url: String::new(),
            cancel_url: String::new(),
            notify_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct YocoConfig {
    #[serde(default = "empty_secret")]
    pub secret_key: Secret<String>,
    #[serde(default)]
    pub public_key: String,
    #[serde(default = "empty_secret")]
    pub webhook_secret: Secret<String>,
    #[serde(default = "default_true")]
    pub test_mode: bool,
    #[serde(default)]
    pub success_url: String,
    #[serde(default)]
    pub cancel_url: String,
}

impl Default for YocoConfig {
    fn default() -> Self {
        Self {
            secret_key: empty_secret(),
            public_key: String::new(),
            webhook_secret: empty_secret(),
            test_mode: true,
            success_url: String::new(),
            cancel_url: String::new(),
        }
    }
}

fn empty_secret() -> Secret<String> {
    Secret::new(String::new())
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load from an optional `configuration` file with `BOOKING__`-prefixed
    /// environment variables layered on top.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(Environment::with_prefix("BOOKING").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
