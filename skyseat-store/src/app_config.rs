use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub reservation: ReservationRules,
}

/// Tunables of the reservation engine's atomic section and fare checks.
#[derive(Debug, Deserialize, Clone)]
pub struct ReservationRules {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: f64,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default = "default_payment_method")]
    pub default_payment_method: String,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            lock_wait_ms: default_lock_wait_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            price_tolerance: default_price_tolerance(),
            default_currency: default_currency(),
            default_payment_method: default_payment_method(),
        }
    }
}

fn default_max_attempts() -> u32 { 5 }
fn default_lock_wait_ms() -> u64 { 2000 }
fn default_retry_backoff_ms() -> u64 { 20 }
fn default_price_tolerance() -> f64 { skyseat_core::payment::PRICE_TOLERANCE }
fn default_currency() -> String { skyseat_core::payment::DEFAULT_CURRENCY.to_string() }
fn default_payment_method() -> String { skyseat_core::payment::DEFAULT_METHOD.to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 { 100 }

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `SKYSEAT__RESERVATION__MAX_ATTEMPTS=8`
            .add_source(config::Environment::with_prefix("SKYSEAT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
