use skyseat_booking::{EnginePolicy, ReservationEngine};
use skyseat_core::payment::PricingPolicy;
use skyseat_core::repository::{ReservationStore, UserDirectory};
use skyseat_store::app_config::ReservationRules;
use skyseat_store::RedisClient;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub store: Arc<dyn ReservationStore>,
    pub users: Arc<dyn UserDirectory>,
    /// Availability cache and rate limiter. Both are skipped when absent.
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
}

pub fn engine_policy(rules: &ReservationRules) -> EnginePolicy {
    EnginePolicy {
        max_attempts: rules.max_attempts,
        lock_wait: Duration::from_millis(rules.lock_wait_ms),
        retry_backoff: Duration::from_millis(rules.retry_backoff_ms),
        pricing: PricingPolicy {
            tolerance: rules.price_tolerance,
            default_currency: rules.default_currency.clone(),
            default_method: rules.default_payment_method.clone(),
        },
    }
}
