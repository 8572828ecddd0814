use async_trait::async_trait;
use tracing::info;

/// Outbound channel for booking events and inventory alerts.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink used when no broker is configured: events only reach the log.
pub struct LogEventSink;

#[async_trait]
impl EventSink for LogEventSink {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Event {}/{}: {}", topic, key, payload);
        Ok(())
    }
}
