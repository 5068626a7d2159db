//! Domain event publication over NATS.

use crate::domain::events::DomainEvent;

/// Publishes domain events when a NATS client is configured; otherwise the
/// events are only traced. Publishing never fails the calling operation.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self::new(Some(client))
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "NATS unavailable, events will not be published");
                Self::disabled()
            }
        }
    }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let Some(client) = &self.nats else {
            tracing::debug!(%subject, "event not published, no broker configured");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(%subject, error = %err, "failed to encode event");
                return;
            }
        };
        if let Err(err) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %err, "failed to publish event");
        }
    }
}
