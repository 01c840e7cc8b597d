//! NATS message consumer for incoming payment events

use crate::config::NatsConfig;
use crate::parser::RecordParser;
use anyhow::Result;
use async_nats::{Client, Message, Subscriber};
use tracing::info;

/// Consumer for receiving payment events from NATS
pub struct PaymentConsumer {
    client: Client,
    subject: String,
    key_header: String,
}

impl PaymentConsumer {
    /// Create a new payment consumer
    pub fn new(client: Client, config: &NatsConfig) -> Self {
        Self {
            client,
            subject: config.input_subject.clone(),
            key_header: config.key_header.clone(),
        }
    }

    /// Subscribe to the payment subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to payment subject");
        Ok(subscriber)
    }

    /// Key of a received message
    pub fn record_key(&self, message: &Message) -> String {
        let header = message
            .headers
            .as_ref()
            .and_then(|headers| headers.get(self.key_header.as_str()))
            .map(|value| value.as_str());
        resolve_key(header, &message.payload)
    }
}

/// Key header if present and non-empty, else the payload's
/// `transaction_id`, else the empty string.
pub fn resolve_key(header: Option<&str>, payload: &[u8]) -> String {
    match header.map(str::trim).filter(|h| !h.is_empty()) {
        Some(key) => key.to_string(),
        None => RecordParser::new()
            .parse(payload)
            .transaction_id
            .unwrap_or_default(),
    }
}
