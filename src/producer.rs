//! NATS message producers for routed records

use crate::config::NatsConfig;
use crate::error::PipelineError;
use crate::router::{RecordSink, RouteTable};
use crate::types::decision::{Destination, RoutedRecord};
use anyhow::Result;
use async_nats::{Client, HeaderMap};
use bytes::Bytes;
use tracing::debug;

/// Publishes keyed records to one NATS subject
#[derive(Clone)]
pub struct SubjectProducer {
    client: Client,
    subject: String,
    key_header: String,
}

impl SubjectProducer {
    /// Create a new producer for a subject
    pub fn new(client: Client, subject: &str, key_header: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            key_header: key_header.to_string(),
        }
    }

    /// Publish a payload with its key in the key header
    pub async fn publish(&self, key: &str, payload: Bytes) -> Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert(self.key_header.as_str(), key);

        self.client
            .publish_with_headers(self.subject.clone(), headers, payload)
            .await
            .map_err(|e| PipelineError::Publish {
                destination: self.subject.clone(),
                reason: e.to_string(),
            })?;

        debug!(transaction_id = %key, subject = %self.subject, "Published record");
        Ok(())
    }
}

/// The flagged, approved and dead-letter subjects behind one sink
pub struct NatsSinks {
    flagged: SubjectProducer,
    approved: SubjectProducer,
    dead_letter: SubjectProducer,
}

impl NatsSinks {
    pub fn new(client: Client, config: &NatsConfig) -> Self {
        let routes = RouteTable::from_config(config);
        Self {
            flagged: SubjectProducer::new(client.clone(), &routes.flagged, &config.key_header),
            approved: SubjectProducer::new(client.clone(), &routes.approved, &config.key_header),
            dead_letter: SubjectProducer::new(client, &routes.dead_letter, &config.key_header),
        }
    }
}

impl RecordSink for NatsSinks {
    async fn publish(&self, record: &RoutedRecord) -> Result<()> {
        let producer = match record.destination {
            Destination::Flagged => &self.flagged,
            Destination::Approved => &self.approved,
            Destination::DeadLetter => &self.dead_letter,
        };
        producer.publish(&record.key, record.payload.clone()).await
    }
}
