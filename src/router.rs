//! Delivery of routed records to their destinations.
//!
//! Classification only tags a record with a [`Destination`]; a
//! [`RecordSink`] turns the tag into a concrete channel. The NATS sink lives
//! in [`crate::producer`], the in-memory sink here backs tests and dry runs.

use crate::config::NatsConfig;
use crate::types::decision::{Destination, RoutedRecord};
use anyhow::{bail, Result};
use std::future::Future;
use std::sync::Mutex;

/// Delivers routed records to the channel named by their destination
pub trait RecordSink: Send + Sync + 'static {
    fn publish(&self, record: &RoutedRecord) -> impl Future<Output = Result<()>> + Send;
}

/// Subject names per destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    pub flagged: String,
    pub approved: String,
    pub dead_letter: String,
}

impl RouteTable {
    pub fn from_config(config: &NatsConfig) -> Self {
        Self {
            flagged: config.flagged_subject.clone(),
            approved: config.approved_subject.clone(),
            dead_letter: config.dead_letter_subject.clone(),
        }
    }

    pub fn subject(&self, destination: Destination) -> &str {
        match destination {
            Destination::Flagged => &self.flagged,
            Destination::Approved => &self.approved,
            Destination::DeadLetter => &self.dead_letter,
        }
    }

    /// One line per route, for the startup log
    pub fn describe(&self, input_subject: &str) -> String {
        [Destination::Flagged, Destination::Approved, Destination::DeadLetter]
            .iter()
            .map(|d| format!("{} -> [{}] -> {}", input_subject, d, self.subject(*d)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Collects routed records in memory
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<RoutedRecord>>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every record
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// All records delivered so far, in delivery order
    pub fn records(&self) -> Vec<RoutedRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records delivered to one destination, in delivery order
    pub fn delivered_to(&self, destination: Destination) -> Vec<RoutedRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.destination == destination)
            .collect()
    }
}

impl RecordSink for MemorySink {
    async fn publish(&self, record: &RoutedRecord) -> Result<()> {
        if self.fail {
            bail!("sink rejected record {}", record.key);
        }
        match self.records.lock() {
            Ok(mut records) => {
                records.push(record.clone());
                Ok(())
            }
            Err(_) => bail!("sink lock poisoned"),
        }
    }
}
