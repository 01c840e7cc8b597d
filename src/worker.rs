//! Partitioned workers for parallel record processing.
//!
//! Each worker owns one bounded queue and handles its records strictly in
//! arrival order. A record's partition is a hash of its key, so records that
//! share a key are processed and delivered in the order they were admitted,
//! while different keys proceed in parallel.

use crate::error::PipelineError;
use crate::metrics::PipelineMetrics;
use crate::pipeline::{FraudPipeline, Outcome};
use crate::router::RecordSink;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One admitted record
#[derive(Debug)]
struct WorkItem {
    key: String,
    payload: Bytes,
}

/// Why the admission loop stopped
#[derive(Debug)]
pub enum Stopped {
    /// Shutdown was requested
    Signal,
    /// The input stream ended
    InputClosed,
    /// A worker reported an unrecoverable error
    Fatal(PipelineError),
}

/// Fixed set of workers, one queue each
pub struct PartitionedWorkers {
    senders: Vec<mpsc::Sender<WorkItem>>,
    handles: Vec<JoinHandle<()>>,
}

impl PartitionedWorkers {
    /// Spawn `count` workers sharing one pipeline and sink.
    ///
    /// Unrecoverable delivery errors are sent on `fatal`. The reporting
    /// worker then stops, logging and counting each record still queued
    /// behind the failure as abandoned.
    pub fn spawn<S: RecordSink>(
        count: usize,
        queue_capacity: usize,
        pipeline: Arc<FraudPipeline>,
        sink: Arc<S>,
        metrics: Arc<PipelineMetrics>,
        fatal: mpsc::UnboundedSender<PipelineError>,
    ) -> Self {
        let count = count.max(1);
        let mut senders = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);

        for id in 0..count {
            let (tx, rx) = mpsc::channel(queue_capacity.max(1));
            senders.push(tx);
            handles.push(tokio::spawn(run_worker(
                id,
                rx,
                pipeline.clone(),
                sink.clone(),
                metrics.clone(),
                fatal.clone(),
            )));
        }

        info!(workers = count, queue_capacity, "Partition workers started");
        Self { senders, handles }
    }

    /// Number of partitions
    pub fn partitions(&self) -> usize {
        self.senders.len()
    }

    /// Partition a key is assigned to
    pub fn partition_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    /// Queue a record on its key's partition, waiting while the queue is full
    pub async fn submit(&self, key: String, payload: Bytes) -> Result<(), PipelineError> {
        let partition = self.partition_for(&key);
        self.senders[partition]
            .send(WorkItem { key, payload })
            .await
            .map_err(|e| PipelineError::Publish {
                destination: format!("partition {}", partition),
                reason: format!("worker stopped, record {} not admitted", e.0.key),
            })
    }

    /// Stop admitting, let every queued and in-flight record finish, then join the workers
    pub async fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task failed");
            }
        }
        info!("Partition workers stopped");
    }
}

async fn run_worker<S: RecordSink>(
    id: usize,
    mut rx: mpsc::Receiver<WorkItem>,
    pipeline: Arc<FraudPipeline>,
    sink: Arc<S>,
    metrics: Arc<PipelineMetrics>,
    fatal: mpsc::UnboundedSender<PipelineError>,
) {
    debug!(worker = id, "Worker started");

    while let Some(item) = rx.recv().await {
        let start_time = Instant::now();
        let outcome = pipeline.handle(&item.key, &item.payload);

        match &outcome {
            Outcome::Routed(processed) => {
                if processed.classification.is_anomaly() {
                    metrics.record_routing_anomaly();
                }
                metrics.record_transaction(
                    start_time.elapsed(),
                    processed.assessment.score.as_f64(),
                    processed.classification.decision,
                );
            }
            Outcome::Malformed { .. } => metrics.record_malformed(),
        }

        let Some(record) = outcome.record() else {
            continue;
        };

        if let Err(e) = sink.publish(record).await {
            metrics.record_publish_failure();
            error!(
                worker = id,
                transaction_id = %record.key,
                destination = %record.destination,
                error = %e,
                "Failed to publish record"
            );
            let _ = fatal.send(PipelineError::Publish {
                destination: record.destination.to_string(),
                reason: e.to_string(),
            });
            abandon_queued(id, &mut rx, &metrics);
            return;
        }
    }

    debug!(worker = id, "Worker drained");
}

/// Refuse further records and account for every one still queued.
fn abandon_queued(id: usize, rx: &mut mpsc::Receiver<WorkItem>, metrics: &PipelineMetrics) {
    rx.close();
    let mut abandoned = 0u64;
    while let Ok(item) = rx.try_recv() {
        metrics.record_abandoned();
        abandoned += 1;
        error!(
            worker = id,
            transaction_id = %item.key,
            "Record abandoned after fatal publish failure"
        );
    }
    if abandoned > 0 {
        warn!(worker = id, abandoned, "Worker stopped with queued records");
    }
}

/// Admit records from `input` until shutdown is signalled, the input ends
/// or a worker reports a fatal error.
///
/// Shutdown is checked before every admission, so once `shutdown` resolves
/// no further record is taken from `input`.
pub async fn run_until_shutdown<St, F>(
    mut input: St,
    workers: &PartitionedWorkers,
    shutdown: F,
    fatal: &mut mpsc::UnboundedReceiver<PipelineError>,
) -> Stopped
where
    St: Stream<Item = (String, Bytes)> + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested, no new records admitted");
                return Stopped::Signal;
            }
            Some(err) = fatal.recv() => {
                return Stopped::Fatal(err);
            }
            next = input.next() => match next {
                Some((key, payload)) => {
                    if let Err(e) = workers.submit(key, payload).await {
                        return Stopped::Fatal(e);
                    }
                }
                None => {
                    warn!("Input stream closed");
                    return Stopped::InputClosed;
                }
            }
        }
    }
}
