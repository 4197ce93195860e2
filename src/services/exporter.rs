use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::metrics::METRICS;
use crate::models::{Envelope, HostIdentity, ProcessRecord};

/// Delivery queue bound used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Final consumer of a serialized envelope.
///
/// Called from a blocking worker thread, one payload at a time.
pub trait Sink: Send + Sync + 'static {
    fn deliver(&self, payload: &[u8]);
}

impl<F> Sink for F
where
    F: Fn(&[u8]) + Send + Sync + 'static,
{
    fn deliver(&self, payload: &[u8]) {
        self(payload)
    }
}

/// Writes each envelope to the log.
pub struct LogSink;

impl Sink for LogSink {
    fn deliver(&self, payload: &[u8]) {
        log::info!("Returned JSON: {}", String::from_utf8_lossy(payload));
    }
}

/// Writes each envelope as one line on stdout.
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn deliver(&self, payload: &[u8]) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(payload).and_then(|_| out.write_all(b"\n")) {
            log::warn!("Failed to write snapshot to stdout: {}", e);
        }
    }
}

/// Serializes one snapshot into the export envelope.
pub fn render_envelope(identity: &HostIdentity, processes: Vec<ProcessRecord>) -> Result<Vec<u8>> {
    let envelope = Envelope::new(identity.clone(), processes);
    Ok(serde_json::to_vec(&envelope)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queue full or worker gone
    Dropped,
}

/// Hands envelopes to a single delivery worker through a bounded queue, so
/// a slow sink never holds up the poller.
#[derive(Clone)]
pub struct Exporter {
    tx: mpsc::Sender<Vec<u8>>,
}

impl Exporter {
    pub fn spawn(sink: Arc<dyn Sink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                let sink = sink.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || sink.deliver(&payload)).await {
                    log::error!("Sink failed while delivering snapshot: {}", e);
                }
            }
            log::debug!("Delivery queue closed");
        });

        (Self { tx }, worker)
    }

    /// Encodes and enqueues. The sink is never called if encoding fails.
    pub fn export(&self, identity: &HostIdentity, processes: Vec<ProcessRecord>) -> Result<Delivery> {
        let payload = render_envelope(identity, processes).map_err(|e| {
            METRICS.serialization_failures.inc();
            e
        })?;

        let delivery = match self.tx.try_send(payload) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                log::warn!("Delivery queue is full, snapshot dropped");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                log::warn!("Delivery worker has stopped, snapshot dropped");
                Delivery::Dropped
            }
        };

        let label = match delivery {
            Delivery::Queued => "queued",
            Delivery::Dropped => "dropped",
        };
        METRICS.export_deliveries.with_label_values(&[label]).inc();
        Ok(delivery)
    }
}
