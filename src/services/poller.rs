use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::error::{CollectorError, Result};
use crate::metrics::METRICS;
use crate::models::{HostIdentity, ProcessRecord};
use crate::services::exporter::Exporter;
use crate::services::process_lister::ProcessSource;
use crate::services::tagger::tag_and_filter;
use crate::state::{ConfigView, RuntimeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Auto refresh is off
    Idle,
    /// Number of processes handed to the exporter
    Exported(usize),
    Failed,
}

/// Enumerates and tags one snapshot with the given settings.
pub async fn collect(source: Arc<dyn ProcessSource>, view: &ConfigView) -> Result<Vec<ProcessRecord>> {
    let raw = tokio::task::spawn_blocking(move || source.list_processes())
        .await
        .map_err(|e| CollectorError::Enumeration(format!("enumeration task failed: {}", e)))??;

    Ok(tag_and_filter(raw, view.hide_default_processes, &view.search_string))
}

/// Periodic snapshot loop. Ticks are always taken; work only happens while
/// auto refresh is on. A cycle is awaited before the next tick is considered,
/// and ticks missed meanwhile are skipped, so cycles never overlap.
pub struct Poller {
    config: Arc<RuntimeConfig>,
    source: Arc<dyn ProcessSource>,
    identity: watch::Receiver<Option<HostIdentity>>,
    exporter: Exporter,
}

impl Poller {
    pub fn new(
        config: Arc<RuntimeConfig>,
        source: Arc<dyn ProcessSource>,
        identity: watch::Receiver<Option<HostIdentity>>,
        exporter: Exporter,
    ) -> Self {
        Self {
            config,
            source,
            identity,
            exporter,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = self.config.watch_refresh_interval();
        let mut ticker = new_ticker(self.config.refresh_interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = interval.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let period = Duration::from_secs(*interval.borrow_and_update());
                    log::info!("Refresh interval changed to {} seconds", period.as_secs());
                    ticker = new_ticker(period);
                }
                _ = shutdown.changed() => break,
            }
        }

        log::info!("Poller stopped");
    }

    /// Runs a single cycle. Failures are logged and reported, never raised.
    pub async fn tick(&self) -> CycleOutcome {
        let view = self.config.view();
        if !view.auto_refresh {
            log::debug!("Auto refresh disabled, skipping tick");
            METRICS.poll_cycles.with_label_values(&["idle"]).inc();
            return CycleOutcome::Idle;
        }

        let outcome = match self.cycle(&view).await {
            Ok(count) => CycleOutcome::Exported(count),
            Err(e) => {
                log::error!("{}", e);
                CycleOutcome::Failed
            }
        };

        let label = match outcome {
            CycleOutcome::Exported(_) => "exported",
            _ => "failed",
        };
        METRICS.poll_cycles.with_label_values(&[label]).inc();
        outcome
    }

    async fn cycle(&self, view: &ConfigView) -> Result<usize> {
        let identity = self
            .identity
            .borrow()
            .clone()
            .ok_or_else(|| CollectorError::Identity("host identity not resolved yet".to_string()))?;

        let processes = collect(self.source.clone(), view).await?;
        let count = processes.len();
        log::info!("{} running processes", count);

        self.exporter.export(&identity, processes)?;
        METRICS.processes_exported.set(count as i64);
        Ok(count)
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
