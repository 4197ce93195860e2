use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{CollectorError, Result};
use crate::models::{Envelope, HostIdentity};
use crate::services::exporter::Exporter;
use crate::services::host_identity::{resolve_identity, IdentityResolver};
use crate::services::poller::{collect, Poller};
use crate::services::process_lister::ProcessSource;
use crate::state::RuntimeConfig;

/// Start/stop entry points for a service manager. Owns the poller task and
/// the host identity it exports with.
pub struct Lifecycle {
    config: Arc<RuntimeConfig>,
    source: Arc<dyn ProcessSource>,
    resolver: Arc<dyn IdentityResolver>,
    /// Taken on shutdown so the delivery worker can drain and exit
    exporter: Mutex<Option<Exporter>>,
    identity: watch::Sender<Option<HostIdentity>>,
    shutdown: watch::Sender<bool>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl Lifecycle {
    pub fn new(
        config: Arc<RuntimeConfig>,
        source: Arc<dyn ProcessSource>,
        resolver: Arc<dyn IdentityResolver>,
        exporter: Exporter,
    ) -> Self {
        let (identity, _) = watch::channel(None);
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            source,
            resolver,
            exporter: Mutex::new(Some(exporter)),
            identity,
            shutdown,
            poller: Mutex::new(None),
        }
    }

    /// Resolves host identity, then enables auto refresh and makes sure the
    /// poller is running. On an identity failure nothing is enabled.
    pub async fn start(&self) -> Result<()> {
        let identity = resolve_identity(self.resolver.clone()).await?;

        let mut poller = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
        if poller.as_ref().map_or(true, |task| task.is_finished()) {
            let exporter = self
                .exporter
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
                .ok_or(CollectorError::ShutDown)?;
            let task = Poller::new(
                self.config.clone(),
                self.source.clone(),
                self.identity.subscribe(),
                exporter,
            );
            *poller = Some(tokio::spawn(task.run(self.shutdown.subscribe())));
        }
        drop(poller);

        self.identity.send_replace(Some(identity.clone()));
        self.config.set_auto_refresh(true);

        let view = self.config.view();
        log::info!("Service started for user '{}'", identity.user_name);
        log::info!(
            "Options: [Auto Refresh: {}({} seconds), Hide Defaults: {}]",
            view.auto_refresh,
            view.refresh_interval,
            view.hide_default_processes
        );
        Ok(())
    }

    /// Gates the poller off. An in-flight cycle is left to finish.
    pub fn stop(&self) -> Result<()> {
        self.config.set_auto_refresh(false);
        log::info!("Service Terminated");
        Ok(())
    }

    /// Stops and ends the poller task, then releases the exporter so queued
    /// snapshots can still be delivered. Used on process exit; the service
    /// cannot be started again afterwards.
    pub async fn shutdown(&self) {
        self.config.set_auto_refresh(false);
        self.shutdown.send_replace(true);
        self.exporter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let task = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::error!("Poller ended abnormally: {}", e);
            }
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn identity(&self) -> Option<HostIdentity> {
        self.identity.borrow().clone()
    }

    /// One on-demand snapshot with the current settings, bypassing the sink.
    pub async fn snapshot(&self) -> Result<Envelope> {
        let identity = match self.identity() {
            Some(identity) => identity,
            None => resolve_identity(self.resolver.clone()).await?,
        };
        let processes = collect(self.source.clone(), &self.config.view()).await?;
        Ok(Envelope::new(identity, processes))
    }
}
