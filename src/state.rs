use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{CollectorError, Result};
use crate::services::Lifecycle;

/// Process-wide collector settings, shared between the poller (reader) and the
/// lifecycle controller / HTTP control surface (writers).
#[derive(Debug)]
pub struct RuntimeConfig {
    auto_refresh: AtomicBool,
    hide_default_processes: AtomicBool,
    /// Seconds; a channel so the poller can rearm its timer on change
    refresh_interval_secs: watch::Sender<u64>,
    search: RwLock<String>,
}

/// A consistent copy of the settings, taken once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub auto_refresh: bool,
    pub hide_default_processes: bool,
    /// Seconds
    pub refresh_interval: u64,
    pub search_string: String,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub auto_refresh: Option<bool>,
    pub hide_default_processes: Option<bool>,
    pub refresh_interval: Option<u64>,
    pub search_string: Option<String>,
}

impl RuntimeConfig {
    pub fn new(
        auto_refresh: bool,
        hide_default_processes: bool,
        refresh_interval_secs: u64,
        search: impl Into<String>,
    ) -> Self {
        Self {
            auto_refresh: AtomicBool::new(auto_refresh),
            hide_default_processes: AtomicBool::new(hide_default_processes),
            refresh_interval_secs: watch::Sender::new(refresh_interval_secs.max(1)),
            search: RwLock::new(search.into()),
        }
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh.load(Ordering::SeqCst)
    }

    pub fn set_auto_refresh(&self, enabled: bool) {
        self.auto_refresh.store(enabled, Ordering::SeqCst);
    }

    pub fn hide_default_processes(&self) -> bool {
        self.hide_default_processes.load(Ordering::SeqCst)
    }

    pub fn set_hide_default_processes(&self, hide: bool) {
        self.hide_default_processes.store(hide, Ordering::SeqCst);
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(*self.refresh_interval_secs.borrow())
    }

    /// Notified whenever the refresh interval is set to a new value.
    pub fn watch_refresh_interval(&self) -> watch::Receiver<u64> {
        self.refresh_interval_secs.subscribe()
    }

    pub fn set_refresh_interval(&self, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(CollectorError::Config(
                "refresh interval must be at least one second".to_string(),
            ));
        }
        self.refresh_interval_secs.send_if_modified(|current| {
            let changed = *current != secs;
            *current = secs;
            changed
        });
        Ok(())
    }

    pub fn search(&self) -> String {
        self.search
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_search(&self, search: impl Into<String>) {
        *self.search.write().unwrap_or_else(PoisonError::into_inner) = search.into();
    }

    /// Validates the whole update before touching anything.
    pub fn apply(&self, update: ConfigUpdate) -> Result<ConfigView> {
        if update.refresh_interval == Some(0) {
            return Err(CollectorError::Config(
                "refresh interval must be at least one second".to_string(),
            ));
        }

        if let Some(secs) = update.refresh_interval {
            self.set_refresh_interval(secs)?;
        }
        if let Some(hide) = update.hide_default_processes {
            self.set_hide_default_processes(hide);
        }
        if let Some(search) = update.search_string {
            self.set_search(search);
        }
        if let Some(enabled) = update.auto_refresh {
            self.set_auto_refresh(enabled);
        }

        let view = self.view();
        log::info!(
            "Options updated: [Auto Refresh: {}({} seconds), Hide Defaults: {}, Search: '{}']",
            view.auto_refresh,
            view.refresh_interval,
            view.hide_default_processes,
            view.search_string
        );
        Ok(view)
    }

    pub fn view(&self) -> ConfigView {
        ConfigView {
            auto_refresh: self.auto_refresh(),
            hide_default_processes: self.hide_default_processes(),
            refresh_interval: self.refresh_interval().as_secs(),
            search_string: self.search(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(true, true, 10, "")
    }
}

/// Shared by every HTTP handler.
pub struct AppState {
    pub config: Arc<RuntimeConfig>,
    pub lifecycle: Arc<Lifecycle>,
}

pub fn new_state(config: Arc<RuntimeConfig>, lifecycle: Arc<Lifecycle>) -> AppState {
    AppState { config, lifecycle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_agent_options() {
        let view = RuntimeConfig::default().view();
        assert!(view.auto_refresh);
        assert!(view.hide_default_processes);
        assert_eq!(view.refresh_interval, 10);
        assert_eq!(view.search_string, "");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = RuntimeConfig::default();
        assert!(config.set_refresh_interval(0).is_err());
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_interval_change_notifies_watchers() {
        let config = RuntimeConfig::default();
        let mut rx = config.watch_refresh_interval();

        config.set_refresh_interval(10).unwrap();
        assert!(!rx.has_changed().unwrap());

        config.set_refresh_interval(1).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let config = RuntimeConfig::default();
        let update = ConfigUpdate {
            auto_refresh: Some(false),
            refresh_interval: Some(0),
            ..Default::default()
        };
        assert!(config.apply(update).is_err());
        assert!(config.auto_refresh());

        let view = config
            .apply(ConfigUpdate {
                auto_refresh: Some(false),
                hide_default_processes: Some(false),
                refresh_interval: Some(3),
                search_string: Some("sshd".to_string()),
            })
            .unwrap();
        assert_eq!(
            view,
            ConfigView {
                auto_refresh: false,
                hide_default_processes: false,
                refresh_interval: 3,
                search_string: "sshd".to_string(),
            }
        );
    }

    #[test]
    fn test_update_parses_camel_case() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"hideDefaultProcesses": false, "searchString": "bash"}"#)
                .unwrap();
        assert_eq!(update.hide_default_processes, Some(false));
        assert_eq!(update.search_string.as_deref(), Some("bash"));
        assert!(update.auto_refresh.is_none());
    }
}
