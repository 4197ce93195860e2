//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{CollectorError, Result};
use crate::models::{CreatedAt, HostIdentity, RawProcess};
use crate::services::{IdentityResolver, ProcessSource, Sink};

pub fn alice() -> HostIdentity {
    HostIdentity {
        user_name: "alice".to_string(),
        mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
    }
}

pub fn shell() -> RawProcess {
    RawProcess {
        name: "shell".to_string(),
        created_at: CreatedAt::from_unix_secs(1_700_000_000),
        pid: 100,
        ppid: 1,
    }
}

pub fn kernel() -> RawProcess {
    RawProcess {
        name: "kthreadd".to_string(),
        created_at: CreatedAt::Unknown,
        pid: 2,
        ppid: 0,
    }
}

/// Returns a fixed listing, or fails while `failing` is set.
pub struct FakeSource {
    processes: Vec<RawProcess>,
    pub failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(processes: Vec<RawProcess>) -> Self {
        Self {
            processes,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProcessSource for FakeSource {
    fn list_processes(&self) -> Result<Vec<RawProcess>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollectorError::Enumeration("permission denied".to_string()));
        }
        Ok(self.processes.clone())
    }
}

pub enum FakeResolver {
    Ok(HostIdentity),
    NoUser,
    NoNetwork,
}

impl IdentityResolver for FakeResolver {
    fn resolve_user(&self) -> Result<String> {
        match self {
            FakeResolver::Ok(identity) => Ok(identity.user_name.clone()),
            FakeResolver::NoUser => Err(CollectorError::Identity("no such user".to_string())),
            FakeResolver::NoNetwork => Ok("alice".to_string()),
        }
    }

    fn resolve_mac_address(&self) -> Result<String> {
        match self {
            FakeResolver::Ok(identity) => Ok(identity.mac_address.clone()),
            FakeResolver::NoUser => Ok(String::new()),
            FakeResolver::NoNetwork => Err(CollectorError::Network("no interfaces".to_string())),
        }
    }
}

/// Resolves to `alice()` until `failing` is set.
#[derive(Default)]
pub struct FlakyResolver {
    pub failing: AtomicBool,
}

impl IdentityResolver for FlakyResolver {
    fn resolve_user(&self) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollectorError::Identity("user database unavailable".to_string()));
        }
        Ok(alice().user_name)
    }

    fn resolve_mac_address(&self) -> Result<String> {
        Ok(alice().mac_address)
    }
}

/// Keeps every delivered payload.
#[derive(Clone, Default)]
pub struct RecordingSink {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }

    /// Polls until at least `n` payloads arrived; panics after `timeout`.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> Vec<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.count() < n {
            if tokio::time::Instant::now() >= deadline {
                panic!("expected {} deliveries, got {}", n, self.count());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.payloads()
    }
}

impl Sink for RecordingSink {
    fn deliver(&self, payload: &[u8]) {
        self.payloads.lock().unwrap().push(payload.to_vec());
    }
}
