use std::ffi::OsStr;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, ThreadKind, UpdateKind};

use crate::error::{CollectorError, Result};
use crate::models::{CreatedAt, RawProcess};

/// Anything that can list the live process table.
pub trait ProcessSource: Send + Sync {
    fn list_processes(&self) -> Result<Vec<RawProcess>>;
}

/// Process table backed by `sysinfo`.
pub struct SysinfoSource {
    system: Mutex<System>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoSource {
    fn list_processes(&self) -> Result<Vec<RawProcess>> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(CollectorError::Enumeration(
                "process listing is not supported on this platform".to_string(),
            ));
        }

        let mut sys = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        // name, parent and start time are filled on discovery; the exe path is
        // needed because the kernel short name is cut at 15 bytes on Linux
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        );

        let processes: Vec<RawProcess> = sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind() != Some(ThreadKind::Userland))
            .map(|(pid, process)| RawProcess {
                name: executable_name(process.exe(), process.name()),
                created_at: CreatedAt::from_unix_secs(process.start_time()),
                pid: pid.as_u32(),
                ppid: process.parent().map(|p| p.as_u32()).unwrap_or(0),
            })
            .collect();

        // a live host always has at least this process running
        if processes.is_empty() {
            return Err(CollectorError::Enumeration(
                "platform returned an empty process table".to_string(),
            ));
        }

        log::debug!("Enumerated {} processes", processes.len());
        Ok(processes)
    }
}

/// File name of the executable, or the platform's process name when the
/// path is unreadable (kernel threads, other users' processes).
pub fn executable_name(exe: Option<&Path>, name: &OsStr) -> String {
    let raw = exe
        .and_then(Path::file_name)
        .filter(|file| !file.is_empty())
        .unwrap_or(name)
        .to_string_lossy();
    strip_executable_suffix(&raw).to_string()
}

/// Drops a trailing `.exe` (any case), so names compare the same on every platform.
pub fn strip_executable_suffix(name: &str) -> &str {
    const SUFFIX: &str = ".exe";
    let cut = name.len().saturating_sub(SUFFIX.len());
    if name.len() > SUFFIX.len()
        && name.is_char_boundary(cut)
        && name[cut..].eq_ignore_ascii_case(SUFFIX)
    {
        &name[..cut]
    } else {
        name
    }
}
