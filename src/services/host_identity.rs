use std::env;
use std::sync::Arc;
use sysinfo::{Networks, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};

use crate::error::{CollectorError, Result};
use crate::models::HostIdentity;

/// Interface name matched when looking for the primary MAC address.
pub const DEFAULT_INTERFACE: &str = "ethernet";

/// Resolves who is running the collector and on which machine.
pub trait IdentityResolver: Send + Sync {
    fn resolve_user(&self) -> Result<String>;

    fn resolve_mac_address(&self) -> Result<String>;

    fn resolve(&self) -> Result<HostIdentity> {
        Ok(HostIdentity {
            user_name: self.resolve_user()?,
            mac_address: self.resolve_mac_address()?,
        })
    }
}

/// Runs the (blocking) platform lookups off the async runtime.
pub async fn resolve_identity(resolver: Arc<dyn IdentityResolver>) -> Result<HostIdentity> {
    tokio::task::spawn_blocking(move || resolver.resolve())
        .await
        .map_err(|e| CollectorError::Identity(format!("identity lookup task failed: {}", e)))?
}

pub struct SysinfoIdentity {
    interface: String,
}

impl SysinfoIdentity {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

impl Default for SysinfoIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_INTERFACE)
    }
}

impl IdentityResolver for SysinfoIdentity {
    /// Owner of the collector process. When run as a service this is the
    /// service account, not the logged-in user.
    fn resolve_user(&self) -> Result<String> {
        owner_of_current_process()
            .or_else(user_from_env)
            .ok_or_else(|| {
                CollectorError::Identity("no user found for the current process".to_string())
            })
    }

    fn resolve_mac_address(&self) -> Result<String> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(CollectorError::Network(
                "network interfaces are not available on this platform".to_string(),
            ));
        }

        let networks = Networks::new_with_refreshed_list();
        let interfaces = networks
            .list()
            .iter()
            .map(|(name, data)| (name.as_str(), data.mac_address().to_string()));

        let mac = select_mac_address(interfaces, &self.interface);
        if mac.is_empty() {
            log::warn!("No '{}' interface found, MAC address left empty", self.interface);
        }
        Ok(mac)
    }
}

fn owner_of_current_process() -> Option<String> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing().with_user(UpdateKind::Always),
    );
    let uid = sys.process(pid)?.user_id()?;

    let users = Users::new_with_refreshed_list();
    users.get_user_by_id(uid).map(|user| user.name().to_string())
}

fn user_from_env() -> Option<String> {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.is_empty())
}

/// Picks the MAC of the first interface (by name) whose name equals `wanted`,
/// ignoring case. Returns an empty string when nothing matches.
pub fn select_mac_address<'a, I>(interfaces: I, wanted: &str) -> String
where
    I: IntoIterator<Item = (&'a str, String)>,
{
    let mut matching: Vec<(&str, String)> = interfaces
        .into_iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .collect();
    matching.sort_by(|a, b| a.0.cmp(b.0));

    matching
        .into_iter()
        .next()
        .map(|(_, mac)| mac)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_mac_case_insensitive() {
        let interfaces = vec![
            ("lo", "00:00:00:00:00:00".to_string()),
            ("Ethernet", "aa:bb:cc:dd:ee:ff".to_string()),
        ];
        assert_eq!(
            select_mac_address(interfaces, DEFAULT_INTERFACE),
            "aa:bb:cc:dd:ee:ff"
        );
    }

    #[test]
    fn test_select_mac_first_match_wins() {
        let interfaces = vec![
            ("ethernet", "11:11:11:11:11:11".to_string()),
            ("ETHERNET", "22:22:22:22:22:22".to_string()),
        ];
        // "ETHERNET" sorts before "ethernet"
        assert_eq!(
            select_mac_address(interfaces, DEFAULT_INTERFACE),
            "22:22:22:22:22:22"
        );
    }

    #[test]
    fn test_select_mac_no_match_is_empty() {
        let interfaces = vec![
            ("eth0", "aa:bb:cc:dd:ee:ff".to_string()),
            ("wlan0", "11:22:33:44:55:66".to_string()),
        ];
        assert_eq!(select_mac_address(interfaces, DEFAULT_INTERFACE), "");
        assert_eq!(select_mac_address(Vec::new(), DEFAULT_INTERFACE), "");
    }

    #[test]
    fn test_select_mac_custom_interface() {
        let interfaces = vec![("eth0", "aa:bb:cc:dd:ee:ff".to_string())];
        assert_eq!(select_mac_address(interfaces, "ETH0"), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_resolve_current_user() {
        let user = SysinfoIdentity::default().resolve_user().unwrap();
        assert!(!user.is_empty());
    }

    #[test]
    fn test_resolve_mac_never_fails_without_match() {
        assert!(SysinfoIdentity::new("no-such-interface")
            .resolve_mac_address()
            .unwrap()
            .is_empty());
    }
}
