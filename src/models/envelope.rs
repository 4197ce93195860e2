use serde::{Deserialize, Serialize};

use crate::models::ProcessRecord;

/// Who and where a snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Empty when no matching interface was found
    #[serde(rename = "macAddress")]
    pub mac_address: String,
}

/// The unit of export: one snapshot of the process table plus host identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "userDetails")]
    pub user_details: HostIdentity,
    pub processes: Vec<ProcessRecord>,
}

impl Envelope {
    pub fn new(user_details: HostIdentity, processes: Vec<ProcessRecord>) -> Self {
        Self {
            user_details,
            processes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order() {
        let envelope = Envelope::new(
            HostIdentity {
                user_name: "alice".to_string(),
                mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            },
            Vec::new(),
        );
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"userDetails":{"userName":"alice","macAddress":"AA:BB:CC:DD:EE:FF"},"processes":[]}"#
        );
    }
}
