use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Creation time of an observed process.
///
/// Kernel and system processes often carry no usable start time; they are
/// reported as `Unknown` and are what "default processes" means when hiding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAt {
    Known(DateTime<Utc>),
    Unknown,
}

impl CreatedAt {
    /// Maps a platform start time in seconds since the epoch. Zero is the
    /// platform's way of saying "no start time".
    pub fn from_unix_secs(secs: u64) -> Self {
        if secs == 0 {
            return CreatedAt::Unknown;
        }
        i64::try_from(secs)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .map(CreatedAt::Known)
            .unwrap_or(CreatedAt::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CreatedAt::Known(_))
    }
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreatedAt::Known(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            CreatedAt::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for CreatedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CreatedAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "unknown" {
            return Ok(CreatedAt::Unknown);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| CreatedAt::Known(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

/// A process as reported by the platform, before tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProcess {
    /// Executable name, `.exe` suffix already stripped
    pub name: String,
    pub created_at: CreatedAt,
    pub pid: u32,
    /// 0 when the platform reports no parent
    pub ppid: u32,
}

/// One tagged observation of a process, as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub name: String,
    pub created_at: CreatedAt,
    pub pid: u32,
    pub ppid: u32,
    /// Identifies this observation, not the OS process
    #[serde(rename = "uuid")]
    pub id: Uuid,
}

impl ProcessRecord {
    pub fn tag(raw: RawProcess) -> Self {
        Self {
            name: raw.name,
            created_at: raw.created_at,
            pid: raw.pid,
            ppid: raw.ppid,
            id: Uuid::new_v4(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_start_time_is_unknown() {
        assert_eq!(CreatedAt::from_unix_secs(0), CreatedAt::Unknown);
        assert!(CreatedAt::from_unix_secs(1_700_000_000).is_known());
    }

    #[test]
    fn test_created_at_json() {
        let known = CreatedAt::from_unix_secs(1_700_000_000);
        assert_eq!(
            serde_json::to_string(&known).unwrap(),
            "\"2023-11-14T22:13:20Z\""
        );
        assert_eq!(serde_json::to_string(&CreatedAt::Unknown).unwrap(), "\"unknown\"");

        let parsed: CreatedAt = serde_json::from_str("\"2023-11-14T22:13:20Z\"").unwrap();
        assert_eq!(parsed, known);
        assert!(serde_json::from_str::<CreatedAt>("\"yesterday\"").is_err());
    }

    #[test]
    fn test_record_field_names() {
        let record = ProcessRecord::tag(RawProcess {
            name: "shell".to_string(),
            created_at: CreatedAt::Unknown,
            pid: 100,
            ppid: 1,
        });
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();

        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["createdAt", "name", "pid", "ppid", "uuid"]);
        assert_eq!(obj["uuid"], record.id.to_string());
    }
}
