use thiserror::Error;

/// Failures surfaced by the snapshot-and-export pipeline.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The platform process listing failed; the result must not be trusted.
    #[error("could not get processes: {0}")]
    Enumeration(String),

    /// The current user could not be resolved.
    #[error("cannot get user details: {0}")]
    Identity(String),

    /// Network interfaces could not be listed.
    #[error("cannot get interfaces: {0}")]
    Network(String),

    /// The envelope could not be encoded.
    #[error("cannot generate JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A runtime configuration change was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The service was shut down and cannot be started again.
    #[error("service has been shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, CollectorError>;
