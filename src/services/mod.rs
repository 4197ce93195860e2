pub mod exporter;
pub mod host_identity;
pub mod lifecycle;
pub mod poller;
pub mod process_lister;
pub mod tagger;

#[cfg(test)]
pub mod testing;

pub use exporter::{Exporter, LogSink, Sink, StdoutSink};
pub use host_identity::{IdentityResolver, SysinfoIdentity};
pub use lifecycle::Lifecycle;
pub use process_lister::{ProcessSource, SysinfoSource};
