pub mod envelope;
pub mod process;

pub use envelope::{Envelope, HostIdentity};
pub use process::{CreatedAt, ProcessRecord, RawProcess};
