pub mod cli;

pub use cli::{CommandArgs, SinkKind};
