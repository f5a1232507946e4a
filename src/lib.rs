//! Append-only log buffer that broadcasts writes to attached sinks and replays
//! the backlog to consumers that attach late.

pub mod buffer;
pub mod config;
pub mod error;
pub mod formatter;
pub mod logging;
pub mod signal;
pub mod sink;

pub use buffer::{Attachment, LogBuffer, Registration};
pub use error::{LogBufferError, LogBufferResult};
pub use sink::{Sink, WriterSink};
