//! Log processing for kubenav
//!
//! This crate provides the line buffer behind the log viewer, the
//! case-insensitive search filter, text layout helpers and the streaming
//! task manager.

mod buffer;
mod filter;
mod stream;
mod wrap;

pub use buffer::LogBuffer;
pub use filter::LineFilter;
pub use stream::{LogStreamManager, StreamEvent, StreamEventKind};
pub use wrap::{truncate, word_wrap};
