//! Memory record model and context formatting

pub mod types;

pub use types::{MemoryRecord, format_context};
