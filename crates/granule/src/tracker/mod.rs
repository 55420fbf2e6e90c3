//! Read and write dependency tracking over a `serde_json::Value` tree.
//!
//! - [`track_read`] runs a pure read function against a [`TrackedRead`] view
//!   and reports every leaf path (plus `<array>.length`) it dereferenced.
//! - [`track_write`] runs a mutation against a [`Draft`] of the same tree,
//!   applies it in place, and reports every path it wrote.

mod read;
mod write;

pub use read::{track_read, ReadTracker, TrackedRead};
pub use write::{track_write, Draft, MAX_ARRAY_PADDING};
