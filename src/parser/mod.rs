//! HTTP parser module.
//!
//! This module provides the incremental request parser used by the server.

mod method;
mod version;
mod error;
mod incremental;
mod target;
mod tests;

// Re-export public items
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;
pub use incremental::{ParseLimits, RequestParser};

pub(crate) use target::split_target;
