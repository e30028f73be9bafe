//! Core export logic.
//!
//! This module contains:
//! - Exporter: the depth-first traversal engine
//! - PathDeriver: destination paths for every node
//! - Report: failure taxonomy and run summary
//! - Retry: backoff policy for transient catalog failures

pub mod exporter;
pub mod paths;
pub mod report;
pub mod retry;

// Re-export commonly used types
pub use exporter::{Exporter, Visit};
pub use paths::PathDeriver;
pub use report::{ExportError, ExportReport};
pub use retry::{retry_transient, RetryPolicy};
