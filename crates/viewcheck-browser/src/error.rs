//! Browser error types - re-exports the unified ProbeError from viewcheck-core
//!
//! Browser faults use these variants:
//! - Browser(String) - launch, CDP and screenshot failures
//! - Navigation(String) - unreachable target or quiescence timeout
//! - Extraction(String) - the page evaluation returned something unusable
//!
//! Error messages should name the operation that failed.

pub use viewcheck_core::{ProbeError, Result};

pub type BrowserError = ProbeError;
