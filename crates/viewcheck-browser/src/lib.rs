//! Browser side of viewcheck
//!
//! This crate drives Chrome through the DevTools Protocol: it launches an
//! isolated browser, records report traffic and console output while the view
//! loads, waits for the network to go quiet, and reads the rendered page in a
//! single script evaluation. All judging happens in `viewcheck-core`.
//!
//! # Example
//!
//! ```no_run
//! use viewcheck_browser::run_probe;
//! use viewcheck_core::ProbeConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = ProbeConfig::default();
//!     config.report_id = "1350035590569136128".to_string();
//!
//!     let report = run_probe(config).await?;
//!     print!("{}", report.render_text());
//!     std::process::exit(if report.passed() { 0 } else { 1 });
//! }
//! ```
//!
//! # Requirements
//!
//! - Chrome or Chromium installed, or fetchable by `headless_chrome`
//!
//! # Architecture
//!
//! - [`browser`]: Browser lifecycle and session management
//! - [`capture`]: CDP notifications into a bounded event log
//! - [`quiescence`]: In-flight request tracking
//! - [`extractor`]: Single-pass page snapshot
//! - [`screenshot`]: Full-page PNG capture
//! - [`verification`]: The end-to-end run

pub mod browser;
pub mod capture;
pub mod error;
pub mod extractor;
pub mod quiescence;
pub mod screenshot;
pub mod verification;

pub use browser::BrowserSession;
pub use capture::{CaptureEvent, EventLog, EventSink};
pub use error::{BrowserError, Result};
pub use extractor::{PageStateExtractor, ScriptRunner};
pub use quiescence::NetworkActivity;
pub use screenshot::{capture_full_page, save_full_page};
pub use verification::{run_probe, wait_for_quiet, Probe};
