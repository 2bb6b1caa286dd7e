//! # viewcheck-core
//!
//! Browser-free half of the report view probe.
//!
//! A run loads a server-rendered report page, records the data-fetch traffic and
//! console output it produces, reads the rendered DOM once, and turns that noisy
//! evidence into a single pass/fail verdict. Everything here works on plain
//! values so it can be exercised without a browser:
//!
//! - [`decoder`]: summarizes double-encoded data-fetch responses
//! - [`traffic`]: joins requests and responses into exchanges
//! - [`console`]: console and failed-request log
//! - [`page_state`]: derives the page snapshot from a raw DOM reading
//! - [`verdict`]: ordered rule table producing the verdict
//! - [`report`]: diagnostic output

mod error;
mod types;

pub mod config;
pub mod console;
pub mod decoder;
pub mod fail_open;
pub mod page_state;
pub mod report;
pub mod traffic;
pub mod verdict;

pub use config::ProbeConfig;
pub use console::ConsoleRecorder;
pub use decoder::ResponseDecoder;
pub use error::{ProbeError, Result};
pub use page_state::{PageStateRules, RawCellSet, RawSnapshot};
pub use report::ProbeReport;
pub use traffic::TrafficRecorder;
pub use types::*;
pub use verdict::{Decision, Signals, VerdictEngine};
