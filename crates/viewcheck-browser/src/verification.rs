//! One verification run against a report view
//!
//! Launch, capture, navigate, wait for the network to go quiet, let the
//! renderer settle, snapshot, then judge. Capture stays attached until the
//! snapshot is taken, so late responses still land in the report.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};
use viewcheck_core::fail_open::fail_open;
use viewcheck_core::{
    ProbeConfig, ProbeError, ProbeReport, ResponseDecoder, TrafficRecorder, VerdictEngine,
};

use crate::browser::BrowserSession;
use crate::capture::{self, EventLog};
use crate::error::Result;
use crate::extractor::PageStateExtractor;
use crate::screenshot::save_full_page;

/// How often the quiescence loop drains and re-checks
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A configured, reusable probe
#[derive(Debug, Clone)]
pub struct Probe {
    config: ProbeConfig,
    extractor: PageStateExtractor,
    engine: VerdictEngine,
}

impl Probe {
    /// Validate `config` and compile everything a run needs
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        let extractor = PageStateExtractor::new(&config.extraction)?;
        let engine = VerdictEngine::new(config.verdict.clone());
        Ok(Self {
            config,
            extractor,
            engine,
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run once in a fresh browser
    ///
    /// Errors mean no verdict could be reached (browser would not start, page
    /// never loaded or went quiet, snapshot unreadable). A failing verdict is
    /// still `Ok`.
    pub async fn run(&self) -> Result<ProbeReport> {
        let started_at = Utc::now();
        let target = self.config.target_url();
        let timing = &self.config.timing;
        let nav_timeout = Duration::from_secs(timing.navigation_timeout_secs);
        info!("Probing {}", target);

        let session = BrowserSession::launch(&self.config.browser, nav_timeout).await?;

        let (sink, rx) = capture::channel(self.config.event_log_capacity);
        let traffic = TrafficRecorder::new(
            self.config.endpoint_patterns.clone(),
            ResponseDecoder::new(self.config.decoder.clone()),
        );
        let mut log = EventLog::new(rx, traffic);
        capture::attach(&session, &self.config.endpoint_patterns, sink.clone())?;

        let deadline = Instant::now() + nav_timeout;
        session.navigate(&target).await?;
        wait_for_quiet(
            &mut log,
            Duration::from_millis(timing.quiet_window_ms),
            deadline,
        )
        .await?;

        debug!("Settling for {} ms", timing.settle_delay_ms);
        tokio::time::sleep(Duration::from_millis(timing.settle_delay_ms)).await;
        log.drain();

        let page_state = self.extractor.snapshot(&session).await?;

        if self.config.screenshot.enabled {
            let path: PathBuf = self.config.screenshot.path.clone();
            fail_open("Screenshot", || save_full_page(&session, &path)).await;
        }

        session.close().await?;

        if sink.dropped() > 0 {
            warn!(
                "{} capture events dropped; raise event_log_capacity for complete evidence",
                sink.dropped()
            );
        }
        let (exchanges, console_entries) = log.finish();
        info!(
            "Captured {} exchanges, {} console entries",
            exchanges.len(),
            console_entries.len()
        );

        let decision = self
            .engine
            .evaluate(&page_state, &exchanges, &console_entries);

        Ok(ProbeReport::new(
            target,
            started_at,
            exchanges,
            &console_entries,
            self.config.verdict.max_reported_errors,
            page_state,
            decision,
        ))
    }
}

/// Validate, run once, report
pub async fn run_probe(config: ProbeConfig) -> Result<ProbeReport> {
    Probe::new(config)?.run().await
}

/// Drain `log` until nothing has been in flight for `window`
///
/// Passing `deadline` first is a navigation error.
pub async fn wait_for_quiet(
    log: &mut EventLog,
    window: Duration,
    deadline: Instant,
) -> Result<()> {
    loop {
        log.drain();
        let now = Instant::now();
        if log.activity().is_quiet(now, window) {
            debug!("Network quiet");
            return Ok(());
        }
        if now >= deadline {
            return Err(ProbeError::Navigation(format!(
                "network did not go quiet before the timeout ({} requests in flight)",
                log.activity().inflight()
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
