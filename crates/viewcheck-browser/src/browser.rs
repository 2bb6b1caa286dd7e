//! Browser lifecycle management using Chrome DevTools Protocol
//!
//! Every session launches its own browser process with a throwaway profile, so
//! cookies and storage never leak between runs. Dropping the session tears the
//! process down.

use crate::error::Result;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use viewcheck_core::config::BrowserSettings;
use viewcheck_core::ProbeError;

use crate::extractor::ScriptRunner;

/// Active browser session with Chrome DevTools Protocol
pub struct BrowserSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
    /// Bound on a single navigation
    timeout: Duration,
}

impl BrowserSession {
    /// Launch a new browser instance
    ///
    /// `timeout` bounds navigation. The idle-browser watchdog is set well past
    /// it so a long settle delay does not kill the process.
    ///
    /// # Example
    /// ```no_run
    /// use viewcheck_browser::browser::BrowserSession;
    /// use viewcheck_core::config::BrowserSettings;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let session = BrowserSession::launch(&BrowserSettings::default(), Duration::from_secs(30))
    ///         .await
    ///         .unwrap();
    ///     session.navigate("http://127.0.0.1:8085/jmreport/view/1").await.unwrap();
    /// }
    /// ```
    pub async fn launch(settings: &BrowserSettings, timeout: Duration) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{}, lang: {})",
            settings.headless, settings.window_width, settings.window_height, settings.lang
        );

        let lang_arg = format!("--lang={}", settings.lang);
        let user_agent_arg: Option<String> = settings
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![OsStr::new(&lang_arg)];
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .sandbox(settings.sandbox)
            .ignore_certificate_errors(settings.ignore_certificate_errors)
            .window_size(Some((settings.window_width, settings.window_height)))
            .idle_browser_timeout(timeout * 4)
            .args(args)
            .build()
            .map_err(|e| ProbeError::Browser(format!("Invalid launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| ProbeError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ProbeError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(timeout);

        info!("Browser launched successfully");

        Ok(Self {
            browser,
            tab,
            timeout,
        })
    }

    /// Navigate to a URL and wait for the load event
    ///
    /// Any failure here is a navigation error: the run cannot reach a verdict.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {} (timeout: {:?})", url, self.timeout);

        self.tab
            .navigate_to(url)
            .map_err(|e| ProbeError::Navigation(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| ProbeError::Navigation(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    /// Execute JavaScript in the page context
    ///
    /// Only primitive results carry a value; scripts returning structures
    /// should `JSON.stringify` them.
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating {} byte script", script.len());

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| ProbeError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Close the browser session
    pub async fn close(self) -> Result<()> {
        info!("Closing browser session");
        // Browser process and its temporary profile go away on drop
        Ok(())
    }
}

#[async_trait]
impl ScriptRunner for BrowserSession {
    async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        BrowserSession::evaluate_script(self, script).await
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        debug!("BrowserSession dropped, browser will be cleaned up");
    }
}
