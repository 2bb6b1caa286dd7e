//! Full-page screenshot capture using Chrome DevTools Protocol

use crate::browser::BrowserSession;
use crate::error::Result;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use viewcheck_core::ProbeError;

/// Capture the whole page as PNG
pub async fn capture_full_page(session: &BrowserSession) -> Result<Vec<u8>> {
    debug!("Capturing full page screenshot");

    session
        .tab()
        .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        .map_err(|e| ProbeError::Browser(format!("CDP capture failed: {}", e)))
}

/// Capture the whole page and write it to `path`
///
/// # Example
/// ```no_run
/// use viewcheck_browser::browser::BrowserSession;
/// use viewcheck_browser::screenshot::save_full_page;
/// use viewcheck_core::config::BrowserSettings;
/// use std::path::Path;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let session = BrowserSession::launch(&BrowserSettings::default(), Duration::from_secs(30))
///         .await
///         .unwrap();
///     session.navigate("http://127.0.0.1:8085/jmreport/view/1").await.unwrap();
///     let path = save_full_page(&session, Path::new("/tmp/report.png")).await.unwrap();
///     println!("Screenshot saved: {}", path.display());
/// }
/// ```
pub async fn save_full_page(session: &BrowserSession, path: &Path) -> Result<PathBuf> {
    let data = capture_full_page(session).await?;
    write_png(&data, path).await
}

/// Write PNG bytes, creating parent directories as needed
pub async fn write_png(data: &[u8], path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, data).await?;

    info!("Screenshot stored: {} ({} bytes)", path.display(), data.len());
    Ok(path.to_path_buf())
}
