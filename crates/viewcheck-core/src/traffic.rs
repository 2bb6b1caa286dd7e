//! Recording of data-fetch exchanges
//!
//! Requests and responses arrive as separate notifications. A response is
//! joined to the most recently recorded request with the same URL that has no
//! status yet; responses with nothing to join to are dropped.

use tracing::{debug, warn};

use crate::decoder::ResponseDecoder;
use crate::types::Exchange;

/// Accumulates [`Exchange`]s for URLs matching any endpoint pattern
#[derive(Debug, Clone)]
pub struct TrafficRecorder {
    patterns: Vec<String>,
    decoder: ResponseDecoder,
    exchanges: Vec<Exchange>,
}

impl TrafficRecorder {
    pub fn new(patterns: Vec<String>, decoder: ResponseDecoder) -> Self {
        let patterns = patterns.into_iter().filter(|p| !p.is_empty()).collect();
        Self {
            patterns,
            decoder,
            exchanges: Vec::new(),
        }
    }

    /// Whether a URL contains one of the endpoint patterns
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// Record an outgoing request. Returns `false` if the URL is not tracked.
    pub fn on_request(&mut self, url: &str, method: &str, body: Option<String>) -> bool {
        if !self.matches(url) {
            return false;
        }
        debug!("Tracking {} {}", method, url);
        self.exchanges.push(Exchange::new(url, method, body));
        true
    }

    /// Join a response to its pending request and decode the body
    ///
    /// `body` carries the body-read outcome; a read error leaves the summary
    /// absent but still records the status. Returns `false` when the response
    /// was not tracked or had no pending request.
    pub fn on_response(
        &mut self,
        url: &str,
        status: u32,
        body: std::result::Result<String, String>,
    ) -> bool {
        if !self.matches(url) {
            return false;
        }

        let Some(exchange) = self
            .exchanges
            .iter_mut()
            .rev()
            .find(|e| e.url == url && e.status.is_none())
        else {
            debug!("Discarding response for untracked request {}", url);
            return false;
        };

        exchange.status = Some(status);
        exchange.decoded_summary = match body {
            Ok(text) => {
                let summary = self.decoder.decode(&text);
                if summary.is_none() {
                    debug!("No summary for {} ({} bytes)", url, text.len());
                }
                summary
            }
            Err(e) => {
                warn!("Failed to read response body for {}: {}", url, e);
                None
            }
        };
        true
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    /// Finish recording and hand over the exchanges
    pub fn into_exchanges(self) -> Vec<Exchange> {
        self.exchanges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW: &str = "http://127.0.0.1:8085/jmreport/show";

    fn recorder() -> TrafficRecorder {
        TrafficRecorder::new(
            vec!["/jmreport/show".to_string(), "/show?id=".to_string()],
            ResponseDecoder::default(),
        )
    }

    #[test]
    fn test_untracked_urls_ignored() {
        let mut rec = recorder();
        assert!(!rec.on_request("http://127.0.0.1:8085/jmreport/view/1", "GET", None));
        assert!(!rec.on_response("http://127.0.0.1:8085/static/app.js", 200, Ok(String::new())));
        assert!(rec.exchanges().is_empty());
    }

    #[test]
    fn test_response_joins_and_decodes() {
        let mut rec = recorder();
        assert!(rec.on_request(SHOW, "POST", Some("{\"id\":\"1\"}".to_string())));
        assert!(rec.exchanges()[0].status.is_none());

        let body = r#"{"success":true,"result":{"jsonStr":"{\"styles\":{},\"rows\":{\"0\":{}}}"}}"#;
        assert!(rec.on_response(SHOW, 200, Ok(body.to_string())));

        let exchange = &rec.exchanges()[0];
        assert_eq!(exchange.status, Some(200));
        assert_eq!(exchange.request_body.as_deref(), Some("{\"id\":\"1\"}"));
        let summary = exchange.decoded_summary.as_ref().unwrap();
        assert!(summary.has_styles);
        assert_eq!(summary.row_count, 1);
    }

    #[test]
    fn test_joins_most_recent_unresolved() {
        let mut rec = recorder();
        rec.on_request(SHOW, "POST", Some("first".to_string()));
        rec.on_request(SHOW, "POST", Some("second".to_string()));

        rec.on_response(SHOW, 500, Ok("oops".to_string()));
        assert_eq!(rec.exchanges()[0].status, None);
        assert_eq!(rec.exchanges()[1].status, Some(500));

        rec.on_response(SHOW, 200, Ok("{}".to_string()));
        assert_eq!(rec.exchanges()[0].status, Some(200));
    }

    #[test]
    fn test_response_without_request_discarded() {
        let mut rec = recorder();
        assert!(!rec.on_response(SHOW, 200, Ok("{}".to_string())));

        rec.on_request(SHOW, "POST", None);
        rec.on_response(SHOW, 200, Ok("{}".to_string()));
        // Second response has nothing left to join
        assert!(!rec.on_response(SHOW, 200, Ok("{}".to_string())));
        assert_eq!(rec.exchanges().len(), 1);
    }

    #[test]
    fn test_body_failure_does_not_stop_others() {
        let other = "http://127.0.0.1:8085/jmreport/show?id=2";
        let mut rec = recorder();
        rec.on_request(SHOW, "POST", None);
        rec.on_request(other, "GET", None);

        rec.on_response(SHOW, 200, Err("No resource with given identifier".to_string()));
        rec.on_response(other, 200, Ok(r#"{"success":true}"#.to_string()));

        let exchanges = rec.into_exchanges();
        assert_eq!(exchanges[0].status, Some(200));
        assert!(exchanges[0].decoded_summary.is_none());
        assert!(exchanges[1].decoded_summary.as_ref().unwrap().success);
    }

    #[test]
    fn test_every_status_has_a_request() {
        let mut rec = recorder();
        for i in 0..5 {
            let url = format!("{}?page={}", SHOW, i);
            if i % 2 == 0 {
                rec.on_request(&url, "GET", None);
            }
            rec.on_response(&url, 200, Ok("{}".to_string()));
        }
        assert_eq!(rec.exchanges().len(), 3);
        assert!(rec.exchanges().iter().all(Exchange::is_resolved));
    }
}
