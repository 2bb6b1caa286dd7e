//! Network quiescence tracking
//!
//! The network counts as quiet once nothing has been in flight for a full
//! quiet window. Times are stamped where the CDP event was observed, not where
//! it was drained.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// In-flight request bookkeeping
#[derive(Debug, Clone)]
pub struct NetworkActivity {
    inflight: HashMap<String, String>,
    /// Request id to URL for everything seen, so late failures can be named
    seen: HashMap<String, String>,
    last_activity: Instant,
}

impl NetworkActivity {
    pub fn new(now: Instant) -> Self {
        Self {
            inflight: HashMap::new(),
            seen: HashMap::new(),
            last_activity: now,
        }
    }

    pub fn started(&mut self, id: &str, url: &str, at: Instant) {
        self.inflight.insert(id.to_string(), url.to_string());
        self.seen.insert(id.to_string(), url.to_string());
        self.touch(at);
    }

    /// Mark a request done (finished or failed); returns its URL if known
    pub fn finished(&mut self, id: &str, at: Instant) -> Option<String> {
        self.inflight.remove(id);
        self.touch(at);
        self.seen.get(id).cloned()
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// Nothing in flight and no activity for `window`
    pub fn is_quiet(&self, now: Instant, window: Duration) -> bool {
        self.inflight.is_empty() && now.saturating_duration_since(self.last_activity) >= window
    }

    fn touch(&mut self, at: Instant) {
        // Events can be stamped out of order across callbacks
        if at > self.last_activity {
            self.last_activity = at;
        }
    }
}
