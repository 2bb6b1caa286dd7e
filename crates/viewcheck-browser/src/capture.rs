//! CDP event capture
//!
//! Chrome delivers network and console notifications on its own threads, in
//! any interleaving. Callbacks never touch recorder state: they turn each
//! notification into a [`CaptureEvent`] and push it onto a bounded channel.
//! [`EventLog`] is the single consumer and the only writer of the recorders.

use headless_chrome::protocol::cdp::types::Event;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::protocol::cdp::Runtime::RemoteObject;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, warn};
use viewcheck_core::{ConsoleEntry, ConsoleRecorder, Exchange, ProbeError, Severity, TrafficRecorder};

use crate::browser::BrowserSession;
use crate::error::Result;
use crate::quiescence::NetworkActivity;

/// Name under which the response handler is registered on the tab
const RESPONSE_HANDLER: &str = "viewcheck-exchanges";

/// One observed browser notification
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    RequestStarted {
        id: String,
        url: String,
        method: String,
        body: Option<String>,
        at: Instant,
    },
    RequestFinished {
        id: String,
        at: Instant,
    },
    RequestFailed {
        id: String,
        error_text: String,
        at: Instant,
    },
    /// Response for a tracked endpoint, with the body-read outcome
    Response {
        url: String,
        status: u32,
        body: std::result::Result<String, String>,
    },
    Console {
        severity: Severity,
        text: String,
    },
}

/// Sending half handed to CDP callbacks
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<CaptureEvent>,
    dropped: Arc<AtomicUsize>,
}

impl EventSink {
    /// Push without blocking. A full or closed channel drops the event.
    pub fn push(&self, event: CaptureEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if n == 1 || n % 100 == 0 {
                    warn!("Capture channel full, {} events dropped so far", n);
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded capture channel
pub fn channel(capacity: usize) -> (EventSink, mpsc::Receiver<CaptureEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventSink {
            tx,
            dropped: Arc::new(AtomicUsize::new(0)),
        },
        rx,
    )
}

/// Single consumer that folds capture events into the recorders
#[derive(Debug)]
pub struct EventLog {
    rx: mpsc::Receiver<CaptureEvent>,
    traffic: TrafficRecorder,
    console: ConsoleRecorder,
    activity: NetworkActivity,
}

impl EventLog {
    pub fn new(rx: mpsc::Receiver<CaptureEvent>, traffic: TrafficRecorder) -> Self {
        Self {
            rx,
            traffic,
            console: ConsoleRecorder::new(),
            activity: NetworkActivity::new(Instant::now()),
        }
    }

    /// Apply everything currently queued; returns how many events were applied
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.apply(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    pub fn apply(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::RequestStarted {
                id,
                url,
                method,
                body,
                at,
            } => {
                self.activity.started(&id, &url, at);
                self.traffic.on_request(&url, &method, body);
            }
            CaptureEvent::RequestFinished { id, at } => {
                self.activity.finished(&id, at);
            }
            CaptureEvent::RequestFailed { id, error_text, at } => {
                let url = self
                    .activity
                    .finished(&id, at)
                    .unwrap_or_else(|| format!("<request {}>", id));
                self.console.record_failed_request(&url, &error_text);
            }
            CaptureEvent::Response { url, status, body } => {
                self.traffic.on_response(&url, status, body);
            }
            CaptureEvent::Console { severity, text } => {
                self.console.record(severity, text);
            }
        }
    }

    pub fn activity(&self) -> &NetworkActivity {
        &self.activity
    }

    pub fn exchanges(&self) -> &[Exchange] {
        self.traffic.exchanges()
    }

    pub fn console_entries(&self) -> &[ConsoleEntry] {
        self.console.entries()
    }

    /// Drain what is left and hand over the recorded evidence
    pub fn finish(mut self) -> (Vec<Exchange>, Vec<ConsoleEntry>) {
        self.rx.close();
        self.drain();
        (self.traffic.into_exchanges(), self.console.into_entries())
    }
}

/// Wire CDP notifications on the session's tab into `sink`
///
/// Response bodies are fetched only for URLs matching `patterns`. Must be
/// called before navigation.
pub fn attach(session: &BrowserSession, patterns: &[String], sink: EventSink) -> Result<()> {
    let tab = session.tab();

    tab.enable_runtime()
        .map_err(|e| ProbeError::Browser(format!("Failed to enable Runtime domain: {}", e)))?;
    tab.enable_log()
        .map_err(|e| ProbeError::Browser(format!("Failed to enable Log domain: {}", e)))?;

    let patterns: Vec<String> = patterns.iter().filter(|p| !p.is_empty()).cloned().collect();
    let response_sink = sink.clone();
    // Registering a response handler also enables the Network domain
    tab.register_response_handling(
        RESPONSE_HANDLER,
        Box::new(
            move |params: ResponseReceivedEventParams,
                  fetch_body: &dyn Fn() -> anyhow::Result<GetResponseBodyReturnObject>| {
                let url = params.response.url.clone();
                if !patterns.iter().any(|p| url.contains(p.as_str())) {
                    return;
                }
                let body = match fetch_body() {
                    Ok(obj) if obj.base_64_encoded => Err("binary body".to_string()),
                    Ok(obj) => Ok(obj.body),
                    Err(e) => Err(e.to_string()),
                };
                response_sink.push(CaptureEvent::Response {
                    url,
                    status: params.response.status as u32,
                    body,
                });
            },
        ),
    )
    .map_err(|e| ProbeError::Browser(format!("Failed to register response handler: {}", e)))?;

    tab.add_event_listener(Arc::new(move |event: &Event| {
        if let Some(captured) = translate(event) {
            sink.push(captured);
        }
    }))
    .map_err(|e| ProbeError::Browser(format!("Failed to add event listener: {}", e)))?;

    debug!("CDP capture attached");
    Ok(())
}

/// Map a raw CDP event onto a capture event, if it is one we record
fn translate(event: &Event) -> Option<CaptureEvent> {
    let at = Instant::now();
    match event {
        Event::NetworkRequestWillBeSent(ev) => Some(CaptureEvent::RequestStarted {
            id: ev.params.request_id.clone(),
            url: ev.params.request.url.clone(),
            method: ev.params.request.method.clone(),
            body: ev.params.request.post_data.clone(),
            at,
        }),
        Event::NetworkLoadingFinished(ev) => Some(CaptureEvent::RequestFinished {
            id: ev.params.request_id.clone(),
            at,
        }),
        Event::NetworkLoadingFailed(ev) => Some(CaptureEvent::RequestFailed {
            id: ev.params.request_id.clone(),
            error_text: ev.params.error_text.clone(),
            at,
        }),
        Event::RuntimeConsoleAPICalled(ev) => Some(CaptureEvent::Console {
            severity: severity_of(&format!("{:?}", ev.params.Type)),
            text: console_text(&ev.params.args),
        }),
        Event::LogEntryAdded(ev) => Some(CaptureEvent::Console {
            severity: severity_of(&format!("{:?}", ev.params.entry.level)),
            text: ev.params.entry.text.clone(),
        }),
        _ => None,
    }
}

/// Severity from a CDP level name (`Error`, `Warning`, `Log`, `Verbose`, ...)
pub fn severity_of(level: &str) -> Severity {
    level.parse().unwrap_or_default()
}

/// Join console arguments the way the devtools console prints them
fn console_text(args: &[RemoteObject]) -> String {
    args.iter()
        .map(|arg| {
            arg_text(
                arg.value.as_ref(),
                arg.description.as_deref(),
                arg.unserializable_value.as_deref(),
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strings print bare, other values as JSON, objects by description
fn arg_text(
    value: Option<&serde_json::Value>,
    description: Option<&str>,
    unserializable: Option<&str>,
) -> String {
    match (value, description) {
        (Some(serde_json::Value::String(s)), _) => s.clone(),
        (Some(v), _) => v.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => unserializable.unwrap_or_default().to_string(),
    }
}
