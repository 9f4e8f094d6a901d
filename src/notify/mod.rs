//! Fire-and-forget status notifications.
//!
//! An external observer receives two kinds of events over HTTP POST: a
//! run-start event (queue snapshot) and a per-item completion event. The
//! observer is strictly a side channel: an unreachable endpoint, a slow
//! response, or a non-2xx status is logged and swallowed, and processing
//! continues unaffected.

pub mod best_effort;
pub mod events;

pub use best_effort::BestEffort;
pub use events::{CompletionEvent, ItemStatus, StartEvent};

use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::NotifyConfig;
use crate::queue::QueueSnapshot;
use crate::types::RunStamp;

/// Posts status events to the configured endpoints.
pub struct Notifier {
    config: NotifyConfig,
    /// `None` when the HTTP client could not be constructed; every send is
    /// then skipped with a warning already emitted at startup.
    client: Option<Client>,
}

impl Notifier {
    /// Builds a notifier for the given endpoints.
    ///
    /// Client construction failure is downgraded to a warning: notification
    /// delivery is never load-bearing, so a broken TLS environment must not
    /// keep the queue from draining.
    pub fn new(config: &NotifyConfig) -> Notifier {
        let client = match Client::builder().timeout(config.timeout()).build() {
            Ok(client) => Some(client),
            Err(error) => {
                warn!(%error, "HTTP client unavailable; notifications disabled");
                None
            }
        };
        Notifier {
            config: config.clone(),
            client,
        }
    }

    /// Announces the start of a run over a non-empty queue.
    pub fn notify_start(&self, run_id: &RunStamp, snapshot: &QueueSnapshot) -> BestEffort {
        let Some(url) = self.config.start_url.as_deref() else {
            debug!("start endpoint not configured, skipping start event");
            return BestEffort::Skipped;
        };
        self.post(url, &StartEvent::new(run_id, snapshot), "start event")
    }

    /// Reports the outcome of one processed item.
    pub fn notify_completion(&self, event: &CompletionEvent) -> BestEffort {
        let Some(url) = self.config.completion_url.as_deref() else {
            debug!("completion endpoint not configured, skipping completion event");
            return BestEffort::Skipped;
        };
        self.post(url, event, "completion event")
    }

    fn post<T: Serialize>(&self, url: &str, body: &T, what: &str) -> BestEffort {
        let Some(client) = &self.client else {
            return BestEffort::Skipped;
        };
        let result = client
            .post(url)
            .json(body)
            .send()
            .and_then(|response| response.error_for_status());
        BestEffort::from_result(result, what)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot() -> QueueSnapshot {
        let dir = tempdir().unwrap();
        QueueSnapshot::capture(&dir.path().join("none")).unwrap()
    }

    #[test]
    fn unconfigured_endpoints_are_skipped() {
        let notifier = Notifier::new(&NotifyConfig::default());
        let outcome = notifier.notify_start(&RunStamp::from("20240806120000"), &snapshot());
        assert_eq!(outcome, BestEffort::Skipped);
    }

    #[test]
    fn unreachable_endpoint_fails_without_panicking() {
        // Port 1 is reserved and refuses connections immediately.
        let config = NotifyConfig {
            start_url: Some("http://127.0.0.1:1/start".to_string()),
            completion_url: None,
            timeout_secs: 2,
        };
        let notifier = Notifier::new(&config);
        let outcome = notifier.notify_start(&RunStamp::from("20240806120000"), &snapshot());
        assert_eq!(outcome, BestEffort::Failed);
    }
}
