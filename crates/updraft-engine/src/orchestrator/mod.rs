//! Concurrent download orchestrator.
//!
//! Issues fetches for submitted units and reports exactly one outcome per
//! unit through an unbounded completion channel. Units submitted together
//! may complete in any order; callers that need sequencing submit the next
//! unit only after observing the prior completion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use updraft_core::{DownloadUnit, Fetcher, UpdateError};

/// Completion notification for one submitted unit.
///
/// Carries the unit back so the consumer can match the outcome without
/// keeping its own copy alive.
#[derive(Debug)]
pub struct DownloadOutcome {
    /// The unit this outcome resolves.
    pub unit: DownloadUnit,
    /// Success, or the typed transport error. Cancellation surfaces as
    /// [`UpdateError::Cancelled`].
    pub result: Result<(), UpdateError>,
}

/// Executes fetches concurrently and funnels completions into one channel.
///
/// Every in-flight unit is tracked by id with its cancellation token; the
/// entry is released before the outcome is sent, so the transport handle
/// never outlives the notification.
pub struct DownloadOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    outcome_tx: mpsc::UnboundedSender<DownloadOutcome>,
    in_flight: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl DownloadOrchestrator {
    /// Create an orchestrator together with the receiving end of its
    /// completion channel.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> (Self, mpsc::UnboundedReceiver<DownloadOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        (
            Self {
                fetcher,
                outcome_tx,
                in_flight: Arc::new(Mutex::new(HashMap::new())),
            },
            outcome_rx,
        )
    }

    /// Begin an asynchronous fetch for `unit`.
    ///
    /// Fire-and-forget: the result arrives later as a [`DownloadOutcome`],
    /// exactly once per submission.
    pub async fn submit(&self, unit: DownloadUnit) {
        let token = CancellationToken::new();
        self.in_flight
            .lock()
            .await
            .insert(unit.custom_id.clone(), token.clone());

        let fetcher = Arc::clone(&self.fetcher);
        let in_flight = Arc::clone(&self.in_flight);
        let outcome_tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            tracing::debug!(id = %unit.custom_id, url = %unit.source_url, "Fetch started");

            let result = tokio::select! {
                biased;

                () = token.cancelled() => Err(UpdateError::Cancelled),

                result = fetcher.fetch(&unit.source_url, &unit.storage_path) => result,
            };

            // Release the per-unit handle before notifying.
            in_flight.lock().await.remove(&unit.custom_id);

            if let Err(error) = &result {
                tracing::debug!(id = %unit.custom_id, %error, "Fetch resolved with error");
            }

            // A closed channel means the consumer shut down; the outcome is
            // dropped with it.
            let _ = outcome_tx.send(DownloadOutcome { unit, result });
        });
    }

    /// Number of units currently in flight.
    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Cancel every in-flight fetch.
    ///
    /// Each cancelled unit still resolves exactly once, with
    /// [`UpdateError::Cancelled`] as its outcome.
    pub async fn cancel_all(&self) {
        let in_flight = self.in_flight.lock().await;
        for token in in_flight.values() {
            token.cancel();
        }
        tracing::info!(count = in_flight.len(), "Cancelled in-flight fetches");
    }
}
