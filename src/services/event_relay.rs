use crate::adapters::telegram::ChatEvent;
use crate::domain::device::DeviceFilter;
use crate::services::dispatcher::Dispatcher;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::TaskTracker;
use tracing::Instrument;

/// Turns acknowledged chat events into detached fan-outs.
///
/// The caller answers the event source before any delivery happens; outcomes are only
/// visible in logs and metrics.
#[derive(Clone, Debug)]
pub struct EventRelay {
    dispatcher: Arc<Dispatcher>,
    seen_updates: Arc<DashMap<i64, Instant>>,
    dedup_window: Duration,
    tracker: TaskTracker,
}

impl EventRelay {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, dedup_window: Duration, tracker: TaskTracker) -> Self {
        Self { dispatcher, seen_updates: Arc::new(DashMap::new()), dedup_window, tracker }
    }

    /// Schedules the fan-out for `event`. Returns `false` for a redelivered update.
    pub fn relay(&self, event: ChatEvent) -> bool {
        if !self.first_delivery(event.update_id) {
            tracing::info!(update_id = event.update_id, "Duplicate update, fan-out already scheduled");
            return false;
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let span = tracing::info_span!("relay_event", update_id = event.update_id);
        self.tracker.spawn(
            async move {
                match dispatcher.notify(&event.text, &event.sender_name, DeviceFilter::all()).await {
                    Ok(summary) => tracing::debug!(?summary, "Event relayed"),
                    Err(e) => tracing::error!(error = %e, "Failed to relay event"),
                }
            }
            .instrument(span),
        );
        true
    }

    fn first_delivery(&self, update_id: i64) -> bool {
        let window = self.dedup_window;
        self.seen_updates.retain(|_, seen_at| seen_at.elapsed() < window);

        match self.seen_updates.entry(update_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Instant::now());
                true
            }
        }
    }

    #[must_use]
    pub const fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}
