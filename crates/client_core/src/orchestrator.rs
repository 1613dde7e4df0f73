//! Per-consumer control loop tying the tracker, relay and message queue
//! together.
//!
//! Jobs run as independent tasks and hand their outcome to a single control
//! loop over an unbounded channel. The loop is the only writer of the relay
//! and the message queue, and it releases the job's dedup key after both
//! have been updated.

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_stream::Stream;
use tracing::{debug, error};

use crate::{
    constants::ERROR_UNKNOWN,
    data_state::DataState,
    event::{SharedEvent, StateEvent},
    message::Message,
    message_queue::MessageQueue,
    relay::StateRelay,
    tracker::{ActiveEvent, EventTracker},
};

struct Delivery<S> {
    outcome: DataState<S>,
    active: ActiveEvent,
}

pub struct Orchestrator<S> {
    tracker: Arc<EventTracker>,
    relay: Arc<StateRelay<S>>,
    messages: Arc<MessageQueue>,
    deliveries: mpsc::UnboundedSender<Delivery<S>>,
    control_loop: JoinHandle<()>,
}

impl<S> Orchestrator<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Spawns the control loop, so this must be called inside a tokio runtime.
    pub fn new() -> Self {
        let tracker = Arc::new(EventTracker::new());
        let relay = Arc::new(StateRelay::new());
        let messages = Arc::new(MessageQueue::new());
        let (deliveries, rx) = mpsc::unbounded_channel();
        let control_loop = tokio::spawn(run_control_loop(
            rx,
            Arc::clone(&relay),
            Arc::clone(&messages),
        ));
        Self {
            tracker,
            relay,
            messages,
            deliveries,
            control_loop,
        }
    }

    /// Dispatches `job` for `event`. Returns `false` without running
    /// anything when a request with the same dedup key is still active.
    pub fn launch_job<F>(&self, event: SharedEvent, job: F) -> bool
    where
        F: Future<Output = DataState<S>> + Send + 'static,
    {
        let kind = event.kind();
        let Some(active) = self.tracker.begin(Arc::clone(&event)) else {
            debug!(kind, "duplicate request suppressed");
            return false;
        };
        debug!(kind, active = self.tracker.active_count(), "request dispatched");

        let cancel = active.cancel_token();
        let deliveries = self.deliveries.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(kind, "request cancelled");
                    return;
                }
                outcome = AssertUnwindSafe(job).catch_unwind() => match outcome {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!(kind, "request job panicked");
                        DataState::failure(ERROR_UNKNOWN, event)
                    }
                },
            };
            if deliveries.send(Delivery { outcome, active }).is_err() {
                debug!(kind, "control loop stopped, outcome dropped");
            }
        });
        true
    }

    /// Cancels all in-flight work. New requests may be dispatched right away.
    pub fn reset(&self) {
        self.tracker.cancel_all();
    }

    pub fn is_job_active(&self, event: &dyn StateEvent) -> bool {
        self.tracker.is_active(event)
    }

    pub fn active_count(&self) -> usize {
        self.tracker.active_count()
    }

    pub fn subscribe_active_jobs(&self) -> watch::Receiver<usize> {
        self.tracker.subscribe_active_count()
    }

    /// Waits until no request is active.
    pub async fn wait_idle(&self) {
        let mut active = self.tracker.subscribe_active_count();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = active.wait_for(|count| *count == 0).await;
    }

    pub fn observe(&self) -> impl Stream<Item = DataState<S>> + Send + Unpin + 'static {
        self.relay.observe()
    }

    pub fn observe_sequenced(
        &self,
    ) -> impl Stream<Item = (u64, DataState<S>)> + Send + Unpin + 'static {
        self.relay.observe_sequenced()
    }

    pub fn latest(&self) -> Option<DataState<S>> {
        self.relay.latest()
    }

    /// Sequence number of the latest relayed outcome.
    pub fn relay_sequence(&self) -> u64 {
        self.relay.sequence()
    }

    pub fn head_message(&self) -> Option<Message> {
        self.messages.peek()
    }

    pub fn subscribe_head_message(&self) -> watch::Receiver<Option<Message>> {
        self.messages.subscribe_head()
    }

    /// Called by the presentation layer once the message at `index` has been
    /// dealt with.
    pub fn acknowledge(&self, index: usize) -> Option<Message> {
        self.messages.remove_at(index)
    }

    /// Queues a message that is not tied to a dispatched request.
    pub fn enqueue_message(&self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &MessageQueue {
        &self.messages
    }
}

impl<S> Default for Orchestrator<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Drop for Orchestrator<S> {
    fn drop(&mut self) {
        self.tracker.cancel_all();
        self.control_loop.abort();
    }
}

async fn run_control_loop<S>(
    mut deliveries: mpsc::UnboundedReceiver<Delivery<S>>,
    relay: Arc<StateRelay<S>>,
    messages: Arc<MessageQueue>,
) where
    S: Clone + Send + Sync + 'static,
{
    while let Some(Delivery { outcome, active }) = deliveries.recv().await {
        let delivered = active.deliver_if_active(|| {
            if let Some(message) = outcome.message() {
                messages.push(message.clone());
            }
            relay.publish(outcome);
        });
        if !delivered {
            debug!(kind = active.key().kind, "discarding outcome of cancelled request");
        }
        drop(active);
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
