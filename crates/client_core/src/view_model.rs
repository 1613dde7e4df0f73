//! Presentation-facing wrapper around an [`Orchestrator`].
//!
//! Every relayed payload is folded into a view state by an applier task.
//! Because the relay is conflated, the applier may skip payloads that were
//! superseded before it got to read them.

use std::{future::Future, sync::Arc};

use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::StreamExt;
use tracing::trace;

use crate::{
    data_state::DataState, event::SharedEvent, message::Message, orchestrator::Orchestrator,
};

/// Feature specific reaction to relayed payloads.
pub trait ViewStateHandler: Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;
    type ViewState: Clone + Default + Send + Sync + 'static;

    fn handle_new_data(&self, view_state: &mut Self::ViewState, data: Self::Data);
}

pub struct ViewModel<H: ViewStateHandler> {
    orchestrator: Orchestrator<H::Data>,
    view_state: Arc<watch::Sender<H::ViewState>>,
    applied: watch::Receiver<u64>,
    applier: JoinHandle<()>,
}

impl<H: ViewStateHandler> ViewModel<H> {
    pub fn new(handler: H) -> Self {
        let orchestrator = Orchestrator::new();
        let (view_state, _) = watch::channel(H::ViewState::default());
        let view_state = Arc::new(view_state);
        let (applied_tx, applied) = watch::channel(0);

        let mut states = orchestrator.observe_sequenced();
        let target = Arc::clone(&view_state);
        let applier = tokio::spawn(async move {
            while let Some((sequence, state)) = states.next().await {
                let kind = state.event().kind();
                if let Some(data) = state.into_payload() {
                    trace!(kind, sequence, "applying relayed data");
                    target.send_modify(|view_state| handler.handle_new_data(view_state, data));
                }
                applied_tx.send_replace(sequence);
            }
        });

        Self {
            orchestrator,
            view_state,
            applied,
            applier,
        }
    }

    pub fn launch_job<F>(&self, event: SharedEvent, job: F) -> bool
    where
        F: Future<Output = DataState<H::Data>> + Send + 'static,
    {
        self.orchestrator.launch_job(event, job)
    }

    pub fn view_state(&self) -> H::ViewState {
        self.view_state.borrow().clone()
    }

    pub fn subscribe_view_state(&self) -> watch::Receiver<H::ViewState> {
        self.view_state.subscribe()
    }

    pub fn update_view_state(&self, update: impl FnOnce(&mut H::ViewState)) {
        self.view_state.send_modify(update);
    }

    pub fn cancel_active_jobs(&self) {
        self.orchestrator.reset();
    }

    pub fn orchestrator(&self) -> &Orchestrator<H::Data> {
        &self.orchestrator
    }

    pub fn active_count(&self) -> usize {
        self.orchestrator.active_count()
    }

    pub fn head_message(&self) -> Option<Message> {
        self.orchestrator.head_message()
    }

    pub fn acknowledge(&self, index: usize) -> Option<Message> {
        self.orchestrator.acknowledge(index)
    }

    /// Waits until no job is active and the view state reflects the latest
    /// relayed outcome.
    pub async fn settle(&self) {
        self.orchestrator.wait_idle().await;
        let target = self.orchestrator.relay_sequence();
        let mut applied = self.applied.clone();
        // The applier only stops when the view model is dropped.
        let _ = applied.wait_for(|sequence| *sequence >= target).await;
    }
}

impl<H: ViewStateHandler> Drop for ViewModel<H> {
    fn drop(&mut self) {
        self.applier.abort();
    }
}

#[cfg(test)]
#[path = "tests/view_model_tests.rs"]
mod tests;
