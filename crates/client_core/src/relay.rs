use tokio::sync::watch;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

use crate::data_state::DataState;

/// Conflated single-slot channel holding the latest published state.
///
/// Publishing overwrites whatever has not been read yet, so observers must
/// expect any number of intermediate states to be skipped. Every published
/// state carries a sequence number starting at 1.
pub struct StateRelay<S> {
    slot: watch::Sender<Option<(u64, DataState<S>)>>,
}

impl<S> StateRelay<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    pub fn publish(&self, state: DataState<S>) {
        self.slot.send_modify(|slot| {
            let sequence = slot.as_ref().map_or(1, |(sequence, _)| sequence + 1);
            *slot = Some((sequence, state));
        });
    }

    pub fn latest(&self) -> Option<DataState<S>> {
        self.slot.borrow().as_ref().map(|(_, state)| state.clone())
    }

    /// Sequence number of the latest published state, 0 before the first.
    pub fn sequence(&self) -> u64 {
        self.slot.borrow().as_ref().map_or(0, |(sequence, _)| *sequence)
    }

    /// Stream starting at the latest published state, if any, then yielding
    /// each newer state the observer gets around to reading.
    pub fn observe(&self) -> impl Stream<Item = DataState<S>> + Send + Unpin + 'static {
        self.observe_sequenced().map(|(_, state)| state)
    }

    pub fn observe_sequenced(
        &self,
    ) -> impl Stream<Item = (u64, DataState<S>)> + Send + Unpin + 'static {
        WatchStream::new(self.slot.subscribe()).filter_map(|slot| slot)
    }

    pub fn observer_count(&self) -> usize {
        self.slot.receiver_count()
    }
}

impl<S> Default for StateRelay<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/relay_tests.rs"]
mod tests;
