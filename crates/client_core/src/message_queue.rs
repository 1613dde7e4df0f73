use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::message::Message;

/// FIFO of user-facing messages. The head is the message currently shown;
/// it only leaves the queue through an explicit [`remove_at`](Self::remove_at).
pub struct MessageQueue {
    queue: Mutex<VecDeque<Message>>,
    head: watch::Sender<Option<Message>>,
}

impl MessageQueue {
    pub fn new() -> Self {
        let (head, _) = watch::channel(None);
        Self {
            queue: Mutex::new(VecDeque::new()),
            head,
        }
    }

    pub fn push(&self, message: Message) {
        let mut queue = self.queue.lock();
        queue.push_back(message);
        if queue.len() == 1 {
            self.head.send_replace(queue.front().cloned());
        }
    }

    pub fn peek(&self) -> Option<Message> {
        self.queue.lock().front().cloned()
    }

    /// Removes the message at `index`. Out of range indices are ignored.
    pub fn remove_at(&self, index: usize) -> Option<Message> {
        let mut queue = self.queue.lock();
        let removed = queue.remove(index)?;
        if index == 0 {
            self.head.send_replace(queue.front().cloned());
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.queue.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut queue = self.queue.lock();
        queue.clear();
        self.head.send_replace(None);
    }

    pub fn subscribe_head(&self) -> watch::Receiver<Option<Message>> {
        self.head.subscribe()
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/message_queue_tests.rs"]
mod tests;
