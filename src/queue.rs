//! Capacity-bounded queue for messages that are sent with a delay.

use heapless::Vec;

use crate::Error;
use crate::message::Message;

/// Number of messages that can be pending at any time.
pub const QUEUE_CAPACITY: usize = 8;

/// Messages pending delivery, ordered by their scheduled time.
///
/// Messages that share a scheduled time keep their insertion order. The
/// queue owns its messages exclusively until they are popped.
#[derive(Debug, Default)]
pub struct SendQueue {
    entries: Vec<Message, QUEUE_CAPACITY>,
}

impl SendQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert a message, keyed by its scheduled time.
    ///
    /// Fails with [`Error::QueueFull`] when no slot is free; the message
    /// is dropped in that case and the caller must treat the send as
    /// skipped.
    pub fn schedule(&mut self, message: Message) -> Result<(), Error> {
        let index = self
            .entries
            .iter()
            .position(|pending| pending.scheduled_time() > message.scheduled_time())
            .unwrap_or(self.entries.len());

        self.entries.insert(index, message).map_err(|_| Error::QueueFull)
    }

    /// Remove and return the earliest message that is due at `now_ms`.
    ///
    /// Returns `None` once no pending message is due. Calling repeatedly
    /// with advancing time releases messages in non-decreasing scheduled
    /// time order, each exactly once.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Message> {
        match self.entries.first() {
            Some(first) if first.scheduled_time() <= now_ms => Some(self.entries.remove(0)),
            _ => None,
        }
    }

    /// Remove and drop all pending messages.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no messages are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::header::{ControlMessageType, Header, SpecificationRevision};
    use crate::{DataRole, PowerRole};

    fn message_at(id: u8, scheduled_time: u64) -> Message {
        let template = Header::new_template(DataRole::Ufp, PowerRole::Source, SpecificationRevision::R2_0);
        let mut message = Message::control(template, id, ControlMessageType::Accept);
        message.scheduled_time = scheduled_time;
        message
    }

    #[test]
    fn pops_in_scheduled_time_order() {
        let mut queue = SendQueue::new();

        queue.schedule(message_at(0, 30)).unwrap();
        queue.schedule(message_at(1, 10)).unwrap();
        queue.schedule(message_at(2, 20)).unwrap();

        assert_eq!(queue.pop_due(5), None);
        assert_eq!(queue.pop_due(10).unwrap().header.message_id(), 1);
        assert_eq!(queue.pop_due(10), None);

        // Advancing time releases the rest, exactly once each.
        assert_eq!(queue.pop_due(100).unwrap().header.message_id(), 2);
        assert_eq!(queue.pop_due(100).unwrap().header.message_id(), 0);
        assert_eq!(queue.pop_due(100), None);
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut queue = SendQueue::new();

        queue.schedule(message_at(0, 15)).unwrap();
        queue.schedule(message_at(1, 15)).unwrap();
        queue.schedule(message_at(2, 0)).unwrap();

        assert_eq!(queue.pop_due(15).unwrap().header.message_id(), 2);
        assert_eq!(queue.pop_due(15).unwrap().header.message_id(), 0);
        assert_eq!(queue.pop_due(15).unwrap().header.message_id(), 1);
    }

    #[test]
    fn full_queue_rejects_further_messages() {
        let mut queue = SendQueue::new();

        for i in 0..QUEUE_CAPACITY {
            queue.schedule(message_at(i as u8, i as u64)).unwrap();
        }

        assert_eq!(queue.schedule(message_at(7, 99)), Err(Error::QueueFull));
        assert_eq!(queue.len(), QUEUE_CAPACITY);
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = SendQueue::new();

        queue.schedule(message_at(0, 1)).unwrap();
        queue.schedule(message_at(1, 2)).unwrap();

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop_due(u64::MAX), None);

        // Clearing again is harmless.
        queue.clear();
    }
}
