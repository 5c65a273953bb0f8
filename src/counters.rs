//! Message ID bookkeeping for transmitted SOP messages.

/// Rolling message ID counter, maintained by the originator of a message.
///
/// IDs run from 0 to 7 and wrap, see [2.6.1.3].
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageIdCounter {
    value: u8,
}

impl MessageIdCounter {
    const MAX_VALUE: u8 = 7;

    /// Create a counter that starts at zero.
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// The ID that the next transmitted message will carry.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Take the current ID for a new message and step to the next one.
    pub fn advance(&mut self) -> u8 {
        let id = self.value;
        self.value = (self.value + 1) % (Self::MAX_VALUE + 1);
        id
    }

    /// Restart ID sequencing, as required on Soft Reset.
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::MessageIdCounter;

    #[test]
    fn wraps_modulo_eight() {
        let mut counter = MessageIdCounter::new();

        for expected in [0, 1, 2, 3, 4, 5, 6, 7, 0, 1] {
            assert_eq!(counter.advance(), expected);
        }
    }

    #[test]
    fn reset_restarts_sequencing() {
        let mut counter = MessageIdCounter::new();
        counter.advance();
        counter.advance();

        counter.reset();
        assert_eq!(counter.value(), 0);
        assert_eq!(counter.advance(), 0);
        assert_eq!(counter.value(), 1);
    }
}
