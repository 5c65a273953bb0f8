//! An in-memory port controller for testing partner emulators.

use heapless::Vec;

use crate::Error;
use crate::message::Message;
use crate::tcpci::{CcVoltage, Polarity, PortController, SopType, TxStatus};

/// A recorded partner connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Power role the partner registered with.
    pub power_role: crate::PowerRole,
    /// Signaling on CC1.
    pub cc1: CcVoltage,
    /// Signaling on CC2.
    pub cc2: CcVoltage,
    /// Connection polarity.
    pub polarity: Polarity,
}

/// A port controller that records everything a partner does to it.
///
/// Delivered messages and transmission acknowledgements are kept for
/// later inspection. Failure injection flags let tests exercise the
/// partner's error paths.
#[derive(Debug, Default)]
pub struct DummyPort {
    /// The registered connection, if any.
    pub connection: Option<Connection>,
    /// Reject the next connection attempts when set.
    pub reject_connect: bool,
    /// Reject all deliveries when set.
    pub reject_deliver: bool,
    delivered: Vec<(Message, SopType), 16>,
    tx_statuses: Vec<TxStatus, 16>,
}

impl DummyPort {
    /// Create an idle port.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest delivered message, if any.
    pub fn probe_delivered(&mut self) -> Option<(Message, SopType)> {
        if self.delivered.is_empty() {
            None
        } else {
            Some(self.delivered.remove(0))
        }
    }

    /// Number of messages delivered and not yet probed.
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// Transmission statuses reported by the partner, oldest first.
    pub fn tx_statuses(&self) -> &[TxStatus] {
        &self.tx_statuses
    }
}

impl PortController for DummyPort {
    fn connect_partner(
        &mut self,
        power_role: crate::PowerRole,
        cc1: CcVoltage,
        cc2: CcVoltage,
        polarity: Polarity,
    ) -> Result<(), Error> {
        if self.reject_connect {
            return Err(Error::TransportRejected);
        }

        self.connection = Some(Connection {
            power_role,
            cc1,
            cc2,
            polarity,
        });
        Ok(())
    }

    fn deliver(&mut self, message: Message, sop_type: SopType) -> Result<(), Error> {
        if self.reject_deliver {
            return Err(Error::TransportRejected);
        }

        self.delivered
            .push((message, sop_type))
            .map_err(|_| Error::TransportRejected)
    }

    fn report_tx_status(&mut self, status: TxStatus) {
        let _ = self.tx_statuses.push(status);
    }
}
