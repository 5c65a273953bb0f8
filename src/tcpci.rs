//! Interface between partner emulators and the simulated port controller.
//!
//! The port controller (TCPCI) emulator is an external collaborator. It
//! owns the register-level view that the device under test talks to, and
//! it reaches partner emulators through [`PartnerOps`], replacing the
//! function-pointer dispatch of register-level emulators with a trait.

use crate::message::Message;
use crate::{Error, PowerRole};

/// Start-of-packet sequence that addresses a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SopType {
    /// Directly attached partner.
    Sop,
    /// Cable plug nearest the DFP.
    SopPrime,
    /// Cable plug nearest the UFP.
    SopDoublePrime,
}

/// Voltage presented on a CC line by the partner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcVoltage {
    /// Line not driven.
    Open,
    /// Powered cable present.
    Ra,
    /// Sink attached.
    Rd,
    /// Source attached, default USB current.
    RpDefault,
    /// Source attached, 1.5 A capable.
    Rp1A5,
    /// Source attached, 3.0 A capable.
    Rp3A0,
}

/// Which CC line carries the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// CC1 is the communication line.
    Cc1,
    /// CC2 is the communication line.
    Cc2,
}

/// Outcome of a transmission attempt by the device under test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// Message was received by the partner.
    Success,
    /// Message was lost on the simulated wire.
    Discarded,
    /// Transmission failed.
    Failed,
}

/// Operations that a partner emulator may invoke on the port controller.
pub trait PortController {
    /// Register an attached partner with the given Type-C signaling.
    ///
    /// Fails when the port cannot accept a partner, in which case the
    /// connection attempt must have no further side effects.
    fn connect_partner(
        &mut self,
        power_role: PowerRole,
        cc1: CcVoltage,
        cc2: CcVoltage,
        polarity: Polarity,
    ) -> Result<(), Error>;

    /// Hand a message to the simulated wire, transferring ownership.
    ///
    /// The port controller frees the message once the device under test
    /// has consumed it, by dropping it or by handing it back through
    /// [`PartnerOps::rx_consumed`].
    fn deliver(&mut self, message: Message, sop_type: SopType) -> Result<(), Error>;

    /// Acknowledge a transmission attempt of the device under test.
    fn report_tx_status(&mut self, status: TxStatus);
}

/// Callbacks of a partner emulator, invoked by the port controller.
pub trait PartnerOps {
    /// Called whenever the device under test transmits a message.
    ///
    /// `buffer` holds the raw message bytes, `now_ms` the current
    /// monotonic time in milliseconds.
    fn transmit(&self, port: &mut dyn PortController, buffer: &[u8], sop_type: SopType, now_ms: u64);

    /// Called when a delivered message has been fully consumed.
    ///
    /// Dropping the message releases its buffer; that is all the default
    /// implementation does.
    fn rx_consumed(&self, message: Message) {
        drop(message);
    }
}
