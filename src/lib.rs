//! Emulated USB PD port partners for exercising a PD stack under test.
//!
//! A partner emulator stands in for a real device attached to a Type-C
//! port. It reacts to messages transmitted by the device under test and
//! answers through a simulated port controller, without any hardware.
//!
//! The crate currently provides a source-role partner, see [`source`].
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod counters;
pub mod dummy;
pub mod message;
pub mod queue;
pub mod source;
pub mod tcpci;

#[macro_use]
extern crate uom;

use crate::source::pdo_check::PdoCheckResult;

/// Errors reported by partner emulator operations.
///
/// None of these are fatal; a long-running test session continues after
/// a single failed interaction.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A message buffer could not be built, e.g. too many data objects.
    #[error("no message buffer available")]
    Allocation,
    /// The delayed send queue has no free slot.
    #[error("delayed send queue is full")]
    QueueFull,
    /// The port controller did not accept the operation.
    #[error("port controller rejected the operation")]
    TransportRejected,
    /// The partner is not connected to a port controller.
    #[error("partner is not connected")]
    NotConnected,
    /// The operation is only permitted while disconnected.
    #[error("partner is still connected")]
    Connected,
    /// The configured PDO list violates the PD ordering rules.
    #[error("invalid PDO configuration: {0:?}")]
    InvalidPdoConfiguration(PdoCheckResult),
}

/// Power role of a port, as encoded in the message header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerRole {
    /// Supplies power.
    Source,
    /// Consumes power.
    Sink,
}

impl From<bool> for PowerRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Sink,
            true => Self::Source,
        }
    }
}

impl From<PowerRole> for bool {
    fn from(role: PowerRole) -> bool {
        match role {
            PowerRole::Sink => false,
            PowerRole::Source => true,
        }
    }
}

/// Data role of a port, as encoded in the message header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRole {
    /// Upstream-facing port.
    Ufp,
    /// Downstream-facing port.
    Dfp,
}

impl From<bool> for DataRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Ufp,
            true => Self::Dfp,
        }
    }
}

impl From<DataRole> for bool {
    fn from(role: DataRole) -> bool {
        match role {
            DataRole::Ufp => false,
            DataRole::Dfp => true,
        }
    }
}
