//! Definitions of message content and framing.

pub mod header;
pub mod pdo;

use byteorder::{ByteOrder, LittleEndian};
use heapless::Vec;

use crate::Error;
use header::{ControlMessageType, DataMessageType, Header};

/// The maximum number of data objects in a message, see [6.2.1.1.6].
pub const MAX_DATA_OBJECTS: usize = 7;

/// The size of the largest supported message on the wire (header plus
/// a full complement of data objects).
pub const MAX_MESSAGE_SIZE: usize = 2 + 4 * MAX_DATA_OBJECTS;

/// Quantity aliases with `u32` storage.
pub mod units {
    /// Electric potential, `u32` storage.
    pub type ElectricPotential = uom::si::u32::ElectricPotential;
    /// Electric current, `u32` storage.
    pub type ElectricCurrent = uom::si::u32::ElectricCurrent;
    /// Power, `u32` storage.
    pub type Power = uom::si::u32::Power;
}

pub(crate) mod _50millivolts_mod {
    unit! {
        system: uom::si;
        quantity: uom::si::electric_potential;

        @_50millivolts: 0.05; "50 mV", "50 millivolts", "50 millivolts";
    }
}

pub(crate) mod _250milliwatts_mod {
    unit! {
        system: uom::si;
        quantity: uom::si::power;

        @_250milliwatts: 0.25; "250 mW", "250 milliwatts", "250 milliwatts";
    }
}

/// Errors that can occur during message/header parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The input buffer has an invalid length.
    #[error("invalid input buffer length (expected {expected:?}, found {found:?})")]
    InvalidLength {
        /// The expected length.
        expected: usize,
        /// The actual length found.
        found: usize,
    },
    /// The specification revision field is not supported.
    #[error("unsupported specification revision `{0}`")]
    UnsupportedSpecificationRevision(u8),
}

/// A USB PD message, together with its delivery schedule.
///
/// The header is derived from the partner state at construction time and
/// is never edited afterwards. A message is owned by exactly one party at
/// any time: the send queue until it becomes due, then the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// The message header.
    pub header: Header,
    objects: Vec<u32, MAX_DATA_OBJECTS>,
    /// Monotonic time in milliseconds at which the message becomes
    /// eligible for delivery. Zero means "now".
    pub(crate) scheduled_time: u64,
}

impl Message {
    /// Create a control message.
    pub fn control(template: Header, message_id: u8, message_type: ControlMessageType) -> Self {
        Self {
            header: Header::new_control(template, message_id, message_type),
            objects: Vec::new(),
            scheduled_time: 0,
        }
    }

    /// Create a data message, copying the data objects.
    ///
    /// Fails with [`Error::Allocation`] when the objects do not fit into
    /// a message buffer. The header's object count always matches the
    /// number of payload words.
    pub fn data(
        template: Header,
        message_id: u8,
        message_type: DataMessageType,
        objects: &[u32],
    ) -> Result<Self, Error> {
        let objects = Vec::from_slice(objects).map_err(|_| Error::Allocation)?;

        Ok(Self {
            header: Header::new_data(template, message_id, message_type, objects.len() as u8),
            objects,
            scheduled_time: 0,
        })
    }

    /// The data objects that follow the header.
    pub fn objects(&self) -> &[u32] {
        &self.objects
    }

    /// The monotonic time at which the message becomes deliverable.
    pub fn scheduled_time(&self) -> u64 {
        self.scheduled_time
    }

    /// Serialize the message to a slice, returning the number of written bytes.
    pub fn to_bytes(&self, buffer: &mut [u8]) -> usize {
        let mut size = self.header.to_bytes(buffer);

        for object in &self.objects {
            LittleEndian::write_u32(&mut buffer[size..], *object);
            size += 4;
        }

        size
    }

    /// Parse a message from its binary representation.
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, ParseError> {
        let header = Header::from_bytes(buffer)?;

        let expected = 2 + 4 * header.num_objects();
        if buffer.len() < expected {
            return Err(ParseError::InvalidLength {
                expected,
                found: buffer.len(),
            });
        }

        let mut objects = Vec::new();
        for chunk in buffer[2..expected].chunks_exact(4) {
            // Cannot overflow, num_objects is a three bit field.
            let _ = objects.push(LittleEndian::read_u32(chunk));
        }

        Ok(Self {
            header,
            objects,
            scheduled_time: 0,
        })
    }
}
