//! Emulation of a source-role port partner.
//!
//! The partner reacts to messages transmitted by the device under test
//! the way a simple PD source would: it accepts requests, advertises its
//! capabilities and rejects everything it does not support. Responses
//! are either delivered immediately or placed on a delayed send queue
//! that a periodic driver drains via [`SourcePartner::dispatch_due`].

pub mod pdo_check;

#[cfg(test)]
mod tests;

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::counters::MessageIdCounter;
use crate::message::header::{ControlMessageType, DataMessageType, Header, MessageType, SpecificationRevision};
use crate::message::pdo::FixedSupply;
use crate::message::{MAX_DATA_OBJECTS, Message};
use crate::queue::SendQueue;
use crate::source::pdo_check::PdoCheckResult;
use crate::tcpci::{CcVoltage, PartnerOps, Polarity, PortController, SopType, TxStatus};
use crate::{DataRole, Error, PowerRole};

/// Delay before PS_RDY follows an Accept, modelling power-path settling.
pub const SETTLE_DELAY_MS: u64 = 15;

/// Configuration of a source partner, applied at creation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceConfig {
    /// Specification revision carried in every message header.
    pub revision: SpecificationRevision,
    /// Advertised capabilities, terminated by the first zero entry.
    pub pdos: [u32; MAX_DATA_OBJECTS],
}

impl Default for SourceConfig {
    /// A single fixed 5 V / 3 A supply with unconstrained power.
    fn default() -> Self {
        let mut pdos = [0; MAX_DATA_OBJECTS];
        pdos[0] = FixedSupply::new(5000, 3000).with_unconstrained_power(true).0;

        Self {
            revision: SpecificationRevision::R2_0,
            pdos,
        }
    }
}

/// State that both the port controller callbacks and the periodic
/// dispatch driver mutate, serialized by the partner's lock.
#[derive(Debug)]
struct State {
    connected: bool,
    message_id: MessageIdCounter,
    queue: SendQueue,
    pdos: [u32; MAX_DATA_OBJECTS],
    dropped_sends: u32,
}

/// An emulated source-role port partner.
///
/// Roles and revision are fixed at creation; everything else lives
/// behind a single lock that is held only while mutating the queue or
/// the message ID counter, never across a handoff to the port
/// controller. The port controller is passed into each operation, so
/// the partner holds no reference that could outlive a connection.
pub struct SourcePartner {
    header_template: Header,
    state: Mutex<CriticalSectionRawMutex, RefCell<State>>,
}

impl Default for SourcePartner {
    fn default() -> Self {
        Self::new(SourceConfig::default())
    }
}

impl SourcePartner {
    /// Create a new source partner from a configuration.
    pub fn new(config: SourceConfig) -> Self {
        Self {
            header_template: Header::new_template(DataRole::Ufp, PowerRole::Source, config.revision),
            state: Mutex::new(RefCell::new(State {
                connected: false,
                message_id: MessageIdCounter::new(),
                queue: SendQueue::new(),
                pdos: config.pdos,
                dropped_sends: 0,
            })),
        }
    }

    /// Attach the partner to a port controller.
    ///
    /// Registers with fixed Type-C signaling (Rp 3.0 A on CC1, open
    /// CC2), then immediately advertises the configured capabilities.
    /// A registration failure is propagated and leaves the partner
    /// untouched; no message is sent.
    pub fn connect_to_port(&self, port: &mut dyn PortController, now_ms: u64) -> Result<(), Error> {
        port.connect_partner(PowerRole::Source, CcVoltage::Rp3A0, CcVoltage::Open, Polarity::Cc1)?;

        self.state.lock(|cell| cell.borrow_mut().connected = true);
        debug!("Source partner connected, advertising capabilities");

        self.send_capabilities(port, 0, now_ms)
    }

    /// Detach the partner.
    ///
    /// Always succeeds: pending messages are dropped and message ID
    /// sequencing restarts, regardless of prior errors.
    pub fn disconnect(&self) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.connected = false;
            state.queue.clear();
            state.message_id.reset();
        });
    }

    /// Drop all pending messages. Idempotent.
    ///
    /// No message scheduled before the clear will be released by a
    /// later [`SourcePartner::dispatch_due`] call.
    pub fn clear_queue(&self) {
        self.state.lock(|cell| cell.borrow_mut().queue.clear());
    }

    /// Deliver every pending message that is due at `now_ms`, in
    /// scheduled order.
    ///
    /// Driven periodically by the test harness, at least once per
    /// supported delay granularity. The lock is released while a
    /// message is handed to the port controller, so the port controller
    /// may call back into the partner. Delivery failures are counted
    /// and do not stop the dispatch.
    pub fn dispatch_due(&self, port: &mut dyn PortController, now_ms: u64) {
        loop {
            let due = self.state.lock(|cell| cell.borrow_mut().queue.pop_due(now_ms));

            let Some(message) = due else { break };
            if let Err(error) = port.deliver(message, SopType::Sop) {
                warn!("Port controller rejected a delayed message: {:?}", error);
                self.note_dropped_send();
            }
        }
    }

    /// Check the configured PDO list against the PD ordering rules.
    pub fn check_pdos(&self) -> PdoCheckResult {
        let pdos = self.state.lock(|cell| cell.borrow().pdos);
        pdo_check::check_pdos(&pdos)
    }

    /// Like [`SourcePartner::check_pdos`], but as a result for harness
    /// code that treats a malformed fixture as an error.
    pub fn ensure_valid_pdos(&self) -> Result<(), Error> {
        match self.check_pdos() {
            PdoCheckResult::Ok => Ok(()),
            result => Err(Error::InvalidPdoConfiguration(result)),
        }
    }

    /// Replace the advertised capabilities.
    ///
    /// Only permitted between connections; shorter lists are
    /// zero-padded.
    pub fn set_pdos(&self, pdos: &[u32]) -> Result<(), Error> {
        if pdos.len() > MAX_DATA_OBJECTS {
            return Err(Error::Allocation);
        }

        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.connected {
                return Err(Error::Connected);
            }

            state.pdos = [0; MAX_DATA_OBJECTS];
            state.pdos[..pdos.len()].copy_from_slice(pdos);
            Ok(())
        })
    }

    /// Number of messages waiting on the delayed send queue.
    pub fn pending(&self) -> usize {
        self.state.lock(|cell| cell.borrow().queue.len())
    }

    /// Number of responses that were dropped due to soft failures.
    pub fn dropped_sends(&self) -> u32 {
        self.state.lock(|cell| cell.borrow().dropped_sends)
    }

    /// The ID that the next transmitted message will carry.
    pub fn next_message_id(&self) -> u8 {
        self.state.lock(|cell| cell.borrow().message_id.value())
    }

    #[cfg(test)]
    fn force_message_id(&self, value: u8) {
        self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            state.message_id.reset();
            for _ in 0..value {
                state.message_id.advance();
            }
        });
    }

    /// Construct a message under the lock and send it.
    ///
    /// The message ID is taken from the partner state at construction
    /// time; a message that fails to build consumes no ID. Immediate
    /// messages are handed to the port controller with the lock
    /// released, delayed ones become visible to dispatch only after
    /// they were enqueued successfully.
    fn send<F>(&self, port: &mut dyn PortController, build: F, delay_ms: u64, now_ms: u64) -> Result<(), Error>
    where
        F: FnOnce(Header, u8) -> Result<Message, Error>,
    {
        let immediate = self.state.lock(|cell| {
            let mut state = cell.borrow_mut();
            if !state.connected {
                return Err(Error::NotConnected);
            }

            let mut message = build(self.header_template, state.message_id.value())?;
            state.message_id.advance();

            if delay_ms == 0 {
                Ok(Some(message))
            } else {
                message.scheduled_time = now_ms + delay_ms;
                state.queue.schedule(message)?;
                Ok(None)
            }
        })?;

        if let Some(message) = immediate {
            port.deliver(message, SopType::Sop).map_err(|error| {
                warn!("Port controller rejected an immediate message: {:?}", error);
                error
            })?;
        }

        Ok(())
    }

    fn send_control(
        &self,
        port: &mut dyn PortController,
        message_type: ControlMessageType,
        delay_ms: u64,
        now_ms: u64,
    ) -> Result<(), Error> {
        self.send(
            port,
            |template, id| Ok(Message::control(template, id, message_type)),
            delay_ms,
            now_ms,
        )
    }

    /// Send a Source_Capabilities message built from the configured
    /// PDO list, up to its first zero entry.
    fn send_capabilities(&self, port: &mut dyn PortController, delay_ms: u64, now_ms: u64) -> Result<(), Error> {
        let pdos = self.state.lock(|cell| cell.borrow().pdos);
        let count = pdos.iter().position(|&pdo| pdo == 0).unwrap_or(MAX_DATA_OBJECTS);

        self.send(
            port,
            |template, id| Message::data(template, id, DataMessageType::SourceCapabilities, &pdos[..count]),
            delay_ms,
            now_ms,
        )
    }

    /// Treat a failed response as a soft failure: skip the send, keep
    /// the protocol running, leave a trace for the harness.
    fn respond(&self, result: Result<(), Error>) {
        if let Err(error) = result {
            warn!("Dropping response: {:?}", error);
            self.note_dropped_send();
        }
    }

    fn note_dropped_send(&self) {
        self.state.lock(|cell| cell.borrow_mut().dropped_sends += 1);
    }
}

impl PartnerOps for SourcePartner {
    fn transmit(&self, port: &mut dyn PortController, buffer: &[u8], sop_type: SopType, now_ms: u64) {
        // Acknowledge that the message was sent successfully.
        port.report_tx_status(TxStatus::Success);

        // Handle only SOP messages.
        if sop_type != SopType::Sop {
            return;
        }

        let message = match Message::from_bytes(buffer) {
            Ok(message) => message,
            Err(error) => {
                warn!("Ignoring unparseable message: {:?}", error);
                return;
            }
        };

        trace!("Source received message {:?}", message);

        match message.header.message_type() {
            MessageType::Data(DataMessageType::Request) => {
                self.respond(self.send_control(port, ControlMessageType::Accept, 0, now_ms));
                // PS ready once the power path has settled.
                self.respond(self.send_control(port, ControlMessageType::PsRdy, SETTLE_DELAY_MS, now_ms));
            }
            MessageType::Data(DataMessageType::VendorDefined) => {
                // VDM negotiation is out of scope, ignore.
            }
            MessageType::Data(_) => {
                self.respond(self.send_control(port, ControlMessageType::Reject, 0, now_ms));
            }
            MessageType::Control(ControlMessageType::GetSourceCap) => {
                self.respond(self.send_capabilities(port, 0, now_ms));
            }
            MessageType::Control(ControlMessageType::GetSinkCap) => {
                // A source has no sink capabilities to offer.
                self.respond(self.send_control(port, ControlMessageType::Reject, 0, now_ms));
            }
            MessageType::Control(ControlMessageType::DrSwap) => {
                // Data role swaps are unsupported by this emulator.
                self.respond(self.send_control(port, ControlMessageType::Reject, 0, now_ms));
            }
            MessageType::Control(ControlMessageType::SoftReset) => {
                self.state.lock(|cell| cell.borrow_mut().message_id.reset());
                self.respond(self.send_control(port, ControlMessageType::Accept, 0, now_ms));
                // Advertise capabilities again to re-establish PD.
                self.respond(self.send_capabilities(port, SETTLE_DELAY_MS, now_ms));
            }
            _ => {
                self.respond(self.send_control(port, ControlMessageType::Reject, 0, now_ms));
            }
        }
    }
}
