//! Tests for the source partner response engine.

use super::{SETTLE_DELAY_MS, SourceConfig, SourcePartner};
use crate::dummy::DummyPort;
use crate::message::header::{
    ControlMessageType, DataMessageType, Header, MessageType, SpecificationRevision,
};
use crate::message::pdo::FixedSupply;
use crate::message::{MAX_MESSAGE_SIZE, Message};
use crate::queue::QUEUE_CAPACITY;
use crate::tcpci::{CcVoltage, PartnerOps, Polarity, SopType, TxStatus};
use crate::{DataRole, Error, PowerRole};

/// Header template for messages coming from the device under test.
fn sink_header_template() -> Header {
    Header::new_template(DataRole::Dfp, PowerRole::Sink, SpecificationRevision::R2_0)
}

fn simulate_control_message(
    partner: &SourcePartner,
    port: &mut DummyPort,
    message_type: ControlMessageType,
    now_ms: u64,
) {
    let message = Message::control(sink_header_template(), 0, message_type);

    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    let size = message.to_bytes(&mut buf);
    partner.transmit(port, &buf[..size], SopType::Sop, now_ms);
}

fn simulate_data_message(
    partner: &SourcePartner,
    port: &mut DummyPort,
    message_type: DataMessageType,
    objects: &[u32],
    now_ms: u64,
) {
    let message = Message::data(sink_header_template(), 0, message_type, objects).unwrap();

    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    let size = message.to_bytes(&mut buf);
    partner.transmit(port, &buf[..size], SopType::Sop, now_ms);
}

/// Connect a partner and swallow the initial capability advertisement.
fn connected_partner(config: SourceConfig) -> (SourcePartner, DummyPort) {
    let partner = SourcePartner::new(config);
    let mut port = DummyPort::new();

    partner.connect_to_port(&mut port, 0).unwrap();
    port.probe_delivered().unwrap();

    (partner, port)
}

fn expect_control(port: &mut DummyPort, message_type: ControlMessageType) -> Message {
    let (message, sop_type) = port.probe_delivered().unwrap();
    assert_eq!(sop_type, SopType::Sop);
    assert_eq!(
        message.header.message_type(),
        MessageType::Control(message_type)
    );
    message
}

#[test]
fn connect_registers_and_advertises_capabilities() {
    let partner = SourcePartner::default();
    let mut port = DummyPort::new();

    partner.connect_to_port(&mut port, 0).unwrap();

    let connection = port.connection.unwrap();
    assert_eq!(connection.power_role, PowerRole::Source);
    assert_eq!(connection.cc1, CcVoltage::Rp3A0);
    assert_eq!(connection.cc2, CcVoltage::Open);
    assert_eq!(connection.polarity, Polarity::Cc1);

    let (message, _) = port.probe_delivered().unwrap();
    assert_eq!(
        message.header.message_type(),
        MessageType::Data(DataMessageType::SourceCapabilities)
    );
    assert_eq!(message.header.message_id(), 0);
    assert_eq!(message.header.port_power_role(), PowerRole::Source);
    assert_eq!(message.header.port_data_role(), DataRole::Ufp);

    // The default configuration advertises a single 5 V / 3 A supply.
    assert_eq!(message.objects().len(), 1);
    let pdo = FixedSupply(message.objects()[0]);
    assert_eq!(pdo.voltage_mv(), 5000);
    assert_eq!(pdo.raw_max_current(), 300);
    assert!(pdo.unconstrained_power());
}

#[test]
fn failed_registration_has_no_side_effects() {
    let partner = SourcePartner::default();
    let mut port = DummyPort::new();
    port.reject_connect = true;

    assert_eq!(
        partner.connect_to_port(&mut port, 0),
        Err(Error::TransportRejected)
    );

    assert!(port.connection.is_none());
    assert_eq!(port.delivered_count(), 0);
    assert_eq!(partner.next_message_id(), 0);
    assert_eq!(partner.pending(), 0);
}

#[test]
fn request_yields_accept_then_ps_rdy() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_data_message(&partner, &mut port, DataMessageType::Request, &[0x1304_b12c], 100);

    // Accept goes out immediately, PS_RDY waits for the settle delay.
    let accept = expect_control(&mut port, ControlMessageType::Accept);
    assert_eq!(accept.header.message_id(), 1);
    assert_eq!(port.delivered_count(), 0);
    assert_eq!(partner.pending(), 1);

    partner.dispatch_due(&mut port, 100 + SETTLE_DELAY_MS - 1);
    assert_eq!(port.delivered_count(), 0);

    partner.dispatch_due(&mut port, 100 + SETTLE_DELAY_MS);
    let ps_rdy = expect_control(&mut port, ControlMessageType::PsRdy);
    assert_eq!(ps_rdy.header.message_id(), 2);
    assert_eq!(partner.pending(), 0);

    // Dispatching again releases nothing further.
    partner.dispatch_due(&mut port, u64::MAX);
    assert_eq!(port.delivered_count(), 0);
}

#[test]
fn vendor_defined_messages_are_ignored() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_data_message(
        &partner,
        &mut port,
        DataMessageType::VendorDefined,
        &[0xff00_8001],
        0,
    );

    assert_eq!(port.delivered_count(), 0);
    assert_eq!(partner.pending(), 0);
}

#[test]
fn unsupported_data_messages_are_rejected() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_data_message(&partner, &mut port, DataMessageType::Bist, &[0], 0);

    expect_control(&mut port, ControlMessageType::Reject);
    assert_eq!(port.delivered_count(), 0);
}

#[test]
fn get_source_cap_returns_capability_list() {
    let mut config = SourceConfig::default();
    config.pdos = [0; 7];
    config.pdos[0] = FixedSupply::new(5000, 3000).0;
    config.pdos[1] = FixedSupply::new(9000, 2000).0;

    let (partner, mut port) = connected_partner(config);

    simulate_control_message(&partner, &mut port, ControlMessageType::GetSourceCap, 50);

    // Exactly one message, immediately, with both advertised PDOs.
    let (message, _) = port.probe_delivered().unwrap();
    assert_eq!(
        message.header.message_type(),
        MessageType::Data(DataMessageType::SourceCapabilities)
    );
    assert_eq!(message.objects().len(), 2);
    assert_eq!(FixedSupply(message.objects()[0]).voltage_mv(), 5000);
    assert_eq!(FixedSupply(message.objects()[1]).voltage_mv(), 9000);
    assert_eq!(partner.pending(), 0);
}

#[test]
fn get_sink_cap_is_rejected() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_control_message(&partner, &mut port, ControlMessageType::GetSinkCap, 0);
    expect_control(&mut port, ControlMessageType::Reject);
}

#[test]
fn dr_swap_is_rejected() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_control_message(&partner, &mut port, ControlMessageType::DrSwap, 0);
    expect_control(&mut port, ControlMessageType::Reject);
}

#[test]
fn unknown_control_messages_are_rejected() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_control_message(&partner, &mut port, ControlMessageType::Ping, 0);
    expect_control(&mut port, ControlMessageType::Reject);
}

#[test]
fn soft_reset_restarts_message_id_sequencing() {
    let (partner, mut port) = connected_partner(SourceConfig::default());
    partner.force_message_id(5);

    simulate_control_message(&partner, &mut port, ControlMessageType::SoftReset, 200);

    // The first message after the reset carries ID 0 again.
    let accept = expect_control(&mut port, ControlMessageType::Accept);
    assert_eq!(accept.header.message_id(), 0);

    // Capabilities follow after the settle delay, to re-establish PD.
    partner.dispatch_due(&mut port, 200 + SETTLE_DELAY_MS);
    let (capabilities, _) = port.probe_delivered().unwrap();
    assert_eq!(
        capabilities.header.message_type(),
        MessageType::Data(DataMessageType::SourceCapabilities)
    );
    assert_eq!(capabilities.header.message_id(), 1);
}

#[test]
fn every_transmission_is_acknowledged() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_control_message(&partner, &mut port, ControlMessageType::GetSourceCap, 0);
    simulate_data_message(&partner, &mut port, DataMessageType::Request, &[0x1304_b12c], 0);

    assert_eq!(port.tx_statuses(), &[TxStatus::Success, TxStatus::Success]);
}

#[test]
fn non_sop_messages_are_ignored() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    let message = Message::control(sink_header_template(), 0, ControlMessageType::GetSourceCap);
    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    let size = message.to_bytes(&mut buf);
    partner.transmit(&mut port, &buf[..size], SopType::SopPrime, 0);

    // The transmission is acknowledged, but no response is generated.
    assert_eq!(port.tx_statuses(), &[TxStatus::Success]);
    assert_eq!(port.delivered_count(), 0);
    assert_eq!(partner.pending(), 0);
}

#[test]
fn unparseable_buffers_are_ignored() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    partner.transmit(&mut port, &[0x42], SopType::Sop, 0);

    assert_eq!(port.delivered_count(), 0);
    assert_eq!(partner.dropped_sends(), 0);
}

#[test]
fn clear_queue_discards_scheduled_messages() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_data_message(&partner, &mut port, DataMessageType::Request, &[0x1304_b12c], 0);
    expect_control(&mut port, ControlMessageType::Accept);
    assert_eq!(partner.pending(), 1);

    partner.clear_queue();

    partner.dispatch_due(&mut port, u64::MAX);
    assert_eq!(port.delivered_count(), 0);

    // Clearing again is harmless.
    partner.clear_queue();
}

#[test]
fn disconnect_clears_pending_state() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    simulate_data_message(&partner, &mut port, DataMessageType::Request, &[0x1304_b12c], 0);
    expect_control(&mut port, ControlMessageType::Accept);

    partner.disconnect();
    assert_eq!(partner.pending(), 0);
    assert_eq!(partner.next_message_id(), 0);

    // Responses while disconnected are dropped, observably.
    simulate_control_message(&partner, &mut port, ControlMessageType::GetSourceCap, 0);
    assert_eq!(port.delivered_count(), 0);
    assert_eq!(partner.dropped_sends(), 1);
}

#[test]
fn delivery_failures_are_soft() {
    let (partner, mut port) = connected_partner(SourceConfig::default());
    port.reject_deliver = true;

    simulate_control_message(&partner, &mut port, ControlMessageType::GetSourceCap, 0);

    assert_eq!(partner.dropped_sends(), 1);

    // The engine keeps responding once the port recovers.
    port.reject_deliver = false;
    simulate_control_message(&partner, &mut port, ControlMessageType::GetSourceCap, 0);
    assert_eq!(port.delivered_count(), 1);
}

#[test]
fn full_queue_drops_further_delayed_messages() {
    let (partner, mut port) = connected_partner(SourceConfig::default());

    // Each request schedules one delayed PS_RDY.
    for _ in 0..QUEUE_CAPACITY {
        simulate_data_message(&partner, &mut port, DataMessageType::Request, &[0x1304_b12c], 0);
        expect_control(&mut port, ControlMessageType::Accept);
    }
    assert_eq!(partner.pending(), QUEUE_CAPACITY);
    assert_eq!(partner.dropped_sends(), 0);

    simulate_data_message(&partner, &mut port, DataMessageType::Request, &[0x1304_b12c], 0);
    expect_control(&mut port, ControlMessageType::Accept);

    assert_eq!(partner.pending(), QUEUE_CAPACITY);
    assert_eq!(partner.dropped_sends(), 1);
}

#[test]
fn setting_pdos_requires_disconnection() {
    let (partner, _port) = connected_partner(SourceConfig::default());

    let pdo = FixedSupply::new(5000, 1500).0;
    assert_eq!(partner.set_pdos(&[pdo]), Err(Error::Connected));

    partner.disconnect();
    partner.set_pdos(&[pdo]).unwrap();
    partner.ensure_valid_pdos().unwrap();
}
