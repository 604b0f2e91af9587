use std::io::BufWriter;

use super::*;
use crate::handshake::handshake_message_certificate::*;
use crate::handshake::handshake_message_client_key_exchange::*;
use crate::handshake::handshake_message_finished::*;

fn delivered(message: HandshakeMessage, sequence: u16) -> Delivered {
    let mut handshake = Handshake::new(message);
    handshake.handshake_header.message_sequence = sequence;

    let mut raw = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
        handshake.marshal(&mut writer).unwrap();
    }

    Delivered { handshake, raw }
}

fn finished(sequence: u16) -> Delivered {
    delivered(
        HandshakeMessage::Finished(HandshakeMessageFinished {
            verify_data: vec![0u8; 12],
        }),
        sequence,
    )
}

fn client_key_exchange(sequence: u16) -> Delivered {
    delivered(
        HandshakeMessage::ClientKeyExchange(HandshakeMessageClientKeyExchange {
            params: vec![0u8; 32],
        }),
        sequence,
    )
}

fn certificate(chain: Vec<Vec<u8>>, sequence: u16) -> Delivered {
    delivered(
        HandshakeMessage::Certificate(HandshakeMessageCertificate { certificate: chain }),
        sequence,
    )
}

#[test]
fn test_unexpected_type_is_flagged() {
    let mut slots = FlightSlots::new(vec![SlotRule {
        typ: HandshakeType::Finished,
        policy: SlotPolicy::Required,
    }]);

    assert_eq!(
        slots.deliver(client_key_exchange(1)),
        SlotOutcome::Unexpected
    );
    assert!(!slots.is_ready());
}

#[test]
fn test_duplicate_slot_ignored() {
    let mut slots = FlightSlots::new(vec![SlotRule {
        typ: HandshakeType::Finished,
        policy: SlotPolicy::Required,
    }]);

    assert_eq!(slots.deliver(finished(2)), SlotOutcome::Stored);
    assert_eq!(slots.deliver(finished(2)), SlotOutcome::Duplicate);
    assert!(slots.is_ready());
}

#[test]
fn test_required_slots_gate_readiness() {
    let mut slots = FlightSlots::new(vec![
        SlotRule {
            typ: HandshakeType::ClientKeyExchange,
            policy: SlotPolicy::Required,
        },
        SlotRule {
            typ: HandshakeType::Finished,
            policy: SlotPolicy::Required,
        },
    ]);

    assert_eq!(slots.deliver(client_key_exchange(1)), SlotOutcome::Stored);
    assert!(!slots.is_ready(), "Finished still missing");

    assert_eq!(slots.deliver(finished(2)), SlotOutcome::Stored);
    assert!(slots.is_ready());
}

#[test]
fn test_certificate_verify_required_only_with_certificate() {
    let rules = vec![
        SlotRule {
            typ: HandshakeType::Certificate,
            policy: SlotPolicy::Required,
        },
        SlotRule {
            typ: HandshakeType::ClientKeyExchange,
            policy: SlotPolicy::Required,
        },
        SlotRule {
            typ: HandshakeType::CertificateVerify,
            policy: SlotPolicy::RequiredWithClientCert,
        },
        SlotRule {
            typ: HandshakeType::Finished,
            policy: SlotPolicy::Required,
        },
    ];

    // empty chain: no CertificateVerify owed
    let mut slots = FlightSlots::new(rules.clone());
    assert_eq!(slots.deliver(certificate(vec![], 1)), SlotOutcome::Stored);
    assert_eq!(slots.deliver(client_key_exchange(2)), SlotOutcome::Stored);
    assert_eq!(slots.deliver(finished(3)), SlotOutcome::Stored);
    assert!(slots.is_ready());

    // real chain: the flight stays open until the signature shows up
    let mut slots = FlightSlots::new(rules);
    assert_eq!(
        slots.deliver(certificate(vec![vec![0x30, 0x01, 0x00]], 1)),
        SlotOutcome::Stored
    );
    assert_eq!(slots.deliver(client_key_exchange(2)), SlotOutcome::Stored);
    assert_eq!(slots.deliver(finished(4)), SlotOutcome::Stored);
    assert!(!slots.is_ready(), "CertificateVerify now required");

    assert_eq!(
        slots.deliver(delivered(
            HandshakeMessage::CertificateVerify(
                crate::handshake::handshake_message_certificate_verify::HandshakeMessageCertificateVerify {
                    signature: vec![0xab; 16],
                },
            ),
            3,
        )),
        SlotOutcome::Stored
    );
    assert!(slots.is_ready());
}

#[test]
fn test_trigger_slot_short_circuits() {
    let mut slots = FlightSlots::new(vec![
        SlotRule {
            typ: HandshakeType::HelloVerifyRequest,
            policy: SlotPolicy::Trigger,
        },
        SlotRule {
            typ: HandshakeType::ServerHello,
            policy: SlotPolicy::Required,
        },
        SlotRule {
            typ: HandshakeType::ServerHelloDone,
            policy: SlotPolicy::Required,
        },
    ]);

    let hvr = delivered(
        HandshakeMessage::HelloVerifyRequest(
            crate::handshake::handshake_message_hello_verify_request::HandshakeMessageHelloVerifyRequest {
                version: PROTOCOL_VERSION1_2,
                cookie: vec![0xde, 0xad],
            },
        ),
        0,
    );

    assert_eq!(slots.deliver(hvr), SlotOutcome::Stored);
    assert!(slots.is_ready(), "a fresh cookie restarts the flight alone");
}

#[test]
fn test_sorted_returns_wire_order() {
    let mut slots = FlightSlots::new(vec![
        SlotRule {
            typ: HandshakeType::ClientKeyExchange,
            policy: SlotPolicy::Required,
        },
        SlotRule {
            typ: HandshakeType::Certificate,
            policy: SlotPolicy::Optional,
        },
        SlotRule {
            typ: HandshakeType::Finished,
            policy: SlotPolicy::Required,
        },
    ]);

    slots.deliver(finished(3));
    slots.deliver(certificate(vec![], 1));
    slots.deliver(client_key_exchange(2));

    let sequences: Vec<u16> = slots
        .sorted()
        .iter()
        .map(|d| d.handshake.handshake_header.message_sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);
}
