#[cfg(test)]
mod slots_test;

use std::collections::HashMap;

use crate::fragment_buffer::Delivered;
use crate::handshake::handshake_message_certificate::*;
use crate::handshake::handshake_message_certificate_verify::*;
use crate::handshake::handshake_message_client_hello::*;
use crate::handshake::handshake_message_client_key_exchange::*;
use crate::handshake::handshake_message_finished::*;
use crate::handshake::handshake_message_hello_verify_request::*;
use crate::handshake::handshake_message_server_hello::*;
use crate::handshake::handshake_message_server_key_exchange::*;
use crate::handshake::*;

// How a slot participates in the flight-complete predicate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum SlotPolicy {
    Required,
    Optional,
    // required once the peer has slotted a non-empty Certificate
    RequiredWithClientCert,
    // legal, and its arrival alone makes the flight processable
    // (the repeated HelloVerifyRequest restart)
    Trigger,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct SlotRule {
    pub(crate) typ: HandshakeType,
    pub(crate) policy: SlotPolicy,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum SlotOutcome {
    Stored,
    Duplicate,
    Unexpected,
}

// One flight's worth of named message slots. Each slot fills at most
// once; a type outside the table is a protocol violation the caller
// turns into a fatal unexpected_message.
pub(crate) struct FlightSlots {
    rules: Vec<SlotRule>,
    filled: HashMap<HandshakeType, Delivered>,
}

impl FlightSlots {
    pub(crate) fn new(rules: Vec<SlotRule>) -> Self {
        FlightSlots {
            rules,
            filled: HashMap::new(),
        }
    }

    pub(crate) fn empty() -> Self {
        FlightSlots::new(vec![])
    }

    pub(crate) fn deliver(&mut self, delivered: Delivered) -> SlotOutcome {
        let typ = delivered.handshake.handshake_header.handshake_type;

        if !self.rules.iter().any(|rule| rule.typ == typ) {
            return SlotOutcome::Unexpected;
        }
        if self.filled.contains_key(&typ) {
            return SlotOutcome::Duplicate;
        }

        self.filled.insert(typ, delivered);
        SlotOutcome::Stored
    }

    pub(crate) fn is_ready(&self) -> bool {
        if self.filled.is_empty() {
            return false;
        }

        for rule in &self.rules {
            if rule.policy == SlotPolicy::Trigger && self.filled.contains_key(&rule.typ) {
                return true;
            }
        }

        for rule in &self.rules {
            let required = match rule.policy {
                SlotPolicy::Required => true,
                SlotPolicy::Optional | SlotPolicy::Trigger => false,
                SlotPolicy::RequiredWithClientCert => self.has_nonempty_certificate(),
            };
            if required && !self.filled.contains_key(&rule.typ) {
                return false;
            }
        }

        true
    }

    pub(crate) fn has(&self, typ: HandshakeType) -> bool {
        self.filled.contains_key(&typ)
    }

    pub(crate) fn get(&self, typ: HandshakeType) -> Option<&Delivered> {
        self.filled.get(&typ)
    }

    // Filled slots in wire order.
    pub(crate) fn sorted(&self) -> Vec<&Delivered> {
        let mut out: Vec<&Delivered> = self.filled.values().collect();
        out.sort_by_key(|d| d.handshake.handshake_header.message_sequence);
        out
    }

    pub(crate) fn client_hello(&self) -> Option<&HandshakeMessageClientHello> {
        match self
            .filled
            .get(&HandshakeType::ClientHello)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::ClientHello(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn server_hello(&self) -> Option<&HandshakeMessageServerHello> {
        match self
            .filled
            .get(&HandshakeType::ServerHello)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::ServerHello(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn hello_verify_request(&self) -> Option<&HandshakeMessageHelloVerifyRequest> {
        match self
            .filled
            .get(&HandshakeType::HelloVerifyRequest)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::HelloVerifyRequest(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn certificate(&self) -> Option<&HandshakeMessageCertificate> {
        match self
            .filled
            .get(&HandshakeType::Certificate)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::Certificate(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn server_key_exchange(&self) -> Option<&HandshakeMessageServerKeyExchange> {
        match self
            .filled
            .get(&HandshakeType::ServerKeyExchange)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::ServerKeyExchange(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn certificate_verify(&self) -> Option<&HandshakeMessageCertificateVerify> {
        match self
            .filled
            .get(&HandshakeType::CertificateVerify)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::CertificateVerify(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn client_key_exchange(&self) -> Option<&HandshakeMessageClientKeyExchange> {
        match self
            .filled
            .get(&HandshakeType::ClientKeyExchange)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::ClientKeyExchange(msg)) => Some(msg),
            _ => None,
        }
    }

    pub(crate) fn finished(&self) -> Option<&HandshakeMessageFinished> {
        match self
            .filled
            .get(&HandshakeType::Finished)
            .map(|d| &d.handshake.handshake_message)
        {
            Some(HandshakeMessage::Finished(msg)) => Some(msg),
            _ => None,
        }
    }

    fn has_nonempty_certificate(&self) -> bool {
        match self.filled.get(&HandshakeType::Certificate) {
            Some(delivered) => match &delivered.handshake.handshake_message {
                HandshakeMessage::Certificate(certificate) => {
                    !certificate.certificate.is_empty()
                }
                _ => false,
            },
            None => false,
        }
    }
}
