use std::fmt;

use super::flight5::*;
use super::slots::*;
use super::*;
use crate::error::Error;
use crate::handshake::handshake_message_client_hello::*;

// Client cookie echo: resend the ClientHello carrying the cookie, then
// collect the server's whole flight 4. Entering this flight re-anchors
// both sequence spaces at zero, matching the server's reset after its
// stateless HelloVerifyRequest.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight3;

impl fmt::Display for Flight3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 3")
    }
}

impl Flight for Flight3 {
    fn resets_receive_sequence(&self) -> bool {
        true
    }

    fn generate(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>> {
        state.handshake_send_sequence = 0;

        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::ClientHello(HandshakeMessageClientHello {
                version: PROTOCOL_VERSION1_2,
                random: state.local_random.clone(),
                session_id: vec![],
                cookie: state.cookie.clone(),
                cipher_suites: cfg.local_cipher_suites.clone(),
            }),
            true,
        )?;

        Ok(vec![packet])
    }

    fn expected_slots(&self, _state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        FlightSlots::new(vec![
            // servers may answer with another cookie; that restarts us
            SlotRule {
                typ: HandshakeType::HelloVerifyRequest,
                policy: SlotPolicy::Trigger,
            },
            SlotRule {
                typ: HandshakeType::ServerHello,
                policy: SlotPolicy::Required,
            },
            SlotRule {
                typ: HandshakeType::Certificate,
                policy: SlotPolicy::Optional,
            },
            SlotRule {
                typ: HandshakeType::ServerKeyExchange,
                policy: SlotPolicy::Optional,
            },
            SlotRule {
                typ: HandshakeType::CertificateRequest,
                policy: SlotPolicy::Optional,
            },
            SlotRule {
                typ: HandshakeType::ServerHelloDone,
                policy: SlotPolicy::Required,
            },
        ])
    }

    fn process(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        slots: &FlightSlots,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Transition> {
        // Clients may receive multiple HelloVerifyRequest messages with
        // different cookies and answer each with a fresh ClientHello.
        // RFC 6347 Section 4.2.1
        if let Some(hello_verify_request) = slots.hello_verify_request() {
            if hello_verify_request.version != PROTOCOL_VERSION1_0
                && hello_verify_request.version != PROTOCOL_VERSION1_2
            {
                return Err(fatal(
                    AlertDescription::ProtocolVersion,
                    Error::ErrUnsupportedProtocolVersion,
                ));
            }

            state.cookie = hello_verify_request.cookie.clone();
            return Ok(Transition::Next(Box::new(Flight3 {})));
        }

        let server_hello = match slots.server_hello() {
            Some(server_hello) => server_hello,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };

        if server_hello.version != PROTOCOL_VERSION1_2 {
            return Err(fatal(
                AlertDescription::ProtocolVersion,
                Error::ErrUnsupportedProtocolVersion,
            ));
        }

        let suite = server_hello.cipher_suite;
        if !cfg.local_cipher_suites.contains(&suite) {
            return Err(fatal(
                AlertDescription::HandshakeFailure,
                Error::ErrCipherSuiteNoIntersection,
            ));
        }
        log::debug!(
            "[handshake:{}] use cipher suite: {}",
            srv_cli_str(state.is_client),
            suite
        );

        state.cipher_suite = Some(suite);
        state.remote_random = server_hello.random.clone();
        state.session_id = server_hello.session_id.clone();

        match slots.certificate() {
            Some(certificate) => {
                if !suite.requires_certificate() {
                    return Err(fatal(
                        AlertDescription::UnexpectedMessage,
                        Error::ErrUnexpectedHandshakeMessage(HandshakeType::Certificate),
                    ));
                }
                state.peer_certificates = certificate.certificate.clone();
            }
            None => {
                if suite.requires_certificate() {
                    return Err(fatal(
                        AlertDescription::HandshakeFailure,
                        Error::ErrMissingHandshakeMessage(HandshakeType::Certificate),
                    ));
                }
            }
        }

        match slots.server_key_exchange() {
            Some(server_key_exchange) => {
                state.remote_key_params = server_key_exchange.params.clone();
            }
            None => {
                if suite.requires_server_key_exchange() {
                    return Err(fatal(
                        AlertDescription::HandshakeFailure,
                        Error::ErrMissingHandshakeMessage(HandshakeType::ServerKeyExchange),
                    ));
                }
                state.remote_key_params = vec![];
            }
        }

        state.remote_requested_certificate = slots.has(HandshakeType::CertificateRequest);

        // the whole flight enters the transcript in wire order
        for delivered in slots.sorted() {
            transcript.append(
                delivered.handshake.handshake_header.handshake_type,
                false,
                delivered.handshake.handshake_header.message_sequence,
                delivered.raw.clone(),
            );
        }

        Ok(Transition::Next(Box::new(Flight5 {})))
    }
}
