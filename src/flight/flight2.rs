use std::fmt;

use super::flight4::*;
use super::slots::*;
use super::*;
use crate::cipher_suite::find_matching_cipher_suite;
use crate::error::Error;
use crate::handshake::handshake_message_hello_verify_request::*;

// Server cookie exchange: answer the first ClientHello with a stateless
// HelloVerifyRequest and wait for the hello to come back with the cookie
// echoed. Both sequence spaces re-anchor at zero here, so the returning
// ClientHello is message_seq 0 again and becomes the transcript's first
// entry once the cookie checks out.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight2;

impl fmt::Display for Flight2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 2")
    }
}

impl Flight for Flight2 {
    // The client retransmits its ClientHello when the HelloVerifyRequest
    // is lost; a timer-driven resend here would defeat statelessness.
    fn has_retransmit(&self) -> bool {
        false
    }

    fn resets_receive_sequence(&self) -> bool {
        true
    }

    fn generate(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>> {
        let (generator, peer_addr) = match (&cfg.cookie_generator, &cfg.peer_addr) {
            (Some(generator), Some(peer_addr)) => (generator, peer_addr),
            _ => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };

        state.cookie = match generator.generate(peer_addr) {
            Ok(cookie) => cookie,
            Err(err) => return Err(fatal(AlertDescription::InternalError, err)),
        };

        state.handshake_send_sequence = 0;
        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::HelloVerifyRequest(HandshakeMessageHelloVerifyRequest {
                version: PROTOCOL_VERSION1_2,
                cookie: state.cookie.clone(),
            }),
            false,
        )?;

        Ok(vec![packet])
    }

    fn expected_slots(&self, _state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        FlightSlots::new(vec![SlotRule {
            typ: HandshakeType::ClientHello,
            policy: SlotPolicy::Required,
        }])
    }

    fn process(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        slots: &FlightSlots,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Transition> {
        let client_hello = match slots.client_hello() {
            Some(client_hello) => client_hello,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };

        if client_hello.version != PROTOCOL_VERSION1_2 {
            return Err(fatal(
                AlertDescription::ProtocolVersion,
                Error::ErrUnsupportedProtocolVersion,
            ));
        }

        // The HelloVerifyRequest was lost and the client resent its
        // cookie-less hello. Send a fresh one.
        if client_hello.cookie.is_empty() {
            return Ok(Transition::Next(Box::new(Flight2 {})));
        }

        let (generator, peer_addr) = match (&cfg.cookie_generator, &cfg.peer_addr) {
            (Some(generator), Some(peer_addr)) => (generator, peer_addr),
            _ => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };
        if !generator.verify(peer_addr, &client_hello.cookie) {
            return Err(fatal(
                AlertDescription::HandshakeFailure,
                Error::ErrCookieMismatch,
            ));
        }

        state.remote_random = client_hello.random.clone();

        let suite = match find_matching_cipher_suite(
            &client_hello.cipher_suites,
            &cfg.local_cipher_suites,
        ) {
            Ok(suite) => suite,
            Err(err) => return Err(fatal(AlertDescription::HandshakeFailure, err)),
        };
        log::debug!(
            "[handshake:{}] use cipher suite: {}",
            srv_cli_str(state.is_client),
            suite
        );
        state.cipher_suite = Some(suite);

        // the cookie-bearing hello opens the transcript
        if let Some(delivered) = slots.get(HandshakeType::ClientHello) {
            transcript.append(
                HandshakeType::ClientHello,
                true,
                delivered.handshake.handshake_header.message_sequence,
                delivered.raw.clone(),
            );
        }

        Ok(Transition::Next(Box::new(Flight4 {})))
    }
}
