use std::fmt;

use super::flight3::*;
use super::slots::*;
use super::*;
use crate::error::Error;
use crate::handshake::handshake_message_client_hello::*;

// Client start state: send the cookie-less ClientHello and wait for the
// HelloVerifyRequest. Neither message counts towards the transcript.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight1;

impl fmt::Display for Flight1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 1")
    }
}

impl Flight for Flight1 {
    fn generate(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>> {
        state.local_random.populate();
        state.cookie = vec![];

        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::ClientHello(HandshakeMessageClientHello {
                version: PROTOCOL_VERSION1_2,
                random: state.local_random.clone(),
                session_id: vec![],
                cookie: vec![],
                cipher_suites: cfg.local_cipher_suites.clone(),
            }),
            false,
        )?;

        Ok(vec![packet])
    }

    fn expected_slots(&self, _state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        FlightSlots::new(vec![SlotRule {
            typ: HandshakeType::HelloVerifyRequest,
            policy: SlotPolicy::Required,
        }])
    }

    fn process(
        &self,
        state: &mut State,
        _transcript: &mut Transcript,
        slots: &FlightSlots,
        _cfg: &HandshakeConfig,
    ) -> FlightResult<Transition> {
        let hello_verify_request = match slots.hello_verify_request() {
            Some(hello_verify_request) => hello_verify_request,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrInvalidFsmTransition,
                ))
            }
        };

        // DTLS 1.2 clients must not assume that the server will use the
        // protocol version specified in the HelloVerifyRequest.
        // RFC 6347 Section 4.2.1
        if hello_verify_request.version != PROTOCOL_VERSION1_0
            && hello_verify_request.version != PROTOCOL_VERSION1_2
        {
            return Err(fatal(
                AlertDescription::ProtocolVersion,
                Error::ErrUnsupportedProtocolVersion,
            ));
        }

        state.cookie = hello_verify_request.cookie.clone();

        Ok(Transition::Next(Box::new(Flight3 {})))
    }
}
