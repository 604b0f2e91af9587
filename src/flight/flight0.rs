use std::fmt;

use super::flight2::*;
use super::slots::*;
use super::*;
use crate::error::Error;

// Server start state: nothing on the wire yet, waiting for the first
// ClientHello. That hello and our HelloVerifyRequest answer stay out of
// the transcript; the cookie exchange is stateless by design.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight0;

impl fmt::Display for Flight0 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 0")
    }
}

impl Flight for Flight0 {
    fn has_retransmit(&self) -> bool {
        false
    }

    fn generate(
        &self,
        state: &mut State,
        _transcript: &mut Transcript,
        _cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>> {
        state.local_random.populate();

        Ok(vec![])
    }

    fn expected_slots(&self, _state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        FlightSlots::new(vec![SlotRule {
            typ: HandshakeType::ClientHello,
            policy: SlotPolicy::Required,
        }])
    }

    fn process(
        &self,
        _state: &mut State,
        _transcript: &mut Transcript,
        slots: &FlightSlots,
        _cfg: &HandshakeConfig,
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

        Ok(Transition::Next(Box::new(Flight2 {})))
    }
}
