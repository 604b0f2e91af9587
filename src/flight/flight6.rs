use std::fmt;

use super::slots::*;
use super::*;
use crate::change_cipher_spec::ChangeCipherSpec;
use crate::error::Error;
use crate::handshake::handshake_message_finished::*;

// Server closing flight: ChangeCipherSpec plus Finished, nothing left to
// wait for.
#[derive(Debug, PartialEq)]
pub(crate) struct Flight6;

impl fmt::Display for Flight6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flight 6")
    }
}

impl Flight for Flight6 {
    fn is_last_send_flight(&self) -> bool {
        true
    }

    fn generate(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        _cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>> {
        let suite = match state.cipher_suite {
            Some(suite) => suite,
            None => {
                return Err(fatal(
                    AlertDescription::InternalError,
                    Error::ErrCipherSuiteUnset,
                ))
            }
        };

        let mut pkts = vec![Packet {
            content: Content::ChangeCipherSpec(ChangeCipherSpec {}),
        }];

        let verify_data =
            match transcript.finished_mac(false, &state.master_secret, suite.hash_func()) {
                Ok(verify_data) => verify_data,
                Err(err) => return Err(fatal(AlertDescription::InternalError, err)),
            };
        let packet = build_handshake_packet(
            state,
            transcript,
            HandshakeMessage::Finished(HandshakeMessageFinished { verify_data }),
            true,
        )?;
        pkts.push(packet);

        Ok(pkts)
    }

    fn expected_slots(&self, _state: &State, _cfg: &HandshakeConfig) -> FlightSlots {
        FlightSlots::empty()
    }

    fn process(
        &self,
        _state: &mut State,
        _transcript: &mut Transcript,
        _slots: &FlightSlots,
        _cfg: &HandshakeConfig,
    ) -> FlightResult<Transition> {
        Ok(Transition::Done)
    }
}
