pub(crate) mod flight0;
pub(crate) mod flight1;
pub(crate) mod flight2;
pub(crate) mod flight3;
pub(crate) mod flight4;
pub(crate) mod flight5;
pub(crate) mod flight6;
pub(crate) mod slots;

use std::fmt;
use std::io::BufWriter;

use crate::alert::*;
use crate::config::*;
use crate::content::*;
use crate::error::Error;
use crate::handshake::*;
use crate::state::*;
use crate::transcript::*;

use slots::FlightSlots;

/*
  DTLS messages are grouped into a series of message flights. Although
  each flight may consist of a number of messages, they should be viewed
  as monolithic for the purpose of timeout and retransmission.
  https://tools.ietf.org/html/rfc6347#section-4.2.4

  Client                                          Server
  ------                                          ------
                                      Waiting                 Flight 0

  ClientHello             -------->                           Flight 1

                          <-------    HelloVerifyRequest      Flight 2

  ClientHello             -------->                           Flight 3

                                             ServerHello    \
                                            Certificate*     \
                                      ServerKeyExchange*      Flight 4
                                     CertificateRequest*     /
                          <--------      ServerHelloDone    /

  Certificate*                                              \
  ClientKeyExchange                                          \
  CertificateVerify*                                          Flight 5
  [ChangeCipherSpec]                                         /
  Finished                -------->                         /

                                      [ChangeCipherSpec]    \ Flight 6
                          <--------             Finished    /
*/

#[derive(Clone, Debug)]
pub(crate) struct Packet {
    pub(crate) content: Content,
}

// What a completed inbound flight resolves to.
pub(crate) enum Transition {
    Next(Box<dyn Flight + Send + Sync>),
    Done,
}

pub(crate) type FlightResult<T> = std::result::Result<T, (Option<Alert>, Option<Error>)>;

pub(crate) trait Flight: fmt::Display + fmt::Debug {
    fn is_last_send_flight(&self) -> bool {
        false
    }
    fn has_retransmit(&self) -> bool {
        true
    }
    // The cookie exchange re-anchors the receive sequence space at zero.
    fn resets_receive_sequence(&self) -> bool {
        false
    }

    // Build this flight's outbound messages: sequence them, record them
    // in the transcript where they belong there, and hand back the
    // packets in send order.
    fn generate(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Vec<Packet>>;

    // The slot table for the peer flight this flight waits on.
    fn expected_slots(&self, state: &State, cfg: &HandshakeConfig) -> FlightSlots;

    // Consume a completed peer flight and pick the next flight.
    fn process(
        &self,
        state: &mut State,
        transcript: &mut Transcript,
        slots: &FlightSlots,
        cfg: &HandshakeConfig,
    ) -> FlightResult<Transition>;
}

pub(crate) fn fatal(description: AlertDescription, err: Error) -> (Option<Alert>, Option<Error>) {
    (
        Some(Alert {
            alert_level: AlertLevel::Fatal,
            alert_description: description,
        }),
        Some(err),
    )
}

// Sequence a handshake message, push its canonical bytes into the
// transcript unless the message is part of the cookie exchange, and wrap
// it for the wire.
pub(crate) fn build_handshake_packet(
    state: &mut State,
    transcript: &mut Transcript,
    message: HandshakeMessage,
    record_in_transcript: bool,
) -> FlightResult<Packet> {
    let mut handshake = Handshake::new(message);
    handshake.handshake_header.message_sequence = state.next_send_sequence();

    if record_in_transcript {
        let mut raw = vec![];
        {
            let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
            if let Err(err) = handshake.marshal(&mut writer) {
                return Err(fatal(AlertDescription::InternalError, err));
            }
        }
        transcript.append(
            handshake.handshake_header.handshake_type,
            state.is_client,
            handshake.handshake_header.message_sequence,
            raw,
        );
    }

    Ok(Packet {
        content: Content::Handshake(handshake),
    })
}
