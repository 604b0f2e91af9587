use std::io::{Read, Write};

use super::*;

// Empty body; it only marks the end of the server's flight.
// https://tools.ietf.org/html/rfc5246#section-7.4.5
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageServerHelloDone;

impl HandshakeMessageServerHelloDone {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::ServerHelloDone
    }

    pub fn size(&self) -> usize {
        0
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(_reader: &mut R) -> Result<Self> {
        Ok(HandshakeMessageServerHelloDone {})
    }
}
