use std::io::{Read, Write};

use super::*;

// Mirror of ServerKeyExchange: the body is whatever blob the negotiated
// KeyAgreement emitted (an ECDHE public key, a PSK identity, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageClientKeyExchange {
    pub(crate) params: Vec<u8>,
}

impl HandshakeMessageClientKeyExchange {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::ClientKeyExchange
    }

    pub fn size(&self) -> usize {
        self.params.len()
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.params)?;

        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> Result<Self> {
        let mut params = vec![];
        reader.read_to_end(&mut params)?;

        Ok(HandshakeMessageClientKeyExchange { params })
    }
}
