use std::io::{Read, Write};

use super::*;

// Key exchange parameters are opaque to the handshake engine; the
// negotiated KeyAgreement produces and consumes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageServerKeyExchange {
    pub(crate) params: Vec<u8>,
}

impl HandshakeMessageServerKeyExchange {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::ServerKeyExchange
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

        Ok(HandshakeMessageServerKeyExchange { params })
    }
}
