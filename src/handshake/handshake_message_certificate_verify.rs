use std::io::{Read, Write};

use super::*;

// An opaque signature over the transcript, produced by the injected
// TranscriptSigner and checked (if at all) by the injected verifier.
// https://tools.ietf.org/html/rfc5246#section-7.4.8
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageCertificateVerify {
    pub(crate) signature: Vec<u8>,
}

impl HandshakeMessageCertificateVerify {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::CertificateVerify
    }

    pub fn size(&self) -> usize {
        self.signature.len()
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.signature)?;

        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> Result<Self> {
        let mut signature = vec![];
        reader.read_to_end(&mut signature)?;

        Ok(HandshakeMessageCertificateVerify { signature })
    }
}
