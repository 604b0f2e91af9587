use std::io::{Read, Write};

use super::*;

// Certificate type and signature scheme negotiation is outside this
// engine; the body is carried verbatim.
// https://tools.ietf.org/html/rfc5246#section-7.4.4
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageCertificateRequest {
    pub(crate) body: Vec<u8>,
}

// certificate_types {ecdsa_sign, rsa_sign}, no distinguished names
pub(crate) const DEFAULT_CERTIFICATE_REQUEST_BODY: &[u8] = &[0x02, 0x40, 0x01, 0x00, 0x00];

impl HandshakeMessageCertificateRequest {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::CertificateRequest
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.body)?;

        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> Result<Self> {
        let mut body = vec![];
        reader.read_to_end(&mut body)?;

        Ok(HandshakeMessageCertificateRequest { body })
    }
}
