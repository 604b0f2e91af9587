use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::*;

// A chain of opaque DER blobs, sender's certificate first. Validation of
// the chain is the caller's business; this crate only transports it.
// https://tools.ietf.org/html/rfc5246#section-7.4.2
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageCertificate {
    pub(crate) certificate: Vec<Vec<u8>>,
}

impl HandshakeMessageCertificate {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::Certificate
    }

    pub fn size(&self) -> usize {
        3 + self.certificate.iter().map(|c| 3 + c.len()).sum::<usize>()
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        let payload_size: usize = self.certificate.iter().map(|c| 3 + c.len()).sum();

        writer.write_u24::<BigEndian>(payload_size as u32)?;
        for cert in &self.certificate {
            writer.write_u24::<BigEndian>(cert.len() as u32)?;
            writer.write_all(cert)?;
        }

        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> Result<Self> {
        let mut payload_size = reader.read_u24::<BigEndian>()? as usize;

        let mut certificate = vec![];
        while payload_size > 0 {
            let cert_len = reader.read_u24::<BigEndian>()? as usize;
            if 3 + cert_len > payload_size {
                return Err(Error::ErrBufferTooSmall);
            }

            let mut cert = vec![0u8; cert_len];
            reader.read_exact(&mut cert)?;
            certificate.push(cert);

            payload_size -= 3 + cert_len;
        }

        Ok(HandshakeMessageCertificate { certificate })
    }
}
