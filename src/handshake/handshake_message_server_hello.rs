use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::*;
use crate::cipher_suite::CipherSuiteId;

// The ServerHello pins the negotiated protocol version, cipher suite and
// server random for the rest of the handshake.
// https://tools.ietf.org/html/rfc5246#section-7.4.1.3
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageServerHello {
    pub(crate) version: ProtocolVersion,
    pub(crate) random: HandshakeRandom,
    pub(crate) session_id: Vec<u8>,
    pub(crate) cipher_suite: CipherSuiteId,
}

impl HandshakeMessageServerHello {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::ServerHello
    }

    pub fn size(&self) -> usize {
        2 + HANDSHAKE_RANDOM_LENGTH + 1 + self.session_id.len() + 2 + 1
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.version.major)?;
        writer.write_u8(self.version.minor)?;
        writer.write_all(&self.random.marshal_fixed())?;

        writer.write_u8(self.session_id.len() as u8)?;
        writer.write_all(&self.session_id)?;

        writer.write_u16::<BigEndian>(self.cipher_suite as u16)?;

        // null compression method
        writer.write_u8(0)?;

        Ok(writer.flush()?)
    }

    pub fn unmarshal<R: Read>(reader: &mut R) -> Result<Self> {
        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;

        let mut random_raw = [0u8; HANDSHAKE_RANDOM_LENGTH];
        reader.read_exact(&mut random_raw)?;
        let random = HandshakeRandom::unmarshal_fixed(&random_raw);

        let session_id_len = reader.read_u8()? as usize;
        let mut session_id = vec![0u8; session_id_len];
        reader.read_exact(&mut session_id)?;

        let cipher_suite = reader.read_u16::<BigEndian>()?.into();

        let _compression_method = reader.read_u8()?;

        Ok(HandshakeMessageServerHello {
            version: ProtocolVersion { major, minor },
            random,
            session_id,
            cipher_suite,
        })
    }
}
