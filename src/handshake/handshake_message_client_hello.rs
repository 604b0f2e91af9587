use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use super::*;
use crate::cipher_suite::CipherSuiteId;

// The ClientHello opens the handshake. It is sent twice: once without a
// cookie and once echoing the cookie from the HelloVerifyRequest. Only
// the second one enters the transcript.
// https://tools.ietf.org/html/rfc6347#section-4.2.1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessageClientHello {
    pub(crate) version: ProtocolVersion,
    pub(crate) random: HandshakeRandom,
    pub(crate) session_id: Vec<u8>,
    pub(crate) cookie: Vec<u8>,
    pub(crate) cipher_suites: Vec<CipherSuiteId>,
}

const MAX_SESSION_ID_LENGTH: usize = 32;

impl HandshakeMessageClientHello {
    pub fn handshake_type(&self) -> HandshakeType {
        HandshakeType::ClientHello
    }

    pub fn size(&self) -> usize {
        2 + HANDSHAKE_RANDOM_LENGTH
            + 1
            + self.session_id.len()
            + 1
            + self.cookie.len()
            + 2
            + 2 * self.cipher_suites.len()
            + 2
    }

    pub fn marshal<W: Write>(&self, writer: &mut W) -> Result<()> {
        if self.session_id.len() > MAX_SESSION_ID_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        if self.cookie.len() > 255 {
            return Err(Error::ErrCookieTooLong);
        }

        writer.write_u8(self.version.major)?;
        writer.write_u8(self.version.minor)?;
        writer.write_all(&self.random.marshal_fixed())?;

        writer.write_u8(self.session_id.len() as u8)?;
        writer.write_all(&self.session_id)?;

        writer.write_u8(self.cookie.len() as u8)?;
        writer.write_all(&self.cookie)?;

        writer.write_u16::<BigEndian>(2 * self.cipher_suites.len() as u16)?;
        for suite in &self.cipher_suites {
            writer.write_u16::<BigEndian>(*suite as u16)?;
        }

        // compression_methods: the null method only
        writer.write_u8(1)?;
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
        if session_id_len > MAX_SESSION_ID_LENGTH {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut session_id = vec![0u8; session_id_len];
        reader.read_exact(&mut session_id)?;

        let cookie_len = reader.read_u8()? as usize;
        let mut cookie = vec![0u8; cookie_len];
        reader.read_exact(&mut cookie)?;

        let cipher_suites_len = reader.read_u16::<BigEndian>()? as usize;
        if cipher_suites_len % 2 != 0 {
            return Err(Error::ErrBufferTooSmall);
        }
        let mut cipher_suites = Vec::with_capacity(cipher_suites_len / 2);
        for _ in 0..cipher_suites_len / 2 {
            cipher_suites.push(reader.read_u16::<BigEndian>()?.into());
        }

        let compression_len = reader.read_u8()? as usize;
        let mut compression_methods = vec![0u8; compression_len];
        reader.read_exact(&mut compression_methods)?;

        Ok(HandshakeMessageClientHello {
            version: ProtocolVersion { major, minor },
            random,
            session_id,
            cookie,
            cipher_suites,
        })
    }
}
