use std::io::{BufReader, BufWriter, Cursor};

use super::*;
use crate::cipher_suite::CipherSuiteId;

#[test]
fn test_handshake_message() -> Result<()> {
    let raw_handshake_message = vec![
        0x01, 0x00, 0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x28, 0xfe, 0xfd, 0x66,
        0x11, 0x22, 0x33, 0x9a, 0x04, 0x5c, 0xe1, 0x7f, 0x28, 0x33, 0x40, 0x0b, 0xd6, 0xc2, 0x19,
        0x5e, 0x77, 0x08, 0xe3, 0x4d, 0x2a, 0x90, 0x1f, 0x61, 0x3b, 0xaa, 0x05, 0xc8, 0x52, 0x96,
        0x7e, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
    ];
    let want = Handshake {
        handshake_header: HandshakeHeader {
            handshake_type: HandshakeType::ClientHello,
            length: 0x28,
            message_sequence: 0,
            fragment_offset: 0,
            fragment_length: 0x28,
        },
        handshake_message: HandshakeMessage::ClientHello(HandshakeMessageClientHello {
            version: ProtocolVersion {
                major: 0xFE,
                minor: 0xFD,
            },
            random: HandshakeRandom {
                gmt_unix_time: 1712398899,
                random_bytes: [
                    0x9a, 0x04, 0x5c, 0xe1, 0x7f, 0x28, 0x33, 0x40, 0x0b, 0xd6, 0xc2, 0x19, 0x5e,
                    0x77, 0x08, 0xe3, 0x4d, 0x2a, 0x90, 0x1f, 0x61, 0x3b, 0xaa, 0x05, 0xc8, 0x52,
                    0x96, 0x7e,
                ],
            },
            session_id: vec![],
            cookie: vec![],
            cipher_suites: vec![],
        }),
    };

    let mut reader = BufReader::new(raw_handshake_message.as_slice());
    let h = Handshake::unmarshal(&mut reader)?;
    assert_eq!(
        h, want,
        "decoded ClientHello differs: got {h:?}, want {want:?}"
    );

    let mut raw = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
        h.marshal(&mut writer)?;
    }
    assert_eq!(
        raw, raw_handshake_message,
        "re-encoded ClientHello differs: got {raw:?}, want {raw_handshake_message:?}"
    );

    Ok(())
}

#[test]
fn test_handshake_header_golden() -> Result<()> {
    let header = HandshakeHeader {
        handshake_type: HandshakeType::Finished,
        length: 12,
        message_sequence: 2,
        fragment_offset: 0,
        fragment_length: 12,
    };

    let mut raw = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
        header.marshal(&mut writer)?;
    }
    assert_eq!(
        raw,
        vec![0x14, 0x00, 0x00, 0x0c, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0c]
    );
    assert_eq!(raw.len(), HANDSHAKE_HEADER_LENGTH);

    let mut reader = Cursor::new(raw.as_slice());
    assert_eq!(HandshakeHeader::unmarshal(&mut reader)?, header);

    Ok(())
}

#[test]
fn test_client_hello_with_cookie_round_trip() -> Result<()> {
    let mut random = HandshakeRandom::default();
    random.populate();

    let hello = HandshakeMessageClientHello {
        version: PROTOCOL_VERSION1_2,
        random,
        session_id: vec![],
        cookie: vec![0xDE, 0xAD, 0xBE, 0xEF],
        cipher_suites: vec![
            CipherSuiteId::TlsEcdheEcdsaWithAes128GcmSha256,
            CipherSuiteId::TlsPskWithAes128GcmSha256,
        ],
    };

    let h = Handshake::new(HandshakeMessage::ClientHello(hello));

    let mut raw = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
        h.marshal(&mut writer)?;
    }
    assert_eq!(raw.len(), h.size());

    let mut reader = BufReader::new(raw.as_slice());
    let parsed = Handshake::unmarshal(&mut reader)?;
    assert_eq!(parsed, h);

    Ok(())
}

#[test]
fn test_certificate_chain_round_trip() -> Result<()> {
    let cert = HandshakeMessageCertificate {
        certificate: vec![vec![0x30, 0x82, 0x01, 0x01], vec![0x30, 0x03, 0xff]],
    };

    let h = Handshake::new(HandshakeMessage::Certificate(cert.clone()));
    assert_eq!(
        h.handshake_header.length as usize,
        3 + (3 + 4) + (3 + 3),
        "chain length prefix accounts for every entry"
    );

    let mut raw = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
        h.marshal(&mut writer)?;
    }

    let mut reader = BufReader::new(raw.as_slice());
    let parsed = Handshake::unmarshal(&mut reader)?;
    match parsed.handshake_message {
        HandshakeMessage::Certificate(parsed_cert) => assert_eq!(parsed_cert, cert),
        other => panic!("expected Certificate, got {other:?}"),
    }

    Ok(())
}
