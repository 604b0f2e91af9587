use std::sync::Arc;

use super::*;

#[test]
fn test_x25519_shared_secret_agreement() -> Result<()> {
    let mut client = EcdheX25519KeyAgreement::new();
    let mut server = EcdheX25519KeyAgreement::new();

    let client_params = client.generate_client_params()?;
    let server_params = server.generate_server_params()?;
    assert_eq!(client_params.len(), X25519_PUBLIC_KEY_LENGTH);
    assert_eq!(server_params.len(), X25519_PUBLIC_KEY_LENGTH);

    let client_premaster = client.process_peer_params(&server_params)?;
    let server_premaster = server.process_peer_params(&client_params)?;
    assert_eq!(client_premaster, server_premaster);
    assert!(!client_premaster.is_empty());

    Ok(())
}

#[test]
fn test_x25519_rejects_malformed_peer_params() -> Result<()> {
    let mut agreement = EcdheX25519KeyAgreement::new();
    agreement.generate_client_params()?;

    assert_eq!(
        agreement.process_peer_params(&[0u8; 16]),
        Err(Error::ErrKeyExchangeParamsRejected)
    );

    Ok(())
}

#[test]
fn test_x25519_secret_is_single_use() -> Result<()> {
    let mut agreement = EcdheX25519KeyAgreement::new();
    agreement.generate_client_params()?;

    let peer = [0x42u8; X25519_PUBLIC_KEY_LENGTH];
    agreement.process_peer_params(&peer)?;
    assert_eq!(
        agreement.process_peer_params(&peer),
        Err(Error::ErrKeyAgreementUnset)
    );

    Ok(())
}

#[test]
fn test_psk_identity_round_trip() -> Result<()> {
    let psk = vec![0x01, 0x02, 0x03, 0x04];
    let callback: PskCallback = {
        let psk = psk.clone();
        Arc::new(move |_hint: &[u8]| Ok(psk.clone()))
    };

    let mut client = PskKeyAgreement::new(callback.clone(), b"ident".to_vec());
    let mut server = PskKeyAgreement::new(callback, vec![]);

    let client_params = client.generate_client_params()?;
    assert_eq!(client_params, vec![0x00, 0x05, b'i', b'd', b'e', b'n', b't']);

    let server_premaster = server.process_peer_params(&client_params)?;
    let client_premaster = client.process_peer_params(&[])?;
    assert_eq!(server_premaster, client_premaster);
    assert_eq!(server_premaster, prf_psk_pre_master_secret(&psk));

    Ok(())
}

#[test]
fn test_psk_rejects_truncated_identity() {
    let callback: PskCallback = Arc::new(|_hint: &[u8]| Ok(vec![0xff]));
    let mut server = PskKeyAgreement::new(callback, vec![]);

    assert_eq!(
        server.process_peer_params(&[0x00, 0x08, 0x01]),
        Err(Error::ErrKeyExchangeParamsRejected)
    );
}
