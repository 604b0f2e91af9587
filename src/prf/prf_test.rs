use super::*;

#[test]
fn test_psk_pre_master_secret_layout() {
    let psk = vec![0xaa, 0xbb, 0xcc];
    let out = prf_psk_pre_master_secret(&psk);

    // uint16 N | N zero octets | uint16 N | PSK
    assert_eq!(
        out,
        vec![0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x03, 0xaa, 0xbb, 0xcc]
    );
}

#[test]
fn test_p_hash_length_and_determinism() -> Result<()> {
    let secret = b"some secret";
    let seed = b"some seed";

    for requested in [1usize, 31, 32, 33, 95, 100] {
        let out = prf_p_hash(secret, seed, requested, CipherSuiteHash::Sha256)?;
        assert_eq!(out.len(), requested);

        let again = prf_p_hash(secret, seed, requested, CipherSuiteHash::Sha256)?;
        assert_eq!(out, again, "P_hash must be deterministic");
    }

    // a longer request extends, never rewrites, the shorter one
    let short = prf_p_hash(secret, seed, 16, CipherSuiteHash::Sha256)?;
    let long = prf_p_hash(secret, seed, 64, CipherSuiteHash::Sha256)?;
    assert_eq!(short, long[..16]);

    Ok(())
}

#[test]
fn test_master_secret_is_48_bytes() -> Result<()> {
    let pre_master = vec![0x11; 32];
    let client_random = vec![0x22; 32];
    let server_random = vec![0x33; 32];

    let master = prf_master_secret(
        &pre_master,
        &client_random,
        &server_random,
        CipherSuiteHash::Sha256,
    )?;
    assert_eq!(master.len(), MASTER_SECRET_LENGTH);

    // randoms are part of the seed
    let other = prf_master_secret(
        &pre_master,
        &server_random,
        &client_random,
        CipherSuiteHash::Sha256,
    )?;
    assert_ne!(master, other);

    Ok(())
}

#[test]
fn test_verify_data_labels_diverge() -> Result<()> {
    let master = vec![0x42; MASTER_SECRET_LENGTH];
    let transcript = b"handshake bytes".to_vec();

    let client = prf_verify_data_client(&master, &transcript, CipherSuiteHash::Sha256)?;
    let server = prf_verify_data_server(&master, &transcript, CipherSuiteHash::Sha256)?;

    assert_eq!(client.len(), VERIFY_DATA_LENGTH);
    assert_eq!(server.len(), VERIFY_DATA_LENGTH);
    assert_ne!(client, server, "role labels must separate the tags");

    Ok(())
}

#[test]
fn test_encryption_keys_geometry() -> Result<()> {
    let master = vec![0x42; MASTER_SECRET_LENGTH];
    let client_random = vec![0x01; 32];
    let server_random = vec![0x02; 32];

    let keys = prf_encryption_keys(
        &master,
        &client_random,
        &server_random,
        0,
        16,
        4,
        CipherSuiteHash::Sha256,
    )?;

    assert_eq!(keys.master_secret, master);
    assert!(keys.client_mac_key.is_empty());
    assert!(keys.server_mac_key.is_empty());
    assert_eq!(keys.client_write_key.len(), 16);
    assert_eq!(keys.server_write_key.len(), 16);
    assert_eq!(keys.client_write_iv.len(), 4);
    assert_eq!(keys.server_write_iv.len(), 4);
    assert_ne!(keys.client_write_key, keys.server_write_key);

    Ok(())
}
