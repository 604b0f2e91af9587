use super::*;
use crate::prf::MASTER_SECRET_LENGTH;

#[test]
fn test_snapshot_preserves_wire_order() {
    let mut transcript = Transcript::new();

    transcript.append(HandshakeType::ClientHello, true, 0, vec![0x01, 0x02]);
    transcript.append(HandshakeType::ServerHello, false, 0, vec![0x03]);
    transcript.append(HandshakeType::ServerHelloDone, false, 1, vec![0x04, 0x05]);

    assert_eq!(transcript.snapshot(), vec![0x01, 0x02, 0x03, 0x04, 0x05]);
    assert_eq!(transcript.len(), 3);
}

#[test]
fn test_cookie_restart_replaces_in_place() {
    let mut transcript = Transcript::new();

    transcript.append(HandshakeType::ClientHello, true, 0, vec![0x01]);
    transcript.append(HandshakeType::ServerHello, false, 0, vec![0x02]);

    // resent ClientHello after a fresh HelloVerifyRequest reuses seq 0
    transcript.append(HandshakeType::ClientHello, true, 0, vec![0x0a, 0x0b]);

    assert_eq!(transcript.len(), 2, "replacement, not duplication");
    assert_eq!(transcript.snapshot(), vec![0x0a, 0x0b, 0x02]);
}

#[test]
fn test_same_sequence_different_sender_kept() {
    let mut transcript = Transcript::new();

    transcript.append(HandshakeType::ClientHello, true, 0, vec![0x01]);
    transcript.append(HandshakeType::ServerHello, false, 0, vec![0x02]);

    assert_eq!(transcript.len(), 2);
}

#[test]
fn test_finished_mac_depends_on_role_and_content() -> Result<()> {
    let master = vec![0x5a; MASTER_SECRET_LENGTH];

    let mut transcript = Transcript::new();
    transcript.append(HandshakeType::ClientHello, true, 0, vec![0x01, 0x02, 0x03]);

    let client_tag = transcript.finished_mac(true, &master, CipherSuiteHash::Sha256)?;
    let server_tag = transcript.finished_mac(false, &master, CipherSuiteHash::Sha256)?;
    assert_eq!(client_tag.len(), 12);
    assert_ne!(client_tag, server_tag);

    transcript.append(HandshakeType::Finished, true, 1, client_tag.clone());
    let after = transcript.finished_mac(true, &master, CipherSuiteHash::Sha256)?;
    assert_ne!(
        client_tag, after,
        "appending the Finished itself must change later tags"
    );

    Ok(())
}
