use zeroize::Zeroize;

use crate::cipher_suite::CipherSuiteId;
use crate::crypto::KeyAgreement;
use crate::handshake::handshake_random::*;

// Scratch state owned by one handshake, dead once the connection is
// established or torn down. Secrets are scrubbed on drop and on every
// fatal exit.
pub struct State {
    pub(crate) is_client: bool,
    pub(crate) local_random: HandshakeRandom,
    pub(crate) remote_random: HandshakeRandom,
    pub(crate) session_id: Vec<u8>,
    pub(crate) cookie: Vec<u8>,
    pub(crate) cipher_suite: Option<CipherSuiteId>,
    pub(crate) key_agreement: Option<Box<dyn KeyAgreement + Send>>,
    pub(crate) master_secret: Vec<u8>,
    pub(crate) handshake_send_sequence: u16,
    // server: we put a CertificateRequest in flight 4
    pub(crate) local_requested_certificate: bool,
    // client: the server asked us for a certificate
    pub(crate) remote_requested_certificate: bool,
    // peer key exchange params, handed to the KeyAgreement verbatim
    pub(crate) remote_key_params: Vec<u8>,
    pub(crate) peer_certificates: Vec<Vec<u8>>,
}

impl State {
    pub(crate) fn new(is_client: bool) -> Self {
        State {
            is_client,
            local_random: HandshakeRandom::default(),
            remote_random: HandshakeRandom::default(),
            session_id: vec![],
            cookie: vec![],
            cipher_suite: None,
            key_agreement: None,
            master_secret: vec![],
            handshake_send_sequence: 0,
            local_requested_certificate: false,
            remote_requested_certificate: false,
            remote_key_params: vec![],
            peer_certificates: vec![],
        }
    }

    pub(crate) fn next_send_sequence(&mut self) -> u16 {
        let sequence = self.handshake_send_sequence;
        self.handshake_send_sequence = self.handshake_send_sequence.wrapping_add(1);
        sequence
    }

    pub(crate) fn client_random(&self) -> [u8; HANDSHAKE_RANDOM_LENGTH] {
        if self.is_client {
            self.local_random.marshal_fixed()
        } else {
            self.remote_random.marshal_fixed()
        }
    }

    pub(crate) fn server_random(&self) -> [u8; HANDSHAKE_RANDOM_LENGTH] {
        if self.is_client {
            self.remote_random.marshal_fixed()
        } else {
            self.local_random.marshal_fixed()
        }
    }

    pub(crate) fn scrub_secrets(&mut self) {
        self.master_secret.zeroize();
        if let Some(key_agreement) = self.key_agreement.as_mut() {
            key_agreement.zeroize();
        }
    }
}

impl Drop for State {
    fn drop(&mut self) {
        self.scrub_secrets();
    }
}
