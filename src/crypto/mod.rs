#[cfg(test)]
mod crypto_test;

use std::sync::Arc;

use byteorder::{BigEndian, ByteOrder};
use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroize;

use crate::cipher_suite::CipherSuiteId;
use crate::error::*;
use crate::prf::prf_psk_pre_master_secret;

// Resolves a PSK identity (or identity hint) to the key itself.
pub type PskCallback = Arc<dyn (Fn(&[u8]) -> Result<Vec<u8>>) + Send + Sync>;

// Signs the running transcript for CertificateVerify. The signature
// scheme is the caller's business.
pub trait TranscriptSigner: Send + Sync {
    fn sign(&self, transcript: &[u8]) -> Result<Vec<u8>>;
}

// Checks a peer CertificateVerify signature against the transcript and
// the peer's certificate chain.
pub type VerifyTranscriptSignatureFn =
    Arc<dyn (Fn(&[u8], &[u8], &[Vec<u8>]) -> Result<()>) + Send + Sync>;

// The key exchange capability the state machine drives. Parameter blobs
// travel verbatim in ServerKeyExchange / ClientKeyExchange bodies; the
// premaster secret comes out of process_peer_params exactly once.
pub trait KeyAgreement {
    fn generate_client_params(&mut self) -> Result<Vec<u8>>;
    fn generate_server_params(&mut self) -> Result<Vec<u8>>;
    fn process_peer_params(&mut self, peer_params: &[u8]) -> Result<Vec<u8>>;
    fn zeroize(&mut self);
}

pub(crate) fn key_agreement_for_suite(
    suite: CipherSuiteId,
    psk_callback: Option<&PskCallback>,
    psk_identity: &[u8],
) -> Result<Box<dyn KeyAgreement + Send>> {
    if suite.is_psk() {
        let callback = psk_callback.ok_or(Error::ErrKeyAgreementUnset)?;
        Ok(Box::new(PskKeyAgreement::new(
            callback.clone(),
            psk_identity.to_vec(),
        )))
    } else {
        Ok(Box::new(EcdheX25519KeyAgreement::new()))
    }
}

// Ephemeral X25519. Params are the raw 32-byte public key; the secret is
// consumed by the first diffie_hellman and scrubbed on drop either way.
pub struct EcdheX25519KeyAgreement {
    secret: Option<EphemeralSecret>,
}

pub(crate) const X25519_PUBLIC_KEY_LENGTH: usize = 32;

impl EcdheX25519KeyAgreement {
    pub fn new() -> Self {
        EcdheX25519KeyAgreement { secret: None }
    }

    fn generate_params(&mut self) -> Vec<u8> {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        self.secret = Some(secret);
        public.as_bytes().to_vec()
    }
}

impl Default for EcdheX25519KeyAgreement {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyAgreement for EcdheX25519KeyAgreement {
    fn generate_client_params(&mut self) -> Result<Vec<u8>> {
        Ok(self.generate_params())
    }

    fn generate_server_params(&mut self) -> Result<Vec<u8>> {
        Ok(self.generate_params())
    }

    fn process_peer_params(&mut self, peer_params: &[u8]) -> Result<Vec<u8>> {
        if peer_params.len() != X25519_PUBLIC_KEY_LENGTH {
            return Err(Error::ErrKeyExchangeParamsRejected);
        }
        let mut public = [0u8; X25519_PUBLIC_KEY_LENGTH];
        public.copy_from_slice(peer_params);

        let secret = self.secret.take().ok_or(Error::ErrKeyAgreementUnset)?;
        let shared = secret.diffie_hellman(&PublicKey::from(public));

        Ok(shared.as_bytes().to_vec())
    }

    fn zeroize(&mut self) {
        self.secret = None;
    }
}

// RFC 4279 plain PSK: the client's params carry its identity, the
// premaster is derived from the key both sides already share.
pub struct PskKeyAgreement {
    callback: PskCallback,
    identity: Vec<u8>,
}

impl PskKeyAgreement {
    pub fn new(callback: PskCallback, identity: Vec<u8>) -> Self {
        PskKeyAgreement { callback, identity }
    }
}

impl KeyAgreement for PskKeyAgreement {
    fn generate_client_params(&mut self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; 2];
        BigEndian::write_u16(&mut out, self.identity.len() as u16);
        out.extend_from_slice(&self.identity);
        Ok(out)
    }

    fn generate_server_params(&mut self) -> Result<Vec<u8>> {
        Ok(vec![])
    }

    fn process_peer_params(&mut self, peer_params: &[u8]) -> Result<Vec<u8>> {
        let identity = if peer_params.is_empty() {
            // client side: no ServerKeyExchange for plain PSK, resolve by
            // our own identity
            self.identity.clone()
        } else {
            if peer_params.len() < 2 {
                return Err(Error::ErrKeyExchangeParamsRejected);
            }
            let identity_len = BigEndian::read_u16(&peer_params[..2]) as usize;
            if peer_params.len() != 2 + identity_len {
                return Err(Error::ErrKeyExchangeParamsRejected);
            }
            peer_params[2..].to_vec()
        };

        let mut psk = (self.callback)(&identity)?;
        let pre_master_secret = prf_psk_pre_master_secret(&psk);
        psk.zeroize();

        Ok(pre_master_secret)
    }

    fn zeroize(&mut self) {
        self.identity.zeroize();
    }
}
