use std::net::SocketAddr;
use std::sync::Arc;

use tokio::time::Duration;

use crate::cipher_suite::CipherSuiteId;
use crate::cookie::CookieGenerator;
use crate::crypto::{PskCallback, TranscriptSigner, VerifyTranscriptSignatureFn};

pub(crate) const DEFAULT_RETRANSMIT_INTERVAL: Duration = Duration::from_secs(1);
pub(crate) const MAX_RETRANSMIT_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_MAX_RETRANSMITS: usize = 6;
pub(crate) const DEFAULT_MTU: usize = 1200; // bytes

// Whether a server asks the client for a certificate, and how hard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ClientAuthType {
    #[default]
    NoClientCert,
    RequestClientCert,
    RequireAnyClientCert,
}

// Opt-in receiver for CLIENT_RANDOM / SERVER_RANDOM style key material
// lines. Nothing is written anywhere unless the caller injects a sink.
pub trait KeyLogSink: Send + Sync {
    fn log_master_secret(&self, is_server: bool, random: &[u8], master_secret: &[u8]);
}

pub struct HandshakeConfig {
    // Cipher suites offered (client) or accepted (server), preference
    // order.
    pub local_cipher_suites: Vec<CipherSuiteId>,
    // Our certificate chain, leaf first, as opaque DER blobs.
    pub local_certificates: Vec<Vec<u8>>,
    // Server-side policy towards client certificates.
    pub client_auth: ClientAuthType,
    // Signs the transcript when the server requests client auth.
    pub transcript_signer: Option<Arc<dyn TranscriptSigner>>,
    // Server-side CertificateVerify check; None accepts any signature.
    pub verify_transcript_signature: Option<VerifyTranscriptSignatureFn>,
    // PSK suites: identity-to-key resolution and our own identity.
    pub psk_callback: Option<PskCallback>,
    pub psk_identity: Vec<u8>,
    // Initial retransmit timeout; doubles per retry up to 60s.
    pub retransmit_interval: Duration,
    pub max_retransmits: usize,
    pub mtu: usize,
    // How long the sender of the final flight stays around to answer
    // retransmissions of the peer's last flight. Zero returns at once.
    pub final_flight_linger: Duration,
    pub key_log: Option<Arc<dyn KeyLogSink>>,

    pub(crate) cookie_generator: Option<Arc<CookieGenerator>>,
    pub(crate) peer_addr: Option<SocketAddr>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            local_cipher_suites: vec![
                CipherSuiteId::TlsEcdheEcdsaWithAes128GcmSha256,
                CipherSuiteId::TlsEcdheRsaWithAes128GcmSha256,
            ],
            local_certificates: vec![],
            client_auth: ClientAuthType::NoClientCert,
            transcript_signer: None,
            verify_transcript_signature: None,
            psk_callback: None,
            psk_identity: vec![],
            retransmit_interval: DEFAULT_RETRANSMIT_INTERVAL,
            max_retransmits: DEFAULT_MAX_RETRANSMITS,
            mtu: DEFAULT_MTU,
            final_flight_linger: Duration::from_secs(0),
            key_log: None,
            cookie_generator: None,
            peer_addr: None,
        }
    }
}

pub(crate) fn srv_cli_str(is_client: bool) -> String {
    if is_client {
        return "client".to_owned();
    }
    "server".to_owned()
}
