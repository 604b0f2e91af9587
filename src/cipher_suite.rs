use std::fmt;

use crate::error::*;

// All mandatory-to-implement suites share the SHA-256 PRF.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CipherSuiteHash {
    Sha256,
}

impl CipherSuiteHash {
    pub(crate) fn size(&self) -> usize {
        match *self {
            CipherSuiteHash::Sha256 => 32,
        }
    }
}

// The suites this engine can negotiate. The record-layer ciphers behind
// them live outside the crate; what matters here is which handshake
// messages a suite implies and how much key block it needs.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum CipherSuiteId {
    TlsEcdheEcdsaWithAes128GcmSha256 = 0xc02b,
    TlsEcdheRsaWithAes128GcmSha256 = 0xc02f,
    TlsPskWithAes128GcmSha256 = 0x00a8,
    TlsPskWithAes128Ccm8 = 0xc0a8,
    Unsupported = 0x0000,
}

impl fmt::Display for CipherSuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CipherSuiteId::TlsEcdheEcdsaWithAes128GcmSha256 => {
                write!(f, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256")
            }
            CipherSuiteId::TlsEcdheRsaWithAes128GcmSha256 => {
                write!(f, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256")
            }
            CipherSuiteId::TlsPskWithAes128GcmSha256 => {
                write!(f, "TLS_PSK_WITH_AES_128_GCM_SHA256")
            }
            CipherSuiteId::TlsPskWithAes128Ccm8 => write!(f, "TLS_PSK_WITH_AES_128_CCM_8"),
            CipherSuiteId::Unsupported => write!(f, "Unsupported CipherSuite"),
        }
    }
}

impl From<u16> for CipherSuiteId {
    fn from(val: u16) -> Self {
        match val {
            0xc02b => CipherSuiteId::TlsEcdheEcdsaWithAes128GcmSha256,
            0xc02f => CipherSuiteId::TlsEcdheRsaWithAes128GcmSha256,
            0x00a8 => CipherSuiteId::TlsPskWithAes128GcmSha256,
            0xc0a8 => CipherSuiteId::TlsPskWithAes128Ccm8,
            _ => CipherSuiteId::Unsupported,
        }
    }
}

impl CipherSuiteId {
    pub fn hash_func(&self) -> CipherSuiteHash {
        CipherSuiteHash::Sha256
    }

    pub fn is_psk(&self) -> bool {
        matches!(
            *self,
            CipherSuiteId::TlsPskWithAes128GcmSha256 | CipherSuiteId::TlsPskWithAes128Ccm8
        )
    }

    // PSK suites authenticate via the key itself; the others carry a
    // certificate and ephemeral key exchange parameters.
    pub fn requires_certificate(&self) -> bool {
        !self.is_psk()
    }

    pub fn requires_server_key_exchange(&self) -> bool {
        !self.is_psk()
    }

    // Key block geometry for the record layer: (mac, key, iv) lengths.
    pub(crate) fn key_material_lengths(&self) -> (usize, usize, usize) {
        match *self {
            CipherSuiteId::TlsEcdheEcdsaWithAes128GcmSha256
            | CipherSuiteId::TlsEcdheRsaWithAes128GcmSha256
            | CipherSuiteId::TlsPskWithAes128GcmSha256
            | CipherSuiteId::TlsPskWithAes128Ccm8 => (0, 16, 4),
            CipherSuiteId::Unsupported => (0, 0, 0),
        }
    }
}

pub(crate) fn find_matching_cipher_suite(
    peer_suites: &[CipherSuiteId],
    local_suites: &[CipherSuiteId],
) -> Result<CipherSuiteId> {
    for local in local_suites {
        for peer in peer_suites {
            if peer == local && *peer != CipherSuiteId::Unsupported {
                return Ok(*peer);
            }
        }
    }

    Err(Error::ErrCipherSuiteNoIntersection)
}
