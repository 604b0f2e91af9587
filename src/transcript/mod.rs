#[cfg(test)]
mod transcript_test;

use crate::cipher_suite::CipherSuiteHash;
use crate::error::*;
use crate::handshake::HandshakeType;
use crate::prf::{prf_verify_data_client, prf_verify_data_server};

#[derive(Clone, Debug)]
struct TranscriptItem {
    typ: HandshakeType,
    is_client: bool,
    message_sequence: u16,
    data: Vec<u8>,
}

// Append-only record of the canonical bytes of every handshake message
// that counts, in wire order, feeding the Finished PRF. The first
// ClientHello and the HelloVerifyRequest never enter; the cookie-bearing
// ClientHello is the first item.
//
// A repeated (sequence, sender) pair replaces the previous item: after a
// cookie restart the resent ClientHello reuses sequence zero and only
// the final bytes may count.
#[derive(Clone, Default)]
pub(crate) struct Transcript {
    items: Vec<TranscriptItem>,
}

impl Transcript {
    pub(crate) fn new() -> Self {
        Transcript { items: vec![] }
    }

    pub(crate) fn append(
        &mut self,
        typ: HandshakeType,
        is_client: bool,
        message_sequence: u16,
        data: Vec<u8>,
    ) {
        for item in &mut self.items {
            if item.message_sequence == message_sequence && item.is_client == is_client {
                item.typ = typ;
                item.data = data;
                return;
            }
        }

        self.items.push(TranscriptItem {
            typ,
            is_client,
            message_sequence,
            data,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<u8> {
        let mut merged = vec![];
        for item in &self.items {
            merged.extend_from_slice(&item.data);
        }
        merged
    }

    // The 12-byte Finished tag for the given sender role over the
    // transcript as it currently stands.
    pub(crate) fn finished_mac(
        &self,
        client_label: bool,
        master_secret: &[u8],
        h: CipherSuiteHash,
    ) -> Result<Vec<u8>> {
        let merged = self.snapshot();
        if client_label {
            prf_verify_data_client(master_secret, &merged, h)
        } else {
            prf_verify_data_server(master_secret, &merged, h)
        }
    }

    #[cfg(test)]
    pub(crate) fn types(&self) -> Vec<HandshakeType> {
        self.items.iter().map(|item| item.typ).collect()
    }
}
