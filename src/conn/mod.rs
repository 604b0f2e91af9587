#[cfg(test)]
mod conn_test;

use std::io::{BufWriter, Cursor};
use std::net::SocketAddr;
use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;

use crate::alert::*;
use crate::cipher_suite::CipherSuiteId;
use crate::config::*;
use crate::content::*;
use crate::cookie::CookieGenerator;
use crate::error::*;
use crate::flight::flight0::Flight0;
use crate::flight::flight1::Flight1;
use crate::flight::{Flight, Packet};
use crate::fragment_buffer::*;
use crate::handshake::handshake_header::*;
use crate::handshake::*;
use crate::handshaker::HandshakeFsm;
use crate::prf::{prf_encryption_keys, EncryptionKeys};
use crate::record::*;
use crate::state::State;
use crate::transcript::Transcript;

// Non-fatal events, counted rather than surfaced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeStats {
    pub dropped_fragments: u64,
    pub duplicate_messages: u64,
    pub retransmits: u64,
}

// What survives a completed handshake: the negotiated suite, the key
// block for the record layer, whatever chain the peer presented, and
// the loss counters.
pub struct HandshakeResult {
    pub cipher_suite: CipherSuiteId,
    pub keys: EncryptionKeys,
    pub peer_certificates: Vec<Vec<u8>>,
    pub stats: HandshakeStats,
}

// One connection's handshake engine. Owns the record channel and all
// per-connection scratch state; a single task drives it to completion.
pub struct HandshakeConn {
    pub(crate) channel: Box<dyn RecordLayer + Send>,
    pub(crate) cfg: HandshakeConfig,
    pub(crate) state: State,
    pub(crate) transcript: Transcript,
    pub(crate) reassembly: ReassemblyBuffer,
    pub(crate) stats: HandshakeStats,
    pub(crate) peer_ccs_seen: bool,
}

pub(crate) struct Ingest {
    pub(crate) delivered: Vec<Delivered>,
    // a fragment from an already delivered sequence number implies the
    // peer never saw our last flight
    pub(crate) stale_seen: bool,
}

impl HandshakeConn {
    pub fn client(channel: Box<dyn RecordLayer + Send>, cfg: HandshakeConfig) -> Self {
        HandshakeConn {
            channel,
            cfg,
            state: State::new(true),
            transcript: Transcript::new(),
            reassembly: ReassemblyBuffer::new(),
            stats: HandshakeStats::default(),
            peer_ccs_seen: false,
        }
    }

    pub fn server(
        channel: Box<dyn RecordLayer + Send>,
        mut cfg: HandshakeConfig,
        peer_addr: SocketAddr,
        cookie_generator: Arc<CookieGenerator>,
    ) -> Self {
        cfg.peer_addr = Some(peer_addr);
        cfg.cookie_generator = Some(cookie_generator);

        HandshakeConn {
            channel,
            cfg,
            state: State::new(false),
            transcript: Transcript::new(),
            reassembly: ReassemblyBuffer::new(),
            stats: HandshakeStats::default(),
            peer_ccs_seen: false,
        }
    }

    pub async fn handshake(&mut self) -> Result<HandshakeResult> {
        self.handshake_inner(None).await
    }

    // Like handshake, but torn down early when the sender fires. All
    // secrets are scrubbed; a best-effort user_canceled + close_notify
    // pair goes out.
    pub async fn handshake_with_cancel(
        &mut self,
        cancel_rx: mpsc::Receiver<()>,
    ) -> Result<HandshakeResult> {
        self.handshake_inner(Some(cancel_rx)).await
    }

    async fn handshake_inner(
        &mut self,
        cancel_rx: Option<mpsc::Receiver<()>>,
    ) -> Result<HandshakeResult> {
        let initial_flight: Box<dyn Flight + Send + Sync> = if self.state.is_client {
            Box::new(Flight1 {})
        } else {
            Box::new(Flight0 {})
        };

        let mut fsm = HandshakeFsm::new(initial_flight, cancel_rx);
        if let Err(err) = fsm.run(self).await {
            self.state.scrub_secrets();
            return Err(err);
        }

        let suite = self.state.cipher_suite.ok_or(Error::ErrCipherSuiteUnset)?;
        let (mac_len, key_len, iv_len) = suite.key_material_lengths();
        let keys = prf_encryption_keys(
            &self.state.master_secret,
            &self.state.client_random(),
            &self.state.server_random(),
            mac_len,
            key_len,
            iv_len,
            suite.hash_func(),
        )?;

        let mut stats = self.stats.clone();
        stats.dropped_fragments += self.reassembly.dropped_fragments();

        let result = HandshakeResult {
            cipher_suite: suite,
            keys,
            peer_certificates: self.state.peer_certificates.clone(),
            stats,
        };

        // only the derived keys survive the handshake
        self.reassembly.reset();
        self.transcript = Transcript::new();
        self.state.scrub_secrets();

        Ok(result)
    }

    pub(crate) async fn notify(
        &mut self,
        alert_level: AlertLevel,
        alert_description: AlertDescription,
    ) -> Result<()> {
        let alert = Alert {
            alert_level,
            alert_description,
        };

        let mut raw = vec![];
        {
            let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
            alert.marshal(&mut writer)?;
        }

        self.channel.send_record(ContentType::Alert, &raw).await
    }

    // Serialize a flight into individual record payloads, splitting
    // handshake messages that do not fit the MTU.
    pub(crate) fn serialize_flight(
        &self,
        pkts: &[Packet],
    ) -> Result<Vec<(ContentType, Vec<u8>)>> {
        let mut records = vec![];

        for pkt in pkts {
            match &pkt.content {
                Content::Handshake(handshake) => {
                    for fragment in fragment_handshake(self.cfg.mtu, handshake)? {
                        records.push((ContentType::Handshake, fragment));
                    }
                }
                content => {
                    let mut raw = vec![];
                    {
                        let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
                        content.marshal(&mut writer)?;
                    }
                    records.push((content.content_type(), raw));
                }
            }
        }

        Ok(records)
    }

    // Walk the handshake fragments packed back to back in one record
    // payload and feed them to the reassembly buffer. Malformed headers
    // poison the rest of the payload; the whole remainder is dropped.
    pub(crate) fn ingest_handshake(&mut self, payload: &[u8]) -> Result<Ingest> {
        let mut buf = payload;
        let mut delivered = vec![];
        let mut stale_seen = false;

        while !buf.is_empty() {
            if buf.len() < HANDSHAKE_HEADER_LENGTH {
                self.stats.dropped_fragments += 1;
                debug!("dropping truncated handshake fragment header");
                break;
            }

            let mut reader = Cursor::new(buf);
            let header = match HandshakeHeader::unmarshal(&mut reader) {
                Ok(header) => header,
                Err(err) => {
                    self.stats.dropped_fragments += 1;
                    debug!("dropping unparseable handshake fragment header: {err}");
                    break;
                }
            };

            let end = HANDSHAKE_HEADER_LENGTH + header.fragment_length as usize;
            if end > buf.len()
                || header.handshake_type == HandshakeType::Invalid
                || u64::from(header.fragment_offset) + u64::from(header.fragment_length)
                    > u64::from(header.length)
            {
                self.stats.dropped_fragments += 1;
                debug!(
                    "dropping malformed handshake fragment (type {}, window {}+{} of {})",
                    header.handshake_type,
                    header.fragment_offset,
                    header.fragment_length,
                    header.length
                );
                break;
            }

            if header.message_sequence < self.reassembly.next_receive_sequence() {
                stale_seen = true;
            }

            let data = buf[HANDSHAKE_HEADER_LENGTH..end].to_vec();
            delivered.extend(self.reassembly.accept(&header, data)?);

            buf = &buf[end..];
        }

        Ok(Ingest {
            delivered,
            stale_seen,
        })
    }
}

pub(crate) fn fragment_handshake(mtu: usize, handshake: &Handshake) -> Result<Vec<Vec<u8>>> {
    let mut content = vec![];
    {
        let mut writer = BufWriter::<&mut Vec<u8>>::new(content.as_mut());
        handshake.handshake_message.marshal(&mut writer)?;
    }

    let max_fragment = mtu
        .saturating_sub(RECORD_LAYER_OVERHEAD + HANDSHAKE_HEADER_LENGTH)
        .max(1);

    let mut content_fragments = split_bytes(&content, max_fragment);
    if content_fragments.is_empty() {
        // zero length messages still need one fragment on the wire
        content_fragments = vec![vec![]];
    }

    let mut fragmented_handshakes = vec![];
    let mut offset = 0;
    for content_fragment in &content_fragments {
        let header = HandshakeHeader {
            handshake_type: handshake.handshake_header.handshake_type,
            length: handshake.handshake_header.length,
            message_sequence: handshake.handshake_header.message_sequence,
            fragment_offset: offset as u32,
            fragment_length: content_fragment.len() as u32,
        };
        offset += content_fragment.len();

        let mut fragmented_handshake = vec![];
        {
            let mut writer = BufWriter::<&mut Vec<u8>>::new(fragmented_handshake.as_mut());
            header.marshal(&mut writer)?;
        }
        fragmented_handshake.extend_from_slice(content_fragment);

        fragmented_handshakes.push(fragmented_handshake);
    }

    Ok(fragmented_handshakes)
}

fn split_bytes(bytes: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
    bytes
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}
