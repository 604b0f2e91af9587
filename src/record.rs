use async_trait::async_trait;

use crate::content::ContentType;
use crate::error::Result;

// DTLS record header plus a margin for per-record cipher overhead; the
// fragmenter keeps every handshake record under the MTU after the record
// layer wraps it.
pub(crate) const RECORD_LAYER_OVERHEAD: usize = 13;

// The record layer this engine drives. Encryption, MACs and record
// sequence numbers live behind this trait; the engine only sees content
// types and payloads.
//
// `send_record` emits exactly one record. `recv_record` yields exactly
// one, already decrypted and deduplicated at the record level. The epoch
// hooks fire once each: write at the local ChangeCipherSpec (between it
// and the local Finished), read on first receipt of the peer's.
#[async_trait]
pub trait RecordLayer {
    async fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<()>;
    async fn recv_record(&mut self) -> Result<(ContentType, Vec<u8>)>;
    fn rotate_write_epoch(&mut self);
    fn rotate_read_epoch(&mut self);
}
