
use std::collections::HashMap;
use std::io::{BufReader, BufWriter};

use log::debug;

use crate::error::*;
use crate::handshake::handshake_header::*;
use crate::handshake::*;

// Bounds on what a peer may park in the buffer before we give up on it.
pub(crate) const MAX_PENDING_MESSAGES: usize = 16;
pub(crate) const MAX_BUFFERED_BYTES: usize = 64 * 1024;

// A complete handshake message in canonical single-fragment form, both
// decoded and as the exact bytes that belong in the transcript.
#[derive(Debug, Clone)]
pub(crate) struct Delivered {
    pub(crate) handshake: Handshake,
    pub(crate) raw: Vec<u8>,
}

// Collects the fragments of one handshake message. All fragments must
// agree on type, total length and message sequence; the list is kept
// sorted by fragment offset.
#[derive(Debug)]
pub(crate) struct FragmentList {
    handshake_type: HandshakeType,
    length: u32,
    message_sequence: u16,
    fragments: Vec<(u32, Vec<u8>)>,
}

impl FragmentList {
    pub(crate) fn new(header: &HandshakeHeader, data: Vec<u8>) -> Result<Self> {
        let mut list = FragmentList {
            handshake_type: header.handshake_type,
            length: header.length,
            message_sequence: header.message_sequence,
            fragments: vec![],
        };
        list.insert(header, data)?;
        Ok(list)
    }

    pub(crate) fn insert(&mut self, header: &HandshakeHeader, data: Vec<u8>) -> Result<()> {
        if header.handshake_type != self.handshake_type
            || header.length != self.length
            || header.message_sequence != self.message_sequence
        {
            return Err(Error::ErrFragmentMismatch);
        }
        if u64::from(header.fragment_offset) + u64::from(header.fragment_length)
            > u64::from(self.length)
            || data.len() != header.fragment_length as usize
        {
            return Err(Error::ErrFragmentOutOfBounds);
        }

        let offset = header.fragment_offset;
        let mut at = self.fragments.len();
        for (i, (existing_offset, existing_data)) in self.fragments.iter().enumerate() {
            if *existing_offset == offset && existing_data.len() == data.len() {
                // retransmitted copy of the same window, the newer one is
                // the freshest
                self.fragments[i].1 = data;
                return Ok(());
            }
            if *existing_offset > offset {
                at = i;
                break;
            }
        }
        self.fragments.insert(at, (offset, data));

        Ok(())
    }

    // Complete when the fragment windows cover [0, length) with no gap.
    pub(crate) fn is_complete(&self) -> bool {
        let mut covered = 0u64;
        for (offset, data) in &self.fragments {
            if u64::from(*offset) > covered {
                return false;
            }
            covered = covered.max(u64::from(*offset) + data.len() as u64);
        }

        covered == u64::from(self.length)
    }

    // Canonical reassembled bytes: a fresh 12-byte header with offset
    // zero followed by the body, overlaps resolved later-wins.
    pub(crate) fn assemble(&self) -> Result<Vec<u8>> {
        let header = HandshakeHeader {
            handshake_type: self.handshake_type,
            length: self.length,
            message_sequence: self.message_sequence,
            fragment_offset: 0,
            fragment_length: self.length,
        };

        let mut raw = vec![];
        {
            let mut writer = BufWriter::<&mut Vec<u8>>::new(raw.as_mut());
            header.marshal(&mut writer)?;
        }

        let mut body = vec![0u8; self.length as usize];
        for (offset, data) in &self.fragments {
            body[*offset as usize..*offset as usize + data.len()].copy_from_slice(data);
        }
        raw.extend_from_slice(&body);

        Ok(raw)
    }

    pub(crate) fn buffered_bytes(&self) -> usize {
        self.fragments.iter().map(|(_, data)| data.len()).sum()
    }
}

// Per-peer reassembly: fragments keyed by message sequence, complete
// messages handed out in strictly increasing sequence order, each
// exactly once.
pub(crate) struct ReassemblyBuffer {
    pending: HashMap<u16, FragmentList>,
    next_receive_sequence: u16,
    dropped_fragments: u64,
}

impl ReassemblyBuffer {
    pub(crate) fn new() -> Self {
        ReassemblyBuffer {
            pending: HashMap::new(),
            next_receive_sequence: 0,
            dropped_fragments: 0,
        }
    }

    pub(crate) fn next_receive_sequence(&self) -> u16 {
        self.next_receive_sequence
    }

    pub(crate) fn dropped_fragments(&self) -> u64 {
        self.dropped_fragments
    }

    // The stateless cookie exchange re-anchors both sequence spaces at
    // zero; pending fragments from before the anchor are meaningless.
    pub(crate) fn reset(&mut self) {
        self.pending.clear();
        self.next_receive_sequence = 0;
    }

    // Accepts one fragment and returns every message that just became
    // deliverable, possibly none, possibly several. Errors are fatal
    // resource-bound violations; malformed or mismatched fragments are
    // dropped silently.
    pub(crate) fn accept(
        &mut self,
        header: &HandshakeHeader,
        data: Vec<u8>,
    ) -> Result<Vec<Delivered>> {
        if header.message_sequence < self.next_receive_sequence {
            self.dropped_fragments += 1;
            debug!(
                "dropping fragment for already delivered message_seq {} (next {})",
                header.message_sequence, self.next_receive_sequence
            );
            return Ok(vec![]);
        }

        let buffered: usize = self.pending.values().map(|l| l.buffered_bytes()).sum();
        if buffered + data.len() > MAX_BUFFERED_BYTES {
            return Err(Error::ErrReassemblyBytesOverflow {
                buffered: buffered + data.len(),
                max: MAX_BUFFERED_BYTES,
            });
        }

        if let Some(list) = self.pending.get_mut(&header.message_sequence) {
            if let Err(err) = list.insert(header, data) {
                self.dropped_fragments += 1;
                debug!(
                    "dropping incompatible fragment for message_seq {}: {}",
                    header.message_sequence, err
                );
                return Ok(vec![]);
            }
        } else {
            if self.pending.len() >= MAX_PENDING_MESSAGES {
                return Err(Error::ErrReassemblyQueueOverflow {
                    pending: self.pending.len() + 1,
                    max: MAX_PENDING_MESSAGES,
                });
            }
            match FragmentList::new(header, data) {
                Ok(list) => {
                    self.pending.insert(header.message_sequence, list);
                }
                Err(err) => {
                    self.dropped_fragments += 1;
                    debug!(
                        "dropping malformed fragment for message_seq {}: {}",
                        header.message_sequence, err
                    );
                    return Ok(vec![]);
                }
            }
        }

        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<Delivered>> {
        let mut out = vec![];

        while let Some(list) = self.pending.get(&self.next_receive_sequence) {
            if !list.is_complete() {
                break;
            }

            let raw = list.assemble()?;
            let mut reader = BufReader::new(raw.as_slice());
            let handshake = Handshake::unmarshal(&mut reader)?;

            self.pending.remove(&self.next_receive_sequence);
            self.next_receive_sequence = self.next_receive_sequence.wrapping_add(1);

            out.push(Delivered { handshake, raw });
        }

        Ok(out)
    }
}
