use std::time::{Duration, SystemTime};

use rand::Rng;

pub(crate) const RANDOM_BYTES_LENGTH: usize = 28;
pub(crate) const HANDSHAKE_RANDOM_LENGTH: usize = RANDOM_BYTES_LENGTH + 4;

// 32 bytes of per-connection entropy, the first four being the sender's
// clock as seconds since the epoch.
// https://tools.ietf.org/html/rfc4346#section-7.4.1.2
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct HandshakeRandom {
    pub(crate) gmt_unix_time: u32,
    pub(crate) random_bytes: [u8; RANDOM_BYTES_LENGTH],
}

impl HandshakeRandom {
    pub fn marshal_fixed(&self) -> [u8; HANDSHAKE_RANDOM_LENGTH] {
        let mut out = [0u8; HANDSHAKE_RANDOM_LENGTH];

        out[0..4].copy_from_slice(&self.gmt_unix_time.to_be_bytes());
        out[4..].copy_from_slice(&self.random_bytes);

        out
    }

    pub fn unmarshal_fixed(data: &[u8; HANDSHAKE_RANDOM_LENGTH]) -> Self {
        let mut secs = [0u8; 4];
        secs.copy_from_slice(&data[0..4]);

        let mut random_bytes = [0u8; RANDOM_BYTES_LENGTH];
        random_bytes.copy_from_slice(&data[4..]);

        HandshakeRandom {
            gmt_unix_time: u32::from_be_bytes(secs),
            random_bytes,
        }
    }

    // populate fills the HandshakeRandom with fresh values,
    // may be called multiple times
    pub fn populate(&mut self) {
        self.gmt_unix_time = match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as u32,
            Err(_) => 0,
        };
        rand::thread_rng().fill(&mut self.random_bytes);
    }

    pub fn unix_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::new(u64::from(self.gmt_unix_time), 0)
    }
}
