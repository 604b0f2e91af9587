#[cfg(test)]
mod cookie_test;

use std::net::SocketAddr;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::*;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const COOKIE_LENGTH: usize = 20;
const COOKIE_SECRET_LENGTH: usize = 32;

// Stateless HelloVerifyRequest cookies: an HMAC over the client's
// address under a server-wide secret. The server keeps no per-client
// state between sending the cookie and seeing it echoed; rotating the
// secret invalidates all outstanding cookies.
// https://tools.ietf.org/html/rfc6347#section-4.2.1
pub struct CookieGenerator {
    secret: [u8; COOKIE_SECRET_LENGTH],
}

impl CookieGenerator {
    pub fn new() -> Self {
        let mut secret = [0u8; COOKIE_SECRET_LENGTH];
        rand::thread_rng().fill(&mut secret);
        CookieGenerator { secret }
    }

    pub fn rotate(&mut self) {
        rand::thread_rng().fill(&mut self.secret);
    }

    pub fn generate(&self, addr: &SocketAddr) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Other(e.to_string()))?;
        mac.update(&addr_bytes(addr));

        let tag = mac.finalize().into_bytes();
        Ok(tag[..COOKIE_LENGTH].to_vec())
    }

    pub fn verify(&self, addr: &SocketAddr, cookie: &[u8]) -> bool {
        match self.generate(addr) {
            Ok(expected) => expected.ct_eq(cookie).into(),
            Err(_) => false,
        }
    }
}

impl Default for CookieGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn addr_bytes(addr: &SocketAddr) -> Vec<u8> {
    let mut out = match addr.ip() {
        std::net::IpAddr::V4(ip) => ip.octets().to_vec(),
        std::net::IpAddr::V6(ip) => ip.octets().to_vec(),
    };
    out.extend_from_slice(&addr.port().to_be_bytes());
    out
}
