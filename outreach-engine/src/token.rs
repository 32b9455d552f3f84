//! Tracking token derivation.
//!
//! A token is HMAC-SHA256 over the normalized email address, keyed with the
//! campaign's secret, truncated to 128 bits and hex encoded. Tokens are
//! deterministic per campaign, reveal nothing about the address without the
//! secret, and are the only recipient identifier that ever appears in a URL.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::address::normalize_email;

type HmacSha256 = Hmac<Sha256>;

/// Length of an encoded token in characters.
pub const TOKEN_LEN: usize = 32;

const TOKEN_BYTES: usize = TOKEN_LEN / 2;

/// A campaign's keyed token generator.
#[derive(Clone)]
pub struct TrackingKey {
    mac: HmacSha256,
}

impl TrackingKey {
    /// Build a key from the campaign secret. Returns `None` for an empty secret.
    pub fn new(secret: &str) -> Option<Self> {
        if secret.trim().is_empty() {
            return None;
        }
        HmacSha256::new_from_slice(secret.as_bytes())
            .ok()
            .map(|mac| Self { mac })
    }

    /// Token for `email`. Case and surrounding whitespace do not matter.
    pub fn token_for(&self, email: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(normalize_email(email).as_bytes());
        let digest = mac.finalize().into_bytes();
        hex::encode(&digest[..TOKEN_BYTES])
    }
}

impl std::fmt::Debug for TrackingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TrackingKey(..)")
    }
}

/// Cheap shape check applied before a token from the network touches a store.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
