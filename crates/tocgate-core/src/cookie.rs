//! HMAC cookie baker for the HTTP helper auth tokens.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Issues and validates opaque auth cookies.
pub trait CookieBaker: Send + Sync {
    /// Wrap `payload` into a tamper-evident cookie.
    fn issue(&self, payload: &[u8]) -> Result<Vec<u8>, ServiceError>;

    /// Validate a cookie and recover its payload.
    fn crack(&self, cookie: &[u8]) -> Result<Vec<u8>, ServiceError>;
}

/// HMAC-SHA256 cookie baker.
///
/// Cookie layout: `[payload_len:u16 BE][payload][mac:32]`. The MAC covers
/// the payload only; the length field is implied by it.
#[derive(Debug, Clone)]
pub struct HmacCookieBaker {
    key: Vec<u8>,
}

impl HmacCookieBaker {
    /// Baker keyed with `key`.
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self) -> Result<HmacSha256, ServiceError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|err| ServiceError::Internal(format!("bad HMAC key: {err}")))
    }
}

impl CookieBaker for HmacCookieBaker {
    fn issue(&self, payload: &[u8]) -> Result<Vec<u8>, ServiceError> {
        let len = u16::try_from(payload.len())
            .map_err(|_| ServiceError::Internal("cookie payload too large".into()))?;
        let mut mac = self.mac()?;
        mac.update(payload);
        let tag = mac.finalize().into_bytes();

        let mut cookie = Vec::with_capacity(2 + payload.len() + tag.len());
        cookie.extend_from_slice(&len.to_be_bytes());
        cookie.extend_from_slice(payload);
        cookie.extend_from_slice(&tag);
        Ok(cookie)
    }

    fn crack(&self, cookie: &[u8]) -> Result<Vec<u8>, ServiceError> {
        let bad = || ServiceError::Rejected("cookie validation failed".into());
        if cookie.len() < 2 {
            return Err(bad());
        }
        let (len_bytes, rest) = cookie.split_at(2);
        let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
        if rest.len() <= len {
            return Err(bad());
        }
        let (payload, tag) = rest.split_at(len);

        let mut mac = self.mac()?;
        mac.update(payload);
        mac.verify_slice(tag).map_err(|_| bad())?;
        Ok(payload.to_vec())
    }
}
