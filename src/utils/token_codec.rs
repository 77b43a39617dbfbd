//! Identifier ⇄ token encoding for tracking links.
//!
//! Tokens are URL-safe base64 without padding, so they never contain `/`,
//! `?`, `#`, `%` or whitespace and can be dropped into a path segment or an
//! HTML attribute as-is. When a secret is configured, a truncated
//! HMAC-SHA256 tag is appended after a `.` so forged tokens are rejected.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the MAC kept in signed tokens (16 base64 characters).
const TAG_LENGTH_BYTES: usize = 12;

const TAG_SEPARATOR: char = '.';

/// Encodes identifiers into link tokens and decodes them back.
///
/// Read-only after construction; share it freely between handlers.
#[derive(Clone, Default)]
pub struct TokenCodec {
    secret: Option<Arc<[u8]>>,
}

impl TokenCodec {
    /// Codec producing plain base64url tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec producing tokens signed with `secret`.
    pub fn signed(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Some(Arc::from(secret.as_ref())),
        }
    }

    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    /// Encodes an identifier into a token.
    ///
    /// # Examples
    ///
    /// ```
    /// use mail_tracker::utils::token_codec::TokenCodec;
    ///
    /// let codec = TokenCodec::new();
    /// assert_eq!(codec.encode("12"), "MTI");
    /// assert_eq!(codec.decode("MTI").as_deref(), Some("12"));
    /// ```
    pub fn encode(&self, id: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(id.as_bytes());

        match self.tag(id.as_bytes()) {
            Some(tag) => format!("{payload}{TAG_SEPARATOR}{}", URL_SAFE_NO_PAD.encode(tag)),
            None => payload,
        }
    }

    /// Decodes a token back into its identifier.
    ///
    /// Returns `None` for anything that is not a token this codec produced:
    /// bad base64, non UTF-8 payloads, a missing or wrong signature, or an
    /// empty identifier.
    pub fn decode(&self, token: &str) -> Option<String> {
        let (payload, tag) = match &self.secret {
            Some(_) => {
                let (payload, tag) = token.split_once(TAG_SEPARATOR)?;
                (payload, Some(tag))
            }
            None => (token, None),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        if bytes.is_empty() {
            return None;
        }

        if let (Some(secret), Some(tag)) = (&self.secret, tag) {
            let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
            if tag.len() != TAG_LENGTH_BYTES {
                return None;
            }
            let mut mac = HmacSha256::new_from_slice(secret).ok()?;
            mac.update(&bytes);
            mac.verify_truncated_left(&tag).ok()?;
        }

        String::from_utf8(bytes).ok()
    }

    fn tag(&self, payload: &[u8]) -> Option<[u8; TAG_LENGTH_BYTES]> {
        let secret = self.secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret).ok()?;
        mac.update(payload);
        let digest = mac.finalize().into_bytes();

        let mut tag = [0u8; TAG_LENGTH_BYTES];
        tag.copy_from_slice(&digest[..TAG_LENGTH_BYTES]);
        Some(tag)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("signed", &self.is_signed())
            .finish()
    }
}
