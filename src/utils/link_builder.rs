//! Tracking link composition.

use crate::tracker::config::{Scheme, TrackerConfig};
use crate::utils::token_codec::TokenCodec;

/// Builds `{scheme}://{domain}{path}/{token}` links for identifiers.
///
/// A pure function of the configuration and the codec; usable before the
/// tracker starts.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: String,
    codec: TokenCodec,
}

impl LinkBuilder {
    pub fn new(config: &TrackerConfig, codec: TokenCodec) -> Self {
        Self::from_parts(config.scheme, &config.domain, &config.path, codec)
    }

    pub fn from_parts(scheme: Scheme, domain: &str, path: &str, codec: TokenCodec) -> Self {
        Self {
            base: format!("{}://{}{}/", scheme.as_str(), domain, path),
            codec,
        }
    }

    /// Common prefix of every link this builder produces.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn link(&self, id: &str) -> String {
        if id.is_empty() {
            tracing::warn!("Generating a tracking link for an empty identifier; it will not resolve");
        }
        format!("{}{}", self.base, self.codec.encode(id))
    }

    /// An invisible `<img>` tag pointing at the tracking link for `id`.
    ///
    /// Links only contain URL-safe characters, so no attribute escaping is needed.
    pub fn img_tag(&self, id: &str) -> String {
        format!(
            r#"<img src="{}" width="1" height="1" alt="" style="display:none" />"#,
            self.link(id)
        )
    }
}
