//! Token and link utilities.
//!
//! - [`token_codec`] - Identifier to URL-safe token encoding
//! - [`link_builder`] - Tracking link composition

pub mod link_builder;
pub mod token_codec;
