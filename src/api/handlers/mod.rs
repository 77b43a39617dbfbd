//! HTTP request handlers.

pub mod pixel;

pub use pixel::{PIXEL_GIF, not_found_handler, pixel_handler};
