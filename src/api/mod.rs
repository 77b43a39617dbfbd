//! HTTP surface exposed to mail clients.
//!
//! # Modules
//!
//! - [`handlers`] - Pixel and fallback handlers
//! - [`middleware`] - Request tracing
//! - [`routes`] - Route configuration

pub mod handlers;
pub mod middleware;
pub mod routes;
