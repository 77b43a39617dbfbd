//! # Mail Tracker
//!
//! Email open tracking: per-recipient pixel links for outgoing mail, a small
//! Axum server answering them with a transparent GIF, and a callback invoked
//! for every open.
//!
//! ## Architecture
//!
//! - **Utilities** ([`utils`]) - Identifier ⇄ token codec and link builder
//! - **Domain Layer** ([`domain`]) - Open events, the callback contract and dispatch
//! - **API Layer** ([`api`]) - Pixel handler, routes and request tracing
//! - **Lifecycle** ([`tracker`]) - Configuration, listener and start/stop
//!
//! ## Quick Start
//!
//! ```no_run
//! use mail_tracker::{OpenEvent, Tracker, TrackerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let tracker = Tracker::new(
//!         TrackerConfig::new(8080, "localhost:8080", "/pixel"),
//!         |event: OpenEvent| println!("Email opened: {event:?}"),
//!     )?;
//!
//!     // Embed this in the message body, e.g. as an <img src>.
//!     println!("{}", tracker.generate_link("12"));
//!
//!     tracker.start().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The library takes an in-memory [`TrackerConfig`]. The `mail-tracker`
//! binary loads one from environment variables via [`config::Config`].

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod recipients;
pub mod server;
pub mod state;
pub mod tracker;
pub mod utils;

pub use domain::open_event::OpenEvent;
pub use domain::open_handler::OpenHandler;
pub use error::TrackerError;
pub use tracker::{DispatchConfig, Scheme, Tracker, TrackerConfig};

/// Commonly used types for external consumers.
pub mod prelude {
    pub use crate::domain::open_event::OpenEvent;
    pub use crate::domain::open_handler::OpenHandler;
    pub use crate::error::TrackerError;
    pub use crate::recipients::RecipientDirectory;
    pub use crate::tracker::{Scheme, Tracker, TrackerConfig};
    pub use crate::utils::link_builder::LinkBuilder;
    pub use crate::utils::token_codec::TokenCodec;
}
