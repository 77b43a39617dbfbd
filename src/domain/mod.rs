//! Domain layer: open events and their delivery to the caller.
//!
//! - [`open_event`] - The open event snapshot
//! - [`open_handler`] - Callback contract implemented by the caller
//! - [`dispatcher`] - Bounded per-connection lanes and the workers running the callback
//!
//! # Open Processing Flow
//!
//! 1. The pixel handler decodes a token into an identifier
//! 2. An [`open_event::OpenEvent`] is queued with [`dispatcher::EventDispatcher::dispatch`]
//! 3. [`dispatcher::run_dispatch_worker`] runs the [`open_handler::OpenHandler`]
//!    off the request path, in order per connection, containing failures

pub mod dispatcher;
pub mod open_event;
pub mod open_handler;
