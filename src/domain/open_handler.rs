//! Callback contract for open notifications.

use crate::domain::open_event::OpenEvent;

/// Receives open events from the tracker.
///
/// Implementations may block, fail or panic; the dispatcher runs them off
/// the request path and contains all three.
///
/// Events from one client connection are delivered one at a time, in the
/// order the requests arrived. Events from different connections may be
/// delivered concurrently and in any order, so shared state behind `&self`
/// needs its own synchronization.
///
/// Plain closures taking an [`OpenEvent`] implement this trait:
///
/// ```
/// use mail_tracker::{OpenEvent, OpenHandler};
///
/// let handler = |event: OpenEvent| println!("opened: {}", event.id);
/// let event = OpenEvent::new("12".to_string(), "127.0.0.1".to_string(), None);
/// assert!(handler.on_open(event).is_ok());
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait OpenHandler {
    fn on_open(&self, event: OpenEvent) -> anyhow::Result<()>;
}

impl<F> OpenHandler for F
where
    F: Fn(OpenEvent),
{
    fn on_open(&self, event: OpenEvent) -> anyhow::Result<()> {
        self(event);
        Ok(())
    }
}
