//! Open event dispatch.
//!
//! The pixel handler pushes events with [`EventDispatcher::dispatch`] and
//! answers immediately. Events are sharded by client connection onto
//! `concurrency` bounded lanes. Each lane is drained by one
//! [`run_dispatch_worker`] that runs the callback on the blocking pool, one
//! event at a time, so callbacks for one connection run in request order
//! while different lanes proceed in parallel.

use std::any::Any;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

use crate::domain::open_event::OpenEvent;
use crate::domain::open_handler::OpenHandler;
use crate::tracker::config::DispatchConfig;

/// Callback shared between the tracker and the dispatch workers.
pub type SharedHandler = Arc<dyn OpenHandler + Send + Sync>;

/// Result of running the callback for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed,
    Failed,
    Panicked,
}

/// Sending side of the dispatch lanes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    lanes: Arc<[mpsc::Sender<OpenEvent>]>,
}

impl EventDispatcher {
    pub fn new(lanes: Vec<mpsc::Sender<OpenEvent>>) -> Self {
        Self {
            lanes: lanes.into(),
        }
    }

    /// Creates `concurrency` lanes sharing `queue_capacity` and spawns one
    /// [`run_dispatch_worker`] per lane on the current runtime.
    ///
    /// The workers stop once every clone of the returned dispatcher is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(handler: SharedHandler, config: &DispatchConfig) -> Self {
        let lane_count = config.concurrency.max(1);
        let lane_capacity = config.queue_capacity.div_ceil(lane_count).max(1);

        let lanes = (0..lane_count)
            .map(|_| {
                let (sender, receiver) = mpsc::channel(lane_capacity);
                tokio::spawn(run_dispatch_worker(
                    receiver,
                    handler.clone(),
                    config.callback_timeout,
                ));
                sender
            })
            .collect();

        Self::new(lanes)
    }

    /// Queues an event for the callback without waiting.
    ///
    /// `connection` is the client socket the request arrived on; events
    /// from the same connection always land on the same lane. Returns
    /// `false` when the event was dropped because the lane is full or its
    /// worker is gone; the drop is logged and counted.
    pub fn dispatch(&self, connection: Option<SocketAddr>, event: OpenEvent) -> bool {
        let Some(lane) = self.lanes.get(self.lane_index(connection)) else {
            error!(id = %event.id, "No dispatch lanes, dropping open event");
            metrics::counter!("mail_tracker_dispatch_dropped_total").increment(1);
            return false;
        };

        match lane.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(id = %event.id, "Dispatch queue full, dropping open event");
                metrics::counter!("mail_tracker_dispatch_dropped_total").increment(1);
                false
            }
            Err(TrySendError::Closed(event)) => {
                error!(id = %event.id, "Dispatch worker stopped, dropping open event");
                metrics::counter!("mail_tracker_dispatch_dropped_total").increment(1);
                false
            }
        }
    }

    /// True once every lane's worker is gone.
    pub fn is_closed(&self) -> bool {
        self.lanes.iter().all(|lane| lane.is_closed())
    }

    fn lane_index(&self, connection: Option<SocketAddr>) -> usize {
        if self.lanes.len() <= 1 {
            return 0;
        }

        let mut hasher = DefaultHasher::new();
        connection.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }
}

/// Drains one dispatch lane, running the callback once per event.
///
/// Events run strictly in arrival order: the next callback starts only
/// after the previous one returned. A callback still running after
/// `callback_timeout` is reported as slow but left to finish, since blocking
/// code cannot be interrupted.
pub async fn run_dispatch_worker(
    mut receiver: mpsc::Receiver<OpenEvent>,
    handler: SharedHandler,
    callback_timeout: Duration,
) {
    while let Some(event) = receiver.recv().await {
        let id = event.id.clone();
        let handler = handler.clone();
        let mut task = tokio::task::spawn_blocking(move || run_handler(handler.as_ref(), event));

        let joined = match tokio::time::timeout(callback_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    id = %id,
                    timeout = ?callback_timeout,
                    "Open callback exceeded its timeout"
                );
                metrics::counter!("mail_tracker_callback_slow_total").increment(1);
                task.await
            }
        };

        if let Err(e) = joined {
            error!(id = %id, "Open callback task failed: {}", e);
        }
    }

    debug!("Dispatch worker stopped");
}

/// Runs the callback for one event, containing errors and panics.
pub fn run_handler<H>(handler: &H, event: OpenEvent) -> CallbackOutcome
where
    H: OpenHandler + ?Sized,
{
    let id = event.id.clone();

    match catch_unwind(AssertUnwindSafe(|| handler.on_open(event))) {
        Ok(Ok(())) => CallbackOutcome::Completed,
        Ok(Err(e)) => {
            error!(id = %id, "Open callback failed: {:#}", e);
            metrics::counter!("mail_tracker_callback_failures_total").increment(1);
            CallbackOutcome::Failed
        }
        Err(payload) => {
            error!(id = %id, "Open callback panicked: {}", panic_message(payload.as_ref()));
            metrics::counter!("mail_tracker_callback_failures_total").increment(1);
            CallbackOutcome::Panicked
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
