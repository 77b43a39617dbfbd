//! Tracker lifecycle: configuration, link generation and the HTTP listener.
//!
//! A [`Tracker`] is constructed from a validated [`TrackerConfig`] and an
//! [`OpenHandler`]. Nothing touches the network until [`Tracker::start`]
//! (or [`Tracker::serve`]) is awaited; from then on it owns one listener
//! and a second call fails with [`TrackerError::AlreadyStarted`] until it
//! shuts down.

pub mod config;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::Request;
use axum::{Router, ServiceExt};
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

use crate::api::routes::pixel_routes;
use crate::domain::dispatcher::{EventDispatcher, SharedHandler};
use crate::domain::open_handler::OpenHandler;
use crate::error::TrackerError;
use crate::state::PixelState;
use crate::utils::link_builder::LinkBuilder;
use crate::utils::token_codec::TokenCodec;

pub use config::{DispatchConfig, Scheme, TrackerConfig};

/// Email open tracker.
///
/// # Examples
///
/// ```no_run
/// use mail_tracker::{OpenEvent, Tracker, TrackerConfig};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), mail_tracker::TrackerError> {
/// let tracker = Arc::new(Tracker::new(
///     TrackerConfig::new(8080, "localhost:8080", "/pixel"),
///     |event: OpenEvent| println!("opened: {}", event.id),
/// )?);
///
/// let server = tracker.clone();
/// tokio::spawn(async move { server.start().await });
///
/// let link = tracker.generate_link("12");
/// assert_eq!(link, "http://localhost:8080/pixel/MTI");
/// # Ok(())
/// # }
/// ```
pub struct Tracker {
    config: TrackerConfig,
    codec: TokenCodec,
    links: LinkBuilder,
    handler: SharedHandler,
    listening: AtomicBool,
}

impl Tracker {
    /// Validates `config` and binds it to `handler`. Opens no socket.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Config`] if the configuration is invalid.
    pub fn new<H>(config: TrackerConfig, handler: H) -> Result<Self, TrackerError>
    where
        H: OpenHandler + Send + Sync + 'static,
    {
        config.validate()?;

        let codec = match &config.token_secret {
            Some(secret) => TokenCodec::signed(secret),
            None => TokenCodec::new(),
        };
        let links = LinkBuilder::new(&config, codec.clone());

        Ok(Self {
            config,
            codec,
            links,
            handler: Arc::new(handler),
            listening: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Tracking URL for `id`: `{scheme}://{domain}{path}/{token}`.
    pub fn generate_link(&self, id: &str) -> String {
        self.links.link(id)
    }

    /// Whether a listener is currently owned by this tracker.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Router serving the pixel routes, for mounting on an external server.
    ///
    /// Each call starts its own dispatch workers, which stop when the router
    /// is dropped. The configured port is not used. Requests without
    /// `ConnectInfo` get an empty remote address.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn router(&self) -> Router {
        let dispatcher = EventDispatcher::spawn(self.handler.clone(), &self.config.dispatch);
        let state = PixelState::new(self.codec.clone(), dispatcher, self.config.behind_proxy);
        pixel_routes(state, &self.config.path)
    }

    /// Binds `listen_host:port` and serves until the process exits.
    ///
    /// Run it on its own task; it only returns on error.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::AlreadyStarted`] if this tracker is already listening
    /// - [`TrackerError::Bind`] if the address cannot be bound
    /// - [`TrackerError::Serve`] if the server fails
    pub async fn start(&self) -> Result<(), TrackerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Like [`Tracker::start`], returning once `shutdown` resolves and
    /// in-flight requests complete. The tracker can be started again after
    /// it returns.
    pub async fn start_with_shutdown<F>(&self, shutdown: F) -> Result<(), TrackerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.claim_listener()?;

        let addr = self.config.listen_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.listening.store(false, Ordering::Release);
                tracing::error!("Failed to bind {}: {}", addr, source);
                return Err(TrackerError::Bind { addr, source });
            }
        };

        self.run(listener, shutdown).await
    }

    /// Serves on a listener bound by the caller until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::AlreadyStarted`] if this tracker is already listening
    /// - [`TrackerError::Serve`] if the server fails
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), TrackerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.claim_listener()?;
        self.run(listener, shutdown).await
    }

    fn claim_listener(&self) -> Result<(), TrackerError> {
        self.listening
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| TrackerError::AlreadyStarted)
    }

    async fn run<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), TrackerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match listener.local_addr() {
            Ok(addr) => tracing::info!("Listening on http://{addr}"),
            Err(e) => tracing::warn!("Listening on an unknown address: {}", e),
        }
        tracing::info!("Tracking links: {}{{token}}", self.links.base());

        let app = NormalizePathLayer::trim_trailing_slash().layer(self.router());

        let served = axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        self.listening.store(false, Ordering::Release);
        served.map_err(TrackerError::Serve)?;

        tracing::info!("Tracker stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("links", &self.links.base())
            .field("listen_addr", &self.config.listen_addr())
            .field("listening", &self.is_listening())
            .finish_non_exhaustive()
    }
}
