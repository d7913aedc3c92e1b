//! Reference backend: the REST job store and the vehicle position feed,
//! sharing one in-memory state. Used by the `serve` subcommand and by the
//! end-to-end tests.

pub mod feed;
pub mod rest;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::BackendConfig;
use crate::error::Result;

pub use feed::FeedHub;
pub use state::BackendState;

pub type SharedBackend = Arc<RwLock<BackendState>>;

/// Bound listeners plus shared state, ready to serve.
pub struct Backend {
    config: BackendConfig,
    state: SharedBackend,
    rest_listener: TcpListener,
    feed_listener: TcpListener,
}

impl Backend {
    /// Bind both listeners with the seeded data set.
    ///
    /// # Errors
    ///
    /// Returns an error if either address cannot be bound.
    pub async fn bind(config: BackendConfig) -> Result<Self> {
        Self::bind_with_state(config, BackendState::seeded()).await
    }

    pub async fn bind_with_state(config: BackendConfig, state: BackendState) -> Result<Self> {
        let rest_listener = TcpListener::bind(config.rest_addr).await?;
        let feed_listener = TcpListener::bind(config.feed_addr).await?;
        Ok(Self {
            config,
            state: Arc::new(RwLock::new(state)),
            rest_listener,
            feed_listener,
        })
    }

    pub fn rest_addr(&self) -> Result<SocketAddr> {
        Ok(self.rest_listener.local_addr()?)
    }

    pub fn feed_addr(&self) -> Result<SocketAddr> {
        Ok(self.feed_listener.local_addr()?)
    }

    pub fn state(&self) -> SharedBackend {
        self.state.clone()
    }

    /// Serve REST and feed until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if either server fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let rest_addr = self.rest_addr()?;
        let feed_addr = self.feed_addr()?;
        let Backend {
            config,
            state,
            rest_listener,
            feed_listener,
        } = self;
        let hub = FeedHub::new(state.clone(), cancel.clone());

        let ticker = tokio::spawn(feed::run_ticker(
            hub.clone(),
            config.feed_interval(),
            config.jitter,
            cancel.clone(),
        ));

        tracing::info!(addr = %rest_addr, "Starting REST API server");
        tracing::info!(addr = %feed_addr, "Starting position feed server");

        let rest_shutdown = cancel.clone();
        let rest = async move {
            axum::serve(rest_listener, rest::router(state))
                .with_graceful_shutdown(rest_shutdown.cancelled_owned())
                .await
        };
        let feed_shutdown = cancel.clone();
        let feed = async move {
            axum::serve(feed_listener, feed::router(hub))
                .with_graceful_shutdown(feed_shutdown.cancelled_owned())
                .await
        };

        let (rest_result, feed_result) = tokio::join!(rest, feed);
        cancel.cancel();
        if let Err(e) = ticker.await {
            tracing::warn!(error = %e, "Feed ticker join error");
        }

        rest_result?;
        feed_result?;
        tracing::info!("Backend stopped");
        Ok(())
    }
}
