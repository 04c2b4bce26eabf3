//! Daemon orchestrator for wiring together all components.
//!
//! This module provides the `DaemonOrchestrator` that builds the explorer from
//! configuration, binds the HTTP listener, and coordinates graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::explorer::Explorer;
use crate::router::build_router;

/// Daemon orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Initial state, not started.
    Stopped,
    /// Starting up, binding the listener.
    Starting,
    /// Running and accepting requests.
    Running,
    /// Shutting down gracefully.
    ShuttingDown,
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Orchestrator state changed.
    StateChanged(OrchestratorState),
    /// The HTTP listener is bound.
    Listening { addr: SocketAddr },
    /// Error occurred.
    Error { message: String },
}

/// Daemon orchestrator that manages the HTTP server.
pub struct DaemonOrchestrator {
    /// Configuration.
    config: Config,
    /// Shared exploration engine.
    explorer: Arc<Explorer>,
    /// Current state.
    state: Arc<RwLock<OrchestratorState>>,
    /// Address the listener is bound to, once started.
    local_addr: Option<SocketAddr>,
    /// The running server task.
    server_task: Mutex<Option<JoinHandle<()>>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
    /// Event sender.
    event_tx: broadcast::Sender<OrchestratorEvent>,
}

impl DaemonOrchestrator {
    /// Creates a new daemon orchestrator.
    pub fn new(config: Config) -> Result<Self> {
        let explorer = Explorer::from_config(&config.explorer)
            .context("Failed to initialize explorer")?;

        match explorer.validator().root() {
            Some(root) => info!("Permitted root: {}", root.display()),
            None => info!("No permitted root configured, all paths are browsable"),
        }

        let (event_tx, _) = broadcast::channel(256);

        Ok(Self {
            config,
            explorer: Arc::new(explorer),
            state: Arc::new(RwLock::new(OrchestratorState::Stopped)),
            local_addr: None,
            server_task: Mutex::new(None),
            shutdown_token: CancellationToken::new(),
            event_tx,
        })
    }

    /// Returns the current state.
    pub async fn state(&self) -> OrchestratorState {
        *self.state.read().await
    }

    /// Returns a receiver for orchestrator events.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.event_tx.subscribe()
    }

    /// Returns the bound listener address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Starts the daemon orchestrator.
    pub async fn start(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != OrchestratorState::Stopped {
                anyhow::bail!("Orchestrator is already running");
            }
            *state = OrchestratorState::Starting;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Starting));

        info!("Starting daemon orchestrator...");

        let (listener, addr) = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                *self.state.write().await = OrchestratorState::Stopped;
                self.emit_event(OrchestratorEvent::Error {
                    message: format!("{:#}", e),
                });
                self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));
                return Err(e);
            }
        };

        self.local_addr = Some(addr);
        info!("Listening on http://{}", addr);
        self.emit_event(OrchestratorEvent::Listening { addr });

        let app = build_router(Arc::clone(&self.explorer));
        // A token cancelled by a previous stop() would end the new server at once.
        self.shutdown_token = CancellationToken::new();
        let shutdown_token = self.shutdown_token.clone();
        let event_tx = self.event_tx.clone();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
                .await;

            match result {
                Ok(()) => debug!("HTTP server exited"),
                Err(e) => {
                    error!("HTTP server error: {}", e);
                    let _ = event_tx.send(OrchestratorEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        });
        *self.server_task.lock().await = Some(task);

        {
            let mut state = self.state.write().await;
            *state = OrchestratorState::Running;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Running));

        info!("Daemon orchestrator started");
        Ok(())
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr)> {
        let addr = self
            .config
            .server
            .socket_addr()
            .context("Invalid listen address")?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read listener address")?;
        Ok((listener, local_addr))
    }

    /// Stops the daemon orchestrator gracefully.
    ///
    /// In-flight requests are allowed to finish before the server task ends.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == OrchestratorState::Stopped {
                return Ok(());
            }
            if *state == OrchestratorState::ShuttingDown {
                anyhow::bail!("Orchestrator is already shutting down");
            }
            *state = OrchestratorState::ShuttingDown;
        }
        self.emit_event(OrchestratorEvent::StateChanged(
            OrchestratorState::ShuttingDown,
        ));

        info!("Stopping daemon orchestrator...");

        self.shutdown_token.cancel();

        if let Some(task) = self.server_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("HTTP server task failed: {}", e);
            }
        }

        {
            let mut state = self.state.write().await;
            *state = OrchestratorState::Stopped;
        }
        self.emit_event(OrchestratorEvent::StateChanged(OrchestratorState::Stopped));

        info!("Daemon orchestrator stopped");
        Ok(())
    }

    /// Emits an event to all subscribers.
    fn emit_event(&self, event: OrchestratorEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(event);
    }

    /// Returns a clone of the shutdown token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }
}
