use axum::Router;
use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::router::build_router;
use super::state::AppState;
use crate::backup::BackupStore;
use crate::backup::scheduler::spawn_cleanup_task;
use crate::config::{ServerConfig, SharedRuntimeConfig};
use crate::storage::filesystem::ensure_protected_directory;

pub struct Server {
    listener: TcpListener,
    router: Router,
    backups: Arc<BackupStore>,
    runtime: SharedRuntimeConfig,
    cleanup_interval: Duration,
}

impl Server {
    /// Wires state from `config` and binds the listener.
    pub async fn new(config: ServerConfig) -> io::Result<Self> {
        let (startup, runtime) = config.split();

        let state = AppState::from_config(&startup, Arc::clone(&runtime)).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid dangerous function pattern: {e}"),
            )
        })?;

        for root in &startup.theme_roots {
            if !std::path::Path::new(&root.path).is_dir() {
                warn!("Theme root {} ({}) does not exist", root.name, root.path);
            }
        }

        if let Err(e) = ensure_protected_directory(&startup.backup_root_path()) {
            warn!(
                "Failed to prepare backup directory {}: {}",
                startup.backup_root, e
            );
        }

        if startup.api_keys.is_empty() {
            warn!("No API keys configured; every request will be rejected");
        }

        let cors_origins = runtime.read().await.cors_origins.clone();
        let router = build_router(state.clone(), &startup.api_namespace, &cors_origins);

        let socket = startup.listen_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            router,
            backups: state.backups,
            runtime,
            cleanup_interval: startup.cleanup_interval(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until Ctrl-C.
    pub async fn start(self) -> io::Result<()> {
        let cleanup = spawn_cleanup_task(
            Arc::clone(&self.backups),
            Arc::clone(&self.runtime),
            self.cleanup_interval,
        );
        info!(
            "Backup cleanup scheduled every {}s",
            self.cleanup_interval.as_secs()
        );

        info!("Starting theme MCP server on {}", self.local_addr()?);
        let served = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        cleanup.abort();
        info!("Server stopped");
        served
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
