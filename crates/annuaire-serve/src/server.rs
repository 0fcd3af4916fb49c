//! Server instance management

use annuaire_recherche::SearchService;
use annuaire_stockage::Storage;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handlers::{create_app, load_corpus, AppState};

/// Annuaire HTTP search server
///
/// Owns the shared store and search service and manages the Axum server
/// lifecycle, including the optional startup build and graceful shutdown.
pub struct AnnuaireServer {
    /// Server configuration
    config: ServerConfig,

    /// Storage layer wrapped in Arc<Mutex> for thread safety
    storage: Arc<Mutex<Storage>>,

    /// Lexical index shared by all requests
    search: Arc<SearchService>,
}

impl AnnuaireServer {
    /// Create new server instance
    ///
    /// Validates the configuration and opens the database; the index is
    /// left empty until [`AnnuaireServer::build_index`] or the first query.
    pub fn new(config: ServerConfig) -> Result<Self, ApiError> {
        if let Err(e) = config.validate() {
            return Err(ApiError::internal(format!("Invalid config: {}", e)));
        }

        let storage = Storage::open(&config.db_path)
            .map_err(|e| {
                error!("Failed to open storage: {}", e);
                ApiError::internal(format!("Failed to open storage: {}", e))
            })?;

        Ok(Self::with_storage(config, storage))
    }

    /// Create a server around an already opened store
    pub fn with_storage(config: ServerConfig, storage: Storage) -> Self {
        let search = SearchService::new(config.search_backend);
        Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
            search: Arc::new(search),
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ApiError> {
        self.config
            .socket_addr()
            .map_err(|e| ApiError::internal(format!("Failed to parse address: {}", e)))
    }

    /// Application state sharing this server's store and index
    pub fn state(&self) -> AppState {
        AppState::new_from_arc(
            Arc::clone(&self.storage),
            Arc::clone(&self.search),
            self.config.clone(),
        )
    }

    /// Build the index from the whole store now
    ///
    /// Returns the number of indexed businesses.
    pub async fn build_index(&self) -> Result<usize, ApiError> {
        let storage = Arc::clone(&self.storage);
        let search = Arc::clone(&self.search);

        tokio::task::spawn_blocking(move || search.reindex_with(|| load_corpus(&storage)))
            .await?
    }

    /// Start server and run until a shutdown signal arrives
    pub async fn start(&self) -> Result<(), ApiError> {
        let addr = self.socket_addr()?;

        if self.config.index_on_startup {
            let indexed = self.build_index().await?;
            info!("Startup index build complete: {} businesses", indexed);
        }

        let app = create_app(self.state());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| {
                error!("Failed to bind to {}: {:?}", addr, e);
                ApiError::internal(format!("Failed to bind to {}: {}", addr, e))
            })?;

        info!("Server listening on: {}", self.server_url());

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ApiError::internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    /// Get storage reference
    #[must_use]
    pub fn storage(&self) -> Arc<Mutex<Storage>> {
        Arc::clone(&self.storage)
    }

    /// Get search service reference
    #[must_use]
    pub fn search(&self) -> Arc<SearchService> {
        Arc::clone(&self.search)
    }

    /// Get server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        self.config.server_url()
    }
}

/// Resolve on Ctrl+C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received TERM signal");
            }
            Err(e) => {
                error!("Failed to install TERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
