//! annuaire-serve - HTTP Search Server
//!
//! *Le Serveur* (The Server) - Axum-based search endpoints for the Annuaire business directory

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// API error types
pub mod error;

/// HTTP handlers for REST endpoints
pub mod handlers;

/// Server configuration from TOML and environment
pub mod config;

/// Admin bearer-token gate
pub mod auth;

/// API response types
pub mod responses;

/// Server instance management
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use handlers::{create_app, create_router, AppState};
pub use server::AnnuaireServer;
