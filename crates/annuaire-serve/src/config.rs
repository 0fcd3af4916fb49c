//! Server configuration from TOML or environment

use annuaire_recherche::{SearchBackend, DEFAULT_TOP_K};
use annuaire_stockage::KEYWORD_RESULT_LIMIT;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Default host address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port number
pub const DEFAULT_PORT: u16 = 8000;

/// Default CORS origins (local frontend during development)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "ANNUAIRE_";

/// Server configuration loaded from TOML
///
/// Missing keys in a TOML file fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Path to SQLite database
    pub db_path: String,

    /// Enable request logging
    pub enable_logging: bool,

    /// Log level for tracing
    pub log_level: String,

    /// Bearer tokens allowed to call admin endpoints
    pub admin_tokens: Vec<String>,

    /// Ranking backend for semantic search
    pub search_backend: SearchBackend,

    /// Result count when a semantic query omits `top_k`
    pub default_top_k: usize,

    /// Maximum keyword search results
    pub keyword_limit: usize,

    /// Build the lexical index before accepting requests
    pub index_on_startup: bool,

    /// Switch for generative answers over search results
    ///
    /// Read and reported at startup; no endpoint consumes it yet.
    pub generative_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            cors_origins: Self::default_cors_origins(),
            db_path: Self::default_db_path(),
            enable_logging: true,
            log_level: Self::default_log_level(),
            admin_tokens: Vec::new(),
            search_backend: SearchBackend::default(),
            default_top_k: DEFAULT_TOP_K,
            keyword_limit: KEYWORD_RESULT_LIMIT,
            index_on_startup: false,
            generative_enabled: false,
        }
    }
}

impl ServerConfig {
    /// Default host value
    fn default_host() -> String {
        DEFAULT_HOST.to_string()
    }

    /// Default port value
    fn default_port() -> u16 {
        DEFAULT_PORT
    }

    /// Default CORS origins
    fn default_cors_origins() -> Vec<String> {
        DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
    }

    /// Default database path
    fn default_db_path() -> String {
        "annuaire.db".to_string()
    }

    /// Default log level
    fn default_log_level() -> String {
        "info".to_string()
    }

    /// Load configuration: defaults, then the optional TOML file, then
    /// environment overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Optional TOML file; a given path that does not exist is an error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `ANNUAIRE_*` overrides using `lookup` to read variables
    ///
    /// Environment variables:
    /// - `ANNUAIRE_HOST` - Server host
    /// - `ANNUAIRE_PORT` - Server port
    /// - `ANNUAIRE_DB_PATH` - Database path
    /// - `ANNUAIRE_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
    /// - `ANNUAIRE_ADMIN_TOKENS` - Comma separated admin bearer tokens
    /// - `ANNUAIRE_INDEX_ON_STARTUP` - Build the index at startup (true/false)
    /// - `ANNUAIRE_SEARCH_BACKEND` - Ranking backend (`tfidf`)
    /// - `ANNUAIRE_GENERATIVE_ENABLED` - Generative answers switch (true/false)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(host) = var("HOST") {
            self.host = host;
        }

        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}PORT: {}", ENV_PREFIX, port))?;
        }

        if let Some(db_path) = var("DB_PATH") {
            self.db_path = db_path;
        }

        if let Some(log_level) = var("LOG_LEVEL") {
            self.log_level = log_level.trim().to_lowercase();
        }

        if let Some(tokens) = var("ADMIN_TOKENS") {
            self.admin_tokens = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(flag) = var("INDEX_ON_STARTUP") {
            self.index_on_startup = parse_flag("INDEX_ON_STARTUP", &flag)?;
        }

        if let Some(backend) = var("SEARCH_BACKEND") {
            self.search_backend = backend
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid {}SEARCH_BACKEND: {}", ENV_PREFIX, e))?;
        }

        if let Some(flag) = var("GENERATIVE_ENABLED") {
            self.generative_enabled = parse_flag("GENERATIVE_ENABLED", &flag)?;
        }

        Ok(())
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid address: {}", e))
    }

    /// Get the full server URL (e.g., "http://127.0.0.1:8000")
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Whether `token` grants admin access
    pub fn is_admin_token(&self, token: &str) -> bool {
        self.admin_tokens.iter().any(|t| t == token)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be zero".to_string());
        }

        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.default_top_k == 0 {
            return Err("Default top_k must be greater than zero".to_string());
        }

        if self.keyword_limit == 0 {
            return Err("Keyword limit must be greater than zero".to_string());
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => {
                return Err(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.log_level
                ));
            }
        }

        Ok(())
    }
}

/// Parse a boolean environment switch
fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("Invalid {}{}: {}", ENV_PREFIX, name, other),
    }
}
