//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// Gemini's OpenAI-compatible endpoint, used unless LLM_API_BASE overrides it.
const DEFAULT_LLM_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

const DEFAULT_CORS_ORIGINS: &str = "https://localhost:5173,https://127.0.0.1:5173";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable(s): {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How the service establishes the identity behind a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    /// Verify the Appwrite session cookie on protected routes (default).
    Session,
    /// Trust the `user_id` supplied by the client. Local development only.
    Trusted,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "session" => Ok(AuthMode::Session),
            "trusted" => Ok(AuthMode::Trusted),
            other => Err(format!("'{}' is not a valid auth mode", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub appwrite_endpoint: String,
    pub appwrite_project_id: String,
    pub appwrite_api_key: String,
    pub bucket_id: String,
    pub database_id: String,
    pub file_collection_id: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub llm_api_base: String,
    pub prompts_path: PathBuf,
    pub auth_mode: AuthMode,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    ///
    /// Every required variable is checked before returning, so a failed start
    /// names the complete set of missing variables rather than the first one.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Cloud Backend Settings (required) ---
        let mut missing: Vec<&str> = Vec::new();
        let mut require = |name: &'static str| match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.push(name);
                String::new()
            }
        };

        let appwrite_endpoint = require("APPWRITE_ENDPOINT")
            .trim_end_matches('/')
            .to_string();
        let appwrite_project_id = require("APPWRITE_PROJECT_ID");
        let appwrite_api_key = require("APPWRITE_API_KEY");
        let bucket_id = require("APPWRITE_BUCKET_ID");
        let database_id = require("APPWRITE_DATABASE_ID");
        let gemini_api_key = require("GEMINI_API_KEY");

        if !missing.is_empty() {
            return Err(ConfigError::MissingVar(missing.join(", ")));
        }

        let file_collection_id =
            std::env::var("FILE_COLLECTION_ID").unwrap_or_else(|_| "files".to_string());

        // --- Load LLM Settings ---
        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let llm_api_base =
            std::env::var("LLM_API_BASE").unwrap_or_else(|_| DEFAULT_LLM_API_BASE.to_string());

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        // --- Load Web Settings ---
        let auth_mode_str = std::env::var("AUTH_MODE").unwrap_or_else(|_| "session".to_string());
        let auth_mode = auth_mode_str
            .parse::<AuthMode>()
            .map_err(|e| ConfigError::InvalidValue("AUTH_MODE".to_string(), e))?;

        let cors_origins_str = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());
        let cors_allowed_origins = parse_origins(&cors_origins_str);

        Ok(Self {
            bind_address,
            log_level,
            appwrite_endpoint,
            appwrite_project_id,
            appwrite_api_key,
            bucket_id,
            database_id,
            file_collection_id,
            gemini_api_key,
            gemini_model,
            llm_api_base,
            prompts_path,
            auth_mode,
            cors_allowed_origins,
        })
    }

    /// The name of the Appwrite session cookie for this project.
    pub fn session_cookie_name(&self) -> String {
        format!("a_session_{}", self.appwrite_project_id)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
