//! resource-directory
//!
//! HTTP server for the mental-health resource directory.
//!
//! Every flag can also be set through the environment, and a `.env` file in
//! the working directory is read first.
//!
//! # Usage
//!
//! ```bash
//! GEMINI_API_KEY=... ADMIN_PASSWORD=... resource-directory --port 5000 --persist
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use resource_directory::{
    auth::AuthConfig,
    classifier::{ClassifierConfig, ClassifierMode, FallbackPolicy},
    model::{GeminiConfig, GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL},
    server::{DirectoryServer, ServerConfig},
    storage::StorageConfig,
};

/// Mental-health resource directory server
#[derive(Parser, Debug)]
#[command(name = "resource-directory")]
#[command(about = "Resource directory with free-text category triage")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Path for persistent storage
    #[arg(long, env = "STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// Enable disk persistence
    #[arg(long, env = "PERSIST")]
    persist: bool,

    /// Search classification strategy
    #[arg(long, env = "CLASSIFIER_MODE", value_enum, default_value = "semantic")]
    classifier: ClassifierMode,

    /// What to do when the model call fails
    #[arg(long, env = "CLASSIFIER_FALLBACK", value_enum, default_value = "text-match")]
    fallback: FallbackPolicy,

    /// Gemini API key (semantic mode degrades to keywords without it)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = GEMINI_DEFAULT_MODEL)]
    gemini_model: String,

    /// Gemini endpoint prefix
    #[arg(long, env = "GEMINI_BASE_URL", default_value = GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// Model request timeout, e.g. "10s" (unset waits indefinitely)
    #[arg(long, env = "MODEL_TIMEOUT", value_parser = humantime::parse_duration)]
    model_timeout: Option<Duration>,

    /// Cached classifications (0 disables)
    #[arg(long, env = "CLASSIFIER_CACHE_SIZE", default_value = "256")]
    classifier_cache_size: usize,

    /// List resources as a bare array instead of {count, message, data}
    #[arg(long, env = "LEGACY_RESPONSE")]
    legacy_response: bool,

    /// Admin username
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    admin_username: String,

    /// Admin password (login is disabled when unset)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    /// Admin session lifetime, e.g. "12h"
    #[arg(long, env = "SESSION_TTL", value_parser = humantime::parse_duration, default_value = "12h")]
    session_ttl: Duration,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let storage_config = StorageConfig {
        persist_path: args.storage_path,
        enable_persistence: args.persist,
    };

    let classifier_config = ClassifierConfig {
        mode: args.classifier,
        model: GeminiConfig {
            api_key: args.gemini_api_key,
            model: args.gemini_model,
            base_url: args.gemini_base_url,
            timeout: args.model_timeout,
        },
        cache_size: args.classifier_cache_size,
        fallback: args.fallback,
    };
    tracing::info!(
        "Model API key {}",
        if classifier_config.model.has_api_key() {
            "found"
        } else {
            "not set"
        }
    );

    let auth_config = AuthConfig::new(args.admin_username, args.admin_password.unwrap_or_default())
        .with_session_ttl(args.session_ttl);

    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
        storage: storage_config,
        classifier: classifier_config,
        auth: auth_config,
        legacy_response: args.legacy_response,
    };

    tracing::info!(
        "Starting resource directory on {}:{}",
        server_config.host,
        server_config.port
    );
    let server = DirectoryServer::new(server_config)?;
    server.run().await?;

    Ok(())
}
