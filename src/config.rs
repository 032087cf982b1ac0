use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input, Password};
use std::fmt;
use std::io::Write;

use crate::auth::Credentials;
use crate::http_client::{OpenListHttpClient, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::monitor::{DEFAULT_FILE_SCAN_INTERVAL_SECS, DEFAULT_TASK_SCAN_INTERVAL_SECS};

/// OpenList Monitor - file and task sensors for an OpenList/AList server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// API key required by the sensor and service routes
    #[arg(short = 'k', long, env = "PROXY_API_KEY")]
    pub api_key: Option<String>,

    /// OpenList server URL, including http:// or https://
    #[arg(short = 'o', long, env = "OPENLIST_HOST")]
    pub openlist_host: Option<String>,

    /// OpenList username
    #[arg(short = 'u', long, env = "OPENLIST_USERNAME")]
    pub username: Option<String>,

    /// OpenList password
    #[arg(long, env = "OPENLIST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Comma separated directories whose file counts are tracked
    #[arg(short = 't', long, env = "OPENLIST_TRACK_DIRS")]
    pub track_dirs: Option<String>,

    /// Name used in sensor ids (defaults to the OpenList host)
    #[arg(short = 'n', long, env = "OPENLIST_NAME")]
    pub name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Root listing and tracked directory poll interval in seconds
    #[arg(long, env = "FILE_SCAN_INTERVAL", default_value_t = DEFAULT_FILE_SCAN_INTERVAL_SECS)]
    pub file_scan_interval: u64,

    /// Task queue poll interval in seconds
    #[arg(long, env = "TASK_SCAN_INTERVAL", default_value_t = DEFAULT_TASK_SCAN_INTERVAL_SECS)]
    pub task_scan_interval: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub http_timeout: u64,
}

#[derive(Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Authentication
    pub proxy_api_key: String,

    // OpenList connection
    pub openlist_host: String,
    pub openlist_username: String,
    pub openlist_password: String,
    pub track_dirs: Vec<String>,
    pub source_name: String,

    // Polling
    pub file_scan_interval: u64,
    pub task_scan_interval: u64,

    // HTTP client
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("openlist_host", &self.openlist_host)
            .field("openlist_username", &self.openlist_username)
            .field("openlist_password", &"***")
            .field("track_dirs", &self.track_dirs)
            .field("source_name", &self.source_name)
            .field("file_scan_interval", &self.file_scan_interval)
            .field("task_scan_interval", &self.task_scan_interval)
            .field("http_request_timeout", &self.http_request_timeout)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let openlist_host = args
            .openlist_host
            .context("OPENLIST_HOST is required (use -o or set OPENLIST_HOST env var)")?
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            server_host: args.host,
            server_port: args.port,

            proxy_api_key: args
                .api_key
                .context("PROXY_API_KEY is required (use -k or set PROXY_API_KEY env var)")?,

            openlist_username: args
                .username
                .context("OPENLIST_USERNAME is required (use -u or set OPENLIST_USERNAME env var)")?,
            openlist_password: args
                .password
                .context("OPENLIST_PASSWORD is required (use --password or set OPENLIST_PASSWORD env var)")?,
            track_dirs: args
                .track_dirs
                .as_deref()
                .map(parse_track_dirs)
                .unwrap_or_default(),
            source_name: args
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| openlist_host.clone()),
            openlist_host,

            file_scan_interval: args.file_scan_interval,
            task_scan_interval: args.task_scan_interval,

            http_request_timeout: args.http_timeout,

            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_host(&self.openlist_host).map_err(anyhow::Error::msg)?;

        if self.openlist_username.is_empty() || self.openlist_password.is_empty() {
            anyhow::bail!("OPENLIST_USERNAME and OPENLIST_PASSWORD must not be empty");
        }

        if self.proxy_api_key.is_empty() {
            anyhow::bail!("PROXY_API_KEY must not be empty");
        }

        if self.file_scan_interval == 0 || self.task_scan_interval == 0 {
            anyhow::bail!("FILE_SCAN_INTERVAL and TASK_SCAN_INTERVAL must be greater than zero");
        }

        if self.http_request_timeout == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be greater than zero");
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.openlist_host.clone(),
            self.openlist_username.clone(),
            self.openlist_password.clone(),
        )
    }
}

/// Reject hosts without an http:// or https:// scheme
pub fn validate_host(host: &str) -> std::result::Result<(), String> {
    if host.starts_with("http://") || host.starts_with("https://") {
        Ok(())
    } else {
        Err(format!(
            "OpenList host must start with http:// or https:// (got '{}')",
            host
        ))
    }
}

/// Split a comma separated directory list; entries are trimmed, empty ones
/// dropped and duplicates removed (first occurrence wins)
pub fn parse_track_dirs(input: &str) -> Vec<String> {
    let mut dirs: Vec<String> = Vec::new();
    for dir in input.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_string());
        }
    }
    dirs
}


// === Interactive Setup ===

/// Check if interactive setup is needed (no .env file and missing required values)
pub fn needs_interactive_setup() -> bool {
    let env_file_exists = std::path::Path::new(".env").exists();

    let missing = [
        "PROXY_API_KEY",
        "OPENLIST_HOST",
        "OPENLIST_USERNAME",
        "OPENLIST_PASSWORD",
    ]
    .iter()
    .any(|key| std::env::var(key).is_err());

    !env_file_exists && missing
}

/// Run interactive setup to collect required configuration
///
/// Credentials are verified with one login before anything is saved.
pub async fn run_interactive_setup() -> Result<InteractiveConfig> {
    println!();
    println!("OpenList Monitor - First Time Setup");
    println!("===================================");
    println!();
    println!("No configuration found. Let's connect to your OpenList server.");
    println!();

    let openlist_host: String = Input::new()
        .with_prompt("OpenList server URL (OPENLIST_HOST)")
        .default("https://".to_string())
        .validate_with(|input: &String| validate_host(input))
        .interact_text()
        .context("Failed to read OPENLIST_HOST")?;
    let openlist_host = openlist_host.trim_end_matches('/').to_string();

    let openlist_username: String = Input::new()
        .with_prompt("Username (OPENLIST_USERNAME)")
        .interact_text()
        .context("Failed to read OPENLIST_USERNAME")?;

    let openlist_password: String = Password::new()
        .with_prompt("Password (OPENLIST_PASSWORD)")
        .interact()
        .context("Failed to read OPENLIST_PASSWORD")?;

    if openlist_username.trim().is_empty() || openlist_password.is_empty() {
        anyhow::bail!("Username and password cannot be empty");
    }

    let track_dirs: String = Input::new()
        .with_prompt("Directories to track, comma separated (OPENLIST_TRACK_DIRS)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read OPENLIST_TRACK_DIRS")?;

    println!();
    println!("Verifying credentials...");
    verify_credentials(&openlist_host, &openlist_username, &openlist_password).await?;
    println!("Login successful.");
    println!();

    let proxy_api_key: String = Password::new()
        .with_prompt("Enter a password to protect the sensor API (PROXY_API_KEY)")
        .interact()
        .context("Failed to read PROXY_API_KEY")?;

    if proxy_api_key.is_empty() {
        anyhow::bail!("PROXY_API_KEY cannot be empty");
    }

    let server_port: String = Input::new()
        .with_prompt("Server port")
        .default("8000".to_string())
        .interact_text()
        .context("Failed to read server port")?;

    let config = InteractiveConfig {
        proxy_api_key,
        openlist_host,
        openlist_username,
        openlist_password,
        track_dirs: parse_track_dirs(&track_dirs),
        server_port,
    };

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&config)?;
        println!();
        println!("Configuration saved to .env file");
    }

    println!();
    println!("Setup complete! Starting monitor...");
    println!();

    Ok(config)
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub proxy_api_key: String,
    pub openlist_host: String,
    pub openlist_username: String,
    pub openlist_password: String,
    pub track_dirs: Vec<String>,
    pub server_port: String,
}

impl InteractiveConfig {
    /// Export the collected values so `Config::load()` picks them up
    pub fn apply_to_env(&self) {
        std::env::set_var("PROXY_API_KEY", &self.proxy_api_key);
        std::env::set_var("OPENLIST_HOST", &self.openlist_host);
        std::env::set_var("OPENLIST_USERNAME", &self.openlist_username);
        std::env::set_var("OPENLIST_PASSWORD", &self.openlist_password);
        std::env::set_var("OPENLIST_TRACK_DIRS", self.track_dirs.join(","));
        std::env::set_var("SERVER_PORT", &self.server_port);
    }
}

/// Perform a single login against the server
async fn verify_credentials(host: &str, username: &str, password: &str) -> Result<()> {
    let client = OpenListHttpClient::new(
        Credentials::new(host, username, password),
        DEFAULT_REQUEST_TIMEOUT_SECS,
    )?;

    client
        .auth_manager()
        .login()
        .await
        .context("Login failed, check the host and credentials")
}

fn env_file_content(config: &InteractiveConfig) -> String {
    format!(
        r#"# OpenList Monitor Configuration
# Generated by interactive setup

# API key protecting the sensor and service routes (required)
PROXY_API_KEY={}

# OpenList server (required)
OPENLIST_HOST={}
OPENLIST_USERNAME={}
OPENLIST_PASSWORD={}

# Directories whose file counts are tracked, comma separated
OPENLIST_TRACK_DIRS={}

# Server settings
SERVER_HOST=0.0.0.0
SERVER_PORT={}

# Poll intervals in seconds
FILE_SCAN_INTERVAL={}
TASK_SCAN_INTERVAL={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=info
"#,
        config.proxy_api_key,
        config.openlist_host,
        config.openlist_username,
        config.openlist_password,
        config.track_dirs.join(","),
        config.server_port,
        DEFAULT_FILE_SCAN_INTERVAL_SECS,
        DEFAULT_TASK_SCAN_INTERVAL_SECS,
    )
}

/// Save configuration to .env file
fn save_env_file(config: &InteractiveConfig) -> Result<()> {
    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(env_file_content(config).as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
