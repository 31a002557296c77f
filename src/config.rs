//! Process configuration from flags, environment and `.env`.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing::warn;

/// Secrets shorter than this are accepted but reported.
const RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Parser, Debug, Clone)]
#[command(name = "fleamarket")]
#[command(about = "Marketplace backend with JWT access/refresh authentication")]
#[command(version)]
pub struct Config {
    /// HS256 signing secret for access and refresh tokens
    #[arg(long, env = "SECRET_KEY", hide_env_values = true, global = true)]
    pub secret_key: Option<String>,

    /// Address to bind the HTTP server to
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0", global = true)]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080, global = true)]
    pub port: u16,

    /// SQLite database holding users and items
    #[arg(long, env = "DB_PATH", default_value = "fleamarket.db", global = true)]
    pub db_path: String,

    /// SQLite database holding the token blacklist
    #[arg(long, env = "TOKEN_DB_PATH", default_value = "token_blacklist.db", global = true)]
    pub token_db_path: String,

    /// Seconds between background purges of expired blacklist entries
    #[arg(
        long,
        env = "BLACKLIST_PURGE_INTERVAL_SECS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub purge_interval_secs: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create database schemas and exit
    Migrate,
    /// Remove expired blacklist entries once and exit
    PurgeTokens,
}

impl Config {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Serve)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    /// The signing secret, which `serve` cannot start without.
    pub fn require_secret(&self) -> Result<&str> {
        // Used exactly as given; surrounding whitespace is part of the key.
        let secret = match self.secret_key.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => bail!("SECRET_KEY must be set (flag --secret-key or environment)"),
        };

        if secret.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                "SECRET_KEY is only {} bytes; use at least {} for HS256",
                secret.len(),
                RECOMMENDED_SECRET_LEN
            );
        }
        Ok(secret)
    }
}
