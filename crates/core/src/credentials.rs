//! Terminal login credentials loaded from the environment.
//!
//! - `MT5_LOGIN`: numeric account login
//! - `MT5_PASSWORD`: account password (never logged)
//! - `MT5_SERVER`: broker server name
//! - `MT5_PATH`: optional path to the terminal executable

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

pub const LOGIN_ENV: &str = "MT5_LOGIN";
pub const PASSWORD_ENV: &str = "MT5_PASSWORD";
pub const SERVER_ENV: &str = "MT5_SERVER";
pub const PATH_ENV: &str = "MT5_PATH";

#[derive(Clone)]
pub struct Credentials {
    pub login: u64,
    password: SecretString,
    pub server: String,
    pub path: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .field("server", &self.server)
            .field("path", &self.path)
            .finish()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(login: u64, password: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            login,
            password: SecretString::from(password.into()),
            server: server.into(),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Reads credentials from the process environment.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or the login is not an integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or the login is not an integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).with_context(|| format!("missing environment variable: {key}"))
        };

        let login_raw = required(LOGIN_ENV)?;
        let login = login_raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{LOGIN_ENV} must be an integer, got '{login_raw}'"))?;
        let password = required(PASSWORD_ENV)?;
        let server = required(SERVER_ENV)?;
        let path = lookup(PATH_ENV).filter(|p| !p.trim().is_empty());

        Ok(Self {
            login,
            password: SecretString::from(password),
            server,
            path,
        })
    }

    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}
