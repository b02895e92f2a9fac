//! Client configuration parsed from environment variables.
//!
//! The base URL is resolved once at startup: an explicit override wins, then
//! the default for the selected deployment environment, then a hardcoded
//! fallback. The canonical base includes the `/api` route prefix, so service
//! paths are written as `/auth/...` and `/books/...`.

use std::path::PathBuf;

use crate::error::ApiError;

pub const DEVELOPMENT_BASE_URL: &str = "http://localhost:5000/api";
pub const PRODUCTION_BASE_URL: &str = "https://mini-library-backend.onrender.com/api";
pub const FALLBACK_BASE_URL: &str = PRODUCTION_BASE_URL;

pub const BASE_URL_ENV: &str = "LIBRARY_API_URL";
pub const DEPLOY_ENV: &str = "LIBRARY_ENV";
pub const HOME_ENV: &str = "LIBRIS_HOME";

const TOKEN_FILE: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse a deployment flag. Unrecognized values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub environment: Option<Environment>,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `LIBRARY_API_URL`: explicit backend base URL
    /// - `LIBRARY_ENV`: `development` or `production`
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved base URL is not a valid http(s) URL.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::resolve(std::env::var(BASE_URL_ENV).ok().as_deref(), std::env::var(DEPLOY_ENV).ok().as_deref())
    }

    /// Resolve config from an optional override and an optional environment flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved base URL is not a valid http(s) URL.
    pub fn resolve(override_url: Option<&str>, environment: Option<&str>) -> Result<Self, ApiError> {
        let environment = environment.and_then(Environment::parse);
        let base_url = resolve_base_url(override_url, environment);
        validate_base_url(&base_url)?;
        Ok(Self { base_url, environment })
    }
}

/// Pick the base URL by priority: override, environment default, fallback.
/// Blank overrides are ignored; trailing slashes are stripped.
#[must_use]
pub fn resolve_base_url(override_url: Option<&str>, environment: Option<Environment>) -> String {
    let chosen = override_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| environment.map_or(FALLBACK_BASE_URL, Environment::default_base_url));
    chosen.trim_end_matches('/').to_owned()
}

fn validate_base_url(raw: &str) -> Result<(), ApiError> {
    let url = reqwest::Url::parse(raw).map_err(|e| ApiError::InvalidBaseUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl(format!("{raw}: unsupported scheme {}", url.scheme())));
    }
    Ok(())
}

/// Directory holding libris state: `LIBRIS_HOME`, else `~/.config/libris`.
///
/// # Errors
///
/// Returns an error if neither `LIBRIS_HOME` nor a home directory is available.
pub fn libris_home() -> Result<PathBuf, ApiError> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join("libris"))
        .ok_or_else(|| ApiError::Storage(std::io::Error::other("could not determine home directory")))
}

/// Path of the durable credential file.
///
/// # Errors
///
/// Returns an error if the libris home directory cannot be determined.
pub fn credential_path() -> Result<PathBuf, ApiError> {
    Ok(libris_home()?.join(TOKEN_FILE))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
