//! Environment variable helpers used when wiring upstream clients.
//!
//! Credentials for the batch and real-time stores never live in config
//! files; they are read from the process environment and wrapped in
//! [`SecretString`] so they don't leak through `Debug` output.

use secrecy::SecretString;
use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// Empty values are treated as missing.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Reads an optional environment variable. Unset and empty both map to `None`.
pub fn get_optional_env_var(name: &str) -> Option<String> {
    get_env_var(name).ok()
}

/// Reads a credential from the environment and wraps it as a secret.
pub fn get_secret_env_var(name: &str) -> Result<SecretString, MissingEnvVarError> {
    get_env_var(name).map(|v| SecretString::new(v.into()))
}
