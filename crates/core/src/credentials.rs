// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Credential resolution.
//!
//! A credential is resolved once per invocation from, in strict priority order:
//! 1. an explicit argument,
//! 2. a named environment variable,
//! 3. a key under a named section of a local TOML credentials file.
//!
//! ```toml
//! [ppio]
//! api_key = "sk-..."
//! ```
//!
//! Nothing is cached; rotating a key takes effect on the next resolution.

use crate::error::{CcApiError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// A resolved API key. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Where to look for one provider's credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    /// Environment variable name, e.g. `PPIO_API_KEY`.
    pub env_var: String,
    /// Section in the credentials file, e.g. `ppio`.
    pub section: String,
    /// Key inside the section, e.g. `api_key`.
    pub key: String,
}

impl CredentialSource {
    pub fn new(
        env_var: impl Into<String>,
        section: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self { env_var: env_var.into(), section: section.into(), key: key.into() }
    }

    pub fn ppio() -> Self {
        Self::new("PPIO_API_KEY", "ppio", "api_key")
    }

    pub fn volcengine() -> Self {
        Self::new("VOLCENGINE_API_KEY", "volcengine", "api_key")
    }

    pub fn minimax() -> Self {
        Self::new("MINIMAX_API_KEY", "minimax", "api_key")
    }
}

/// Environment variable lookup, injectable for tests.
pub trait EnvLookup: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Resolves credentials against an environment and an optional credentials file.
pub struct CredentialResolver<E = ProcessEnv> {
    env: E,
    file: Option<PathBuf>,
}

impl CredentialResolver<ProcessEnv> {
    pub const fn from_process(file: Option<PathBuf>) -> Self {
        Self { env: ProcessEnv, file }
    }
}

impl<E: EnvLookup> CredentialResolver<E> {
    pub const fn new(env: E, file: Option<PathBuf>) -> Self {
        Self { env, file }
    }

    /// Resolves the credential for `source`.
    ///
    /// Empty strings and template placeholders (`<your_..._here>`) count as absent.
    ///
    /// # Errors
    ///
    /// Returns `CcApiError::MissingCredential` when no tier yields a value, and
    /// `CcApiError::Configuration` if the credentials file exists but is not valid TOML.
    pub fn resolve(&self, explicit: Option<&str>, source: &CredentialSource) -> Result<Credential> {
        if let Some(value) = explicit.and_then(usable) {
            tracing::debug!(source = "argument", "Resolved credential");
            return Ok(Credential::new(value));
        }

        if let Some(value) = self.env.var(&source.env_var).as_deref().and_then(usable) {
            tracing::debug!(
                source = "environment",
                env_var = %source.env_var,
                "Resolved credential"
            );
            return Ok(Credential::new(value));
        }

        if let Some(path) = &self.file {
            if let Some(value) = read_file_key(path, &source.section, &source.key)? {
                tracing::debug!(source = "file", path = %path.display(), "Resolved credential");
                return Ok(Credential::new(value));
            }
        }

        let file_hint = self.file.as_ref().map_or_else(
            || "no credentials file configured".to_string(),
            |p| format!("[{}] {} in {}", source.section, source.key, p.display()),
        );
        Err(CcApiError::MissingCredential(format!(
            "provide an API key argument, set {}, or add {}",
            source.env_var, file_hint
        )))
    }
}

fn usable(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let placeholder = trimmed.starts_with("<your_") && trimmed.ends_with('>');
    (!trimmed.is_empty() && !placeholder).then_some(trimmed)
}

fn read_file_key(path: &Path, section: &str, key: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&raw).map_err(|e| {
        CcApiError::Configuration(format!("invalid credentials file {}: {e}", path.display()))
    })?;
    Ok(table
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(toml::Value::as_str)
        .and_then(usable)
        .map(str::to_string))
}
