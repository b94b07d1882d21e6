//! API-credential resolution for the enrichment service.
//!
//! Lookup order, first non-empty value wins:
//!
//! 1. [`AnalysisConfig::api_key`] — set explicitly by the host
//! 2. `OPENROUTER_API_KEY` in the process environment
//! 3. each of [`AnalysisConfig::credential_files`], parsed as a dotenv file
//! 4. [`AnalysisConfig::inline_api_key`] — injected by the host at start-up
//!
//! A missing credential is fatal and never retried; it is a deployment
//! problem, not an upstream hiccup. The pipeline goes through
//! [`AnalysisConfig::resolve_credential`], which looks the key up once per
//! config and keeps it.

use crate::config::AnalysisConfig;
use crate::error::AnalyzeError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable (and dotenv key) holding the enrichment credential.
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Where a resolved credential came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    File(PathBuf),
    Inline,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => f.write_str("config"),
            CredentialSource::Environment => write!(f, "env:{API_KEY_VAR}"),
            CredentialSource::File(p) => write!(f, "file:{}", p.display()),
            CredentialSource::Inline => f.write_str("inline"),
        }
    }
}

/// A resolved API key. `Debug` never prints the secret.
#[derive(Clone)]
pub struct Credential {
    key: String,
    source: CredentialSource,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("len", &self.key.len())
            .finish()
    }
}

impl Credential {
    pub fn secret(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }
}

/// Resolve the enrichment credential using the real process environment.
pub fn resolve_api_key(config: &AnalysisConfig) -> Result<Credential, AnalyzeError> {
    resolve_with_env(config, |name| std::env::var(name).ok())
}

/// Resolve the credential with an injectable environment lookup.
pub fn resolve_with_env<F>(config: &AnalysisConfig, env: F) -> Result<Credential, AnalyzeError>
where
    F: Fn(&str) -> Option<String>,
{
    let found = non_empty(config.api_key.clone())
        .map(|k| (k, CredentialSource::Config))
        .or_else(|| non_empty(env(API_KEY_VAR)).map(|k| (k, CredentialSource::Environment)))
        .or_else(|| {
            config.credential_files.iter().find_map(|p| {
                non_empty(read_key_from_file(p)).map(|k| (k, CredentialSource::File(p.clone())))
            })
        })
        .or_else(|| non_empty(config.inline_api_key.clone()).map(|k| (k, CredentialSource::Inline)));

    match found {
        Some((key, source)) => {
            info!("Using enrichment credential from {}", source);
            Ok(Credential { key, source })
        }
        None => Err(AnalyzeError::CredentialMissing {
            hint: format!(
                "Set {API_KEY_VAR} in the environment, add it to one of {:?}, \
                 or pass an API key in the configuration.",
                config.credential_files
            ),
        }),
    }
}

/// Read `OPENROUTER_API_KEY` from a dotenv file, ignoring unreadable files.
fn read_key_from_file(path: &Path) -> Option<String> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            debug!("Credential file {} not usable: {}", path.display(), e);
            return None;
        }
    };
    iter.filter_map(Result::ok)
        .find(|(k, _)| k == API_KEY_VAR)
        .map(|(_, v)| v)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
