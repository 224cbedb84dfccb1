//! Ledger and deployment configuration.
//!
//! [`LedgerConfig`] is the value every emitting or reading operation takes:
//! where the ledger lives and which tenant receipts are written for. Library
//! code never consults the environment; only [`FopConfig`] resolution does,
//! and only the CLI calls it.
//!
//! Resolution order, later sources overriding earlier ones:
//!
//! 1. Built-in defaults (`receipts.jsonl`, `fishoilproof-demo`,
//!    `https://verify.fishoilproof.io`).
//! 2. An optional YAML file.
//! 3. Environment: `FOP_LEDGER_PATH`, `FOP_TENANT_ID`, `FOP_VERIFY_BASE_URL`.
//! 4. Explicit overrides applied by the caller (CLI flags).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::FopError;
use crate::identity::TenantId;

/// Default ledger file, relative to the working directory.
pub const DEFAULT_LEDGER_PATH: &str = "receipts.jsonl";

/// Default tenant for receipts emitted without an explicit tenant.
pub const DEFAULT_TENANT_ID: &str = "fishoilproof-demo";

/// Default base for consumer verification links.
pub const DEFAULT_VERIFY_BASE_URL: &str = "https://verify.fishoilproof.io";

/// Where receipts are appended and on whose behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Path of the append-only JSONL ledger.
    pub ledger_path: PathBuf,
    /// Tenant stamped into every emitted envelope.
    pub tenant_id: TenantId,
}

impl LedgerConfig {
    /// Build a config for `ledger_path` with the given tenant.
    pub fn new(ledger_path: impl Into<PathBuf>, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            ledger_path: ledger_path.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Same ledger, different tenant. Used when a receipt inherits the tenant
    /// of another receipt (anomalies inherit from their source).
    pub fn with_tenant(&self, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            ledger_path: self.ledger_path.clone(),
            tenant_id: tenant_id.into(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_PATH, DEFAULT_TENANT_ID)
    }
}

/// Full deployment configuration resolved by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FopConfig {
    /// Ledger location and tenant.
    pub ledger: LedgerConfig,
    /// Base URL for consumer verification links in QR payloads. Values from
    /// a file or the environment are checked with [`Url::parse`] first.
    pub verification_base_url: String,
}

/// On-disk YAML shape. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    ledger_path: Option<PathBuf>,
    tenant_id: Option<String>,
    verification_base_url: Option<String>,
}

impl FopConfig {
    /// Resolve configuration: defaults, then `path` (if given), then the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`FopError::Config`] if the file cannot be read or parsed, or
    /// if the verification base URL is not a valid URL.
    pub fn load(path: Option<&Path>) -> Result<Self, FopError> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load a YAML file on top of the built-in defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, FopError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FopError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Parse YAML text on top of the built-in defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, FopError> {
        let file: FileConfig = if text.trim().is_empty() {
            FileConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| FopError::Config(format!("invalid YAML: {e}")))?
        };

        let mut config = Self::default();
        if let Some(p) = file.ledger_path {
            config.ledger.ledger_path = p;
        }
        if let Some(t) = file.tenant_id {
            config.ledger.tenant_id = TenantId(t);
        }
        if let Some(u) = file.verification_base_url {
            config.verification_base_url = parse_base_url("verification_base_url", &u)?;
        }
        Ok(config)
    }

    /// Apply `FOP_*` overrides using `lookup` to read variables.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), FopError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup("FOP_LEDGER_PATH").filter(|s| !s.is_empty()) {
            self.ledger.ledger_path = PathBuf::from(p);
        }
        if let Some(t) = lookup("FOP_TENANT_ID").filter(|s| !s.is_empty()) {
            self.ledger.tenant_id = TenantId(t);
        }
        if let Some(u) = lookup("FOP_VERIFY_BASE_URL").filter(|s| !s.is_empty()) {
            self.verification_base_url = parse_base_url("FOP_VERIFY_BASE_URL", &u)?;
        }
        Ok(())
    }

    /// The consumer verification link for `lot`: `<base>/<lot>`.
    pub fn verification_url(&self, lot: &str) -> String {
        verification_url(&self.verification_base_url, lot)
    }
}

impl Default for FopConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            verification_base_url: DEFAULT_VERIFY_BASE_URL.to_string(),
        }
    }
}

/// Join a base URL and a lot number with exactly one `/`.
pub fn verification_url(base: &str, lot: &str) -> String {
    format!("{}/{lot}", base.trim_end_matches('/'))
}

fn parse_base_url(source: &str, raw: &str) -> Result<String, FopError> {
    let url = Url::parse(raw).map_err(|e| FopError::Config(format!("invalid URL for {source}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(FopError::Config(format!(
            "invalid URL for {source}: {raw} cannot be used as a base"
        )));
    }
    Ok(raw.to_string())
}
