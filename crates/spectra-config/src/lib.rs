//! Configuration for the spectra broker.
//!
//! TOML file in the platform config directory, layered with `SPECTRA_*`
//! environment variables, credential resolution (env + keyring +
//! plaintext), and translation to `spectra_core::BrokerConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use spectra_core::{BackendConfig, BackendKind, BrokerConfig};

/// Keyring service name; entries are keyed `<backend-id>/token`.
pub const KEYRING_SERVICE: &str = "spectra";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Backends keyed by id. Registered in id order.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Default CLI output format.
    #[serde(default = "default_output")]
    pub output: String,

    /// Upper bound on every backend call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Upper bound on liveness probes, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_probe_timeout_ms() -> u64 {
    1000
}
fn default_enabled() -> bool {
    true
}

/// One `[backends.<id>]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendEntry {
    /// "openrazer", "http" or "memory".
    pub kind: String,

    /// Base URL of an HTTP bridge daemon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Seed a memory backend with showcase devices.
    #[serde(default)]
    pub demo: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BackendEntry {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: None,
            token: None,
            token_env: None,
            demo: false,
            enabled: true,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "spectra", "spectra").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("spectra");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment.
///
/// A missing file is not an error; defaults and environment still apply.
/// Environment keys nest with `__`, e.g. `SPECTRA_DEFAULTS__TIMEOUT_MS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SPECTRA_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Render `config` as TOML with plaintext tokens masked.
pub fn render_redacted(config: &Config) -> Result<String, ConfigError> {
    let backends = config
        .backends
        .iter()
        .map(|(id, entry)| {
            let mut entry = entry.clone();
            if entry.token.is_some() {
                entry.token = Some("********".into());
            }
            (id.clone(), entry)
        })
        .collect();
    let redacted = Config {
        defaults: config.defaults.clone(),
        backends,
    };
    Ok(toml::to_string_pretty(&redacted)?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a backend's bearer token.
///
/// Order: the variable named by `token_env`, then the system keyring,
/// then the plaintext `token`. `None` when none is set; tokens are
/// optional.
pub fn resolve_token(id: &str, entry: &BackendEntry) -> Option<SecretString> {
    // 1. Env var named in the config
    if let Some(ref env_name) = entry.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(keyring_entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{id}/token")) {
        if let Ok(secret) = keyring_entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    entry.token.clone().map(SecretString::from)
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the core's `BackendKind` for one entry.
pub fn backend_kind(id: &str, entry: &BackendEntry) -> Result<BackendKind, ConfigError> {
    match entry.kind.as_str() {
        "openrazer" => Ok(BackendKind::OpenRazer),
        "http" => {
            let raw = entry.url.as_deref().ok_or_else(|| ConfigError::Validation {
                field: format!("backends.{id}.url"),
                reason: "required for http backends".into(),
            })?;
            let url = Url::parse(raw).map_err(|e| ConfigError::Validation {
                field: format!("backends.{id}.url"),
                reason: format!("invalid URL {raw:?}: {e}"),
            })?;
            Ok(BackendKind::Http {
                url,
                token: resolve_token(id, entry),
            })
        }
        "memory" => Ok(BackendKind::Memory { demo: entry.demo }),
        other => Err(ConfigError::Validation {
            field: format!("backends.{id}.kind"),
            reason: format!("expected 'openrazer', 'http', or 'memory', got '{other}'"),
        }),
    }
}

fn millis(field: &str, value: u64) -> Result<Duration, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(value))
}

/// Build a `BrokerConfig` from a loaded config.
///
/// With no backends configured the broker gets a single `openrazer`
/// backend.
pub fn to_broker_config(config: &Config) -> Result<BrokerConfig, ConfigError> {
    let call_timeout = millis("defaults.timeout_ms", config.defaults.timeout_ms)?;
    let probe_timeout = millis("defaults.probe_timeout_ms", config.defaults.probe_timeout_ms)?;

    if config.backends.is_empty() {
        return Ok(BrokerConfig {
            call_timeout,
            probe_timeout,
            ..BrokerConfig::default()
        });
    }

    let mut backends = Vec::with_capacity(config.backends.len());
    for (id, entry) in &config.backends {
        let mut backend = BackendConfig::new(id, backend_kind(id, entry)?);
        backend.enabled = entry.enabled;
        backends.push(backend);
    }

    Ok(BrokerConfig {
        backends,
        call_timeout,
        probe_timeout,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_openrazer_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(config.backends.is_empty());

        let broker = to_broker_config(&config).unwrap();
        assert_eq!(broker.backends.len(), 1);
        assert_eq!(broker.backends[0].id, "openrazer");
        assert_eq!(broker.call_timeout, Duration::from_secs(5));
        assert_eq!(broker.probe_timeout, Duration::from_secs(1));
    }

    #[test]
    fn backends_register_in_id_order() {
        let file = write(
            r#"
            [defaults]
            timeout_ms = 250

            [backends.zeta]
            kind = "memory"
            demo = true

            [backends.bridge]
            kind = "http"
            url = "http://127.0.0.1:9123/api/v1/"
            token = "plain"

            [backends.alpha]
            kind = "openrazer"
            enabled = false
            "#,
        );
        let config = load_config_from(file.path()).unwrap();
        let broker = to_broker_config(&config).unwrap();

        let ids: Vec<&str> = broker.backends.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "bridge", "zeta"]);
        assert!(!broker.backends[0].enabled);
        assert_eq!(broker.call_timeout, Duration::from_millis(250));
        assert!(matches!(broker.backends[2].kind, BackendKind::Memory { demo: true }));
    }

    #[test]
    fn http_without_url_is_rejected() {
        let file = write("[backends.bridge]\nkind = \"http\"\n");
        let config = load_config_from(file.path()).unwrap();
        let err = to_broker_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Validation { ref field, .. } if field == "backends.bridge.url"
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let file = write("[backends.x]\nkind = \"carrier-pigeon\"\n");
        let config = load_config_from(file.path()).unwrap();
        assert!(matches!(
            to_broker_config(&config).unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let file = write("[defaults]\nprobe_timeout_ms = 0\n");
        let config = load_config_from(file.path()).unwrap();
        assert!(to_broker_config(&config).is_err());
    }

    #[test]
    fn plaintext_token_is_the_last_resort() {
        let mut entry = BackendEntry::new("http");
        entry.token_env = Some("SPECTRA_TEST_TOKEN_THAT_IS_NEVER_SET".into());
        entry.token = Some("from-file".into());

        let token = resolve_token("spectra-test-nonexistent", &entry).unwrap();
        assert_eq!(token.expose_secret(), "from-file");

        entry.token = None;
        assert!(resolve_token("spectra-test-nonexistent", &entry).is_none());
    }

    #[test]
    fn redaction_masks_tokens() {
        let mut config = Config::default();
        let mut entry = BackendEntry::new("http");
        entry.url = Some("http://localhost/".into());
        entry.token = Some("hunter2".into());
        config.backends.insert("bridge".into(), entry);

        let rendered = render_redacted(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
        assert_eq!(config.backends["bridge"].token.as_deref(), Some("hunter2"));
    }
}
