//! Shared configuration for the boycivenga CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), the
//! CI transport-safety gate, and translation to
//! `boycivenga_core::ControllerConfig`. Nothing here talks to a controller.
//!
//! Environment access goes through an [`EnvLookup`] so resolution can be
//! exercised without touching the process environment.

use std::collections::HashMap;
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

use boycivenga_core::{
    AuthCredentials, ControllerConfig, ControllerPlatform, RetryPolicy, TlsVerification,
};

/// Keyring service name; entries are keyed `<profile>/password`.
pub const KEYRING_SERVICE: &str = "boycivenga";
pub const DEFAULT_SITE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in configuration")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("no controller URL configured")]
    NoController { path: PathBuf },

    #[error("insecure TLS requested via {via} while running under CI")]
    InsecureTransportInCi { via: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Environment access ──────────────────────────────────────────────

/// Read-only view of environment variables.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// The real process environment. Empty values count as unset.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn first_env(env: EnvLookup<'_>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| env(key).filter(|v| !v.is_empty()))
}

fn is_true(value: Option<String>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Directory holding `{site}-networks.json` state files.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            state_dir: default_state_dir(),
            max_retries: default_max_retries(),
            color: default_color(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}
fn default_max_retries() -> u32 {
    RetryPolicy::default().max_retries
}
fn default_color() -> String {
    "auto".into()
}

/// How the controller platform is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformSetting {
    /// Probe the controller on connect.
    #[default]
    Auto,
    UnifiOs,
    Classic,
}

impl PlatformSetting {
    pub fn pinned(self) -> Option<ControllerPlatform> {
        match self {
            Self::Auto => None,
            Self::UnifiOs => Some(ControllerPlatform::UnifiOs),
            Self::Classic => Some(ControllerPlatform::ClassicController),
        }
    }
}

/// A named controller profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub controller: Option<String>,

    pub site: Option<String>,

    #[serde(default)]
    pub platform: PlatformSetting,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,

    pub max_retries: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "boycivenga", "boycivenga").map_or_else(
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
    p.push("boycivenga");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from the canonical path plus `BOYCIVENGA_*` env vars.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` plus `BOYCIVENGA_*` env vars.
///
/// A missing file yields defaults. Nested keys use a double underscore:
/// `BOYCIVENGA_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading configuration");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BOYCIVENGA_").split("__"));

    Ok(figment.extract()?)
}

impl Config {
    /// Pick the active profile: an explicit name must exist, the default
    /// one may be absent (env-only operation).
    pub fn select_profile<'a>(
        &'a self,
        requested: Option<&'a str>,
    ) -> Result<Option<(&'a str, &'a Profile)>, ConfigError> {
        if let Some(name) = requested {
            return self
                .profiles
                .get(name)
                .map(|p| Some((name, p)))
                .ok_or_else(|| {
                    let mut available: Vec<String> = self.profiles.keys().cloned().collect();
                    available.sort();
                    ConfigError::ProfileNotFound {
                        name: name.into(),
                        available,
                    }
                });
        }

        let name = self.default_profile.as_deref().unwrap_or("default");
        Ok(self.profiles.get(name).map(|p| (name, p)))
    }
}

// ── CI transport gate ───────────────────────────────────────────────

/// Whether the process runs under a CI system.
pub fn is_ci(env: EnvLookup<'_>) -> bool {
    is_true(env("GITHUB_ACTIONS")) || is_true(env("CI"))
}

/// The env var that requests insecure TLS, if any does.
pub fn insecure_env(env: EnvLookup<'_>) -> Option<&'static str> {
    ["UNIFI_ALLOW_INSECURE", "TF_VAR_unifi_allow_insecure"]
        .into_iter()
        .find(|key| is_true(env(key)))
}

/// Refuse insecure TLS under CI, whatever requested it.
///
/// Runs before any input is processed.
pub fn enforce_ci_tls_policy(
    env: EnvLookup<'_>,
    insecure_flag: bool,
    profile: Option<&Profile>,
) -> Result<(), ConfigError> {
    if !is_ci(env) {
        return Ok(());
    }

    let via = if insecure_flag {
        Some("--insecure".to_owned())
    } else if let Some(key) = insecure_env(env) {
        Some(key.to_owned())
    } else if profile.and_then(|p| p.insecure).unwrap_or(false) {
        Some("profile setting 'insecure'".to_owned())
    } else {
        None
    };

    match via {
        Some(via) => Err(ConfigError::InsecureTransportInCi { via }),
        None => Ok(()),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Username: flag, profile, `UNIFI_USERNAME`, `TF_VAR_unifi_username`.
pub fn resolve_username(
    flag: Option<&str>,
    profile: Option<&Profile>,
    env: EnvLookup<'_>,
) -> Option<String> {
    flag.map(str::to_owned)
        .or_else(|| profile.and_then(|p| p.username.clone()))
        .or_else(|| first_env(env, &["UNIFI_USERNAME", "TF_VAR_unifi_username"]))
}

/// Password: `UNIFI_PASSWORD`, `TF_VAR_unifi_password`, keyring, profile plaintext.
pub fn resolve_password(
    profile_name: &str,
    profile: Option<&Profile>,
    env: EnvLookup<'_>,
) -> Option<SecretString> {
    if let Some(pw) = first_env(env, &["UNIFI_PASSWORD", "TF_VAR_unifi_password"]) {
        return Some(SecretString::from(pw));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            debug!(profile = profile_name, "password from keyring");
            return Some(SecretString::from(pw));
        }
    }

    profile
        .and_then(|p| p.password.clone())
        .map(SecretString::from)
}

/// Who applied: `GITHUB_ACTOR`, `USER`, or "unknown".
pub fn resolve_actor(env: EnvLookup<'_>) -> String {
    first_env(env, &["GITHUB_ACTOR", "USER"]).unwrap_or_else(|| "unknown".into())
}

// ── ControllerConfig translation ────────────────────────────────────

/// Command-line values that take priority over the profile.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub controller: Option<String>,
    pub site: Option<String>,
    pub username: Option<String>,
    pub insecure: bool,
    pub timeout: Option<u64>,
}

/// Site: flag, profile, then "default".
pub fn resolve_site(overrides: &Overrides, profile: Option<&Profile>) -> String {
    overrides
        .site
        .clone()
        .or_else(|| profile.and_then(|p| p.site.clone()))
        .unwrap_or_else(|| DEFAULT_SITE.into())
}

/// Build a `ControllerConfig` from profile, overrides and environment.
pub fn resolve_controller_config(
    config: &Config,
    profile: Option<(&str, &Profile)>,
    overrides: &Overrides,
    env: EnvLookup<'_>,
) -> Result<ControllerConfig, ConfigError> {
    let (profile_name, profile) = match profile {
        Some((name, p)) => (name, Some(p)),
        None => ("default", None),
    };

    // 1. Controller URL (flag > profile > env)
    let url_str = overrides
        .controller
        .clone()
        .or_else(|| profile.and_then(|p| p.controller.clone()))
        .or_else(|| first_env(env, &["UNIFI_CONTROLLER_URL"]))
        .ok_or_else(|| ConfigError::NoController {
            path: config_path(),
        })?;
    let url: url::Url = url_str.parse().map_err(|_| ConfigError::Validation {
        field: "controller".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    // 2. Credentials
    let username = resolve_username(overrides.username.as_deref(), profile, env);
    let password = resolve_password(profile_name, profile, env);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ConfigError::NoCredentials {
            profile: profile_name.into(),
        });
    };

    // 3. TLS verification
    let insecure = overrides.insecure
        || profile.and_then(|p| p.insecure).unwrap_or(false)
        || insecure_env(env).is_some();
    let tls = if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ca_path) = profile.and_then(|p| p.ca_cert.clone()) {
        TlsVerification::CustomCa(ca_path)
    } else {
        TlsVerification::SystemDefaults
    };

    // 4. Timeout and retries
    let timeout = overrides
        .timeout
        .or_else(|| profile.and_then(|p| p.timeout))
        .unwrap_or(config.defaults.timeout);
    let retry = RetryPolicy {
        max_retries: profile
            .and_then(|p| p.max_retries)
            .unwrap_or(config.defaults.max_retries),
        ..RetryPolicy::default()
    };

    Ok(ControllerConfig {
        url,
        auth: AuthCredentials { username, password },
        site: resolve_site(overrides, profile),
        platform: profile.map(|p| p.platform).unwrap_or_default().pinned(),
        tls,
        timeout: Duration::from_secs(timeout),
        retry,
    })
}
