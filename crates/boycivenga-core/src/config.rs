// ── Runtime connection configuration ──
//
// These types describe *how* to connect to a UniFi controller.
// They carry credential data and connection tuning, but never touch disk
// or the environment. The CLI constructs a `ControllerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

pub use boycivenga_api::ControllerPlatform;

/// Username/password for the controller's session login.
#[derive(Debug, Clone)]
pub struct AuthCredentials {
    pub username: String,
    pub password: SecretString,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs). Refused under CI.
    DangerAcceptInvalid,
}

impl TlsVerification {
    /// Whether this mode weakens certificate validation.
    pub fn is_insecure(&self) -> bool {
        matches!(self, Self::DangerAcceptInvalid)
    }
}

/// Bounded retry with exponential backoff for transient controller errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. 0 disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Configuration for connecting to a single controller site.
///
/// Built by the CLI, passed to `UnifiController` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller URL (e.g., `https://192.168.1.1`).
    pub url: Url,
    /// Session credentials.
    pub auth: AuthCredentials,
    /// Site to operate on (defaults to "default").
    pub site: String,
    /// Pinned platform; `None` probes the controller on connect.
    pub platform: Option<ControllerPlatform>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry behavior for transient failures.
    pub retry: RetryPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn only_accept_invalid_is_insecure() {
        assert!(TlsVerification::DangerAcceptInvalid.is_insecure());
        assert!(!TlsVerification::SystemDefaults.is_insecure());
        assert!(!TlsVerification::CustomCa(PathBuf::from("/ca.pem")).is_insecure());
    }
}
