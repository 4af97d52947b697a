//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use boycivenga_config::ConfigError;
use boycivenga_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    /// `plan` only: the controller does not match the inventory.
    pub const CHANGES_PENDING: i32 = 2;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(boycivenga::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Controller request timed out")]
    #[diagnostic(
        code(boycivenga::timeout),
        help("Increase the timeout with --timeout or check controller responsiveness.")
    )]
    Timeout,

    #[error("Refusing insecure TLS under CI (requested via {via})")]
    #[diagnostic(
        code(boycivenga::insecure_in_ci),
        help(
            "Certificate verification cannot be disabled in CI.\n\
             Unset the insecure setting, or configure ca_cert in the profile."
        )
    )]
    InsecureTransportInCi { via: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(boycivenga::auth_failed),
        help(
            "Verify the controller username and password.\n\
             Detail: {message}"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(boycivenga::no_credentials),
        help(
            "Set UNIFI_USERNAME and UNIFI_PASSWORD, store the password in the\n\
             system keyring under service 'boycivenga', entry '{profile}/password',\n\
             or add username/password to the profile."
        )
    )]
    NoCredentials { profile: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(boycivenga::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(boycivenga::no_controller),
        help(
            "Pass --controller, set UNIFI_CONTROLLER_URL, or add a profile to\n\
             {path}"
        )
    )]
    NoController { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(boycivenga::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(boycivenga::config))]
    Config { message: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Input file not found: {path}")]
    #[diagnostic(
        code(boycivenga::input_not_found),
        help("Pass the exported inventory document with --input.")
    )]
    InputNotFound { path: String },

    #[error("{message}")]
    #[diagnostic(
        code(boycivenga::invalid_input),
        help("Fix the inventory data and export it again.")
    )]
    InvalidInput { message: String },

    // ── State ────────────────────────────────────────────────────────
    #[error("State file {path}: {reason}")]
    #[diagnostic(
        code(boycivenga::state),
        help("Check the state directory permissions, or remove a corrupt state file to start over.")
    )]
    State { path: String, reason: String },

    // ── Controller ───────────────────────────────────────────────────
    #[error("Controller API error: {message}")]
    #[diagnostic(code(boycivenga::api_error))]
    Api { message: String },

    #[error("{failed} of {attempted} networks failed to apply")]
    #[diagnostic(
        code(boycivenga::apply_failed),
        help("Networks that succeeded were recorded; fix the failures and apply again.")
    )]
    ApplyFailed { failed: usize, attempted: usize },

    // ── Output ───────────────────────────────────────────────────────
    #[error("Could not render output: {message}")]
    #[diagnostic(code(boycivenga::render))]
    Render { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(boycivenga::internal))]
    Internal { message: String },
}

impl CliError {
    /// Every error exits non-zero with the same status; `2` is reserved
    /// for a successful plan with pending changes.
    pub fn exit_code(&self) -> i32 {
        exit_code::FAILURE
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::InputNotFound { path } => Self::InputNotFound { path },
            e @ (CoreError::InvalidInput { .. }
            | CoreError::InvalidCidr { .. }
            | CoreError::SubnetTooSmall { .. }
            | CoreError::DuplicateNetwork { .. }) => Self::InvalidInput {
                message: e.to_string(),
            },
            CoreError::State { path, reason } => Self::State { path, reason },
            CoreError::Api { message, .. } => Self::Api { message },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Internal { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => Self::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::NoController { path } => Self::NoController {
                path: path.display().to_string(),
            },
            ConfigError::InsecureTransportInCi { via } => Self::InsecureTransportInCi { via },
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Render {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Render {
            message: err.to_string(),
        }
    }
}
