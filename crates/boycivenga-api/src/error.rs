use thiserror::Error;

/// Everything a controller call can fail with.
///
/// `boycivenga-core` turns these into user-facing domain errors; the
/// classifiers below drive its retry decisions.
#[derive(Debug, Error)]
pub enum Error {
    /// Login rejected, or a later call answered 401.
    #[error("controller rejected the session: {message}")]
    Authentication { message: String },

    /// The request failed below HTTP: refused, DNS, timeout, reset.
    #[error("request to controller failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bad controller URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// CA file unreadable, or the client could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Any non-2xx status other than 401.
    #[error("controller answered HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// `meta.rc` was not `ok`, or a UniFi OS `{error}` body came back.
    #[error("controller refused the request: {message}")]
    LegacyApi { message: String },

    /// The body did not match the expected envelope. `body` holds it raw.
    #[error("unexpected controller response: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Connect failures, timeouts and gateway errors (502-504).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => (502..=504).contains(status),
            _ => false,
        }
    }

    /// The request never reached the controller, so even a create may be
    /// sent again.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
            || matches!(self, Self::Transport(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND))
    }
}
