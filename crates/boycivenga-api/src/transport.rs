// HTTP transport settings shared by the platform probe and the session.
//
// Both clients must honour the same TLS and timeout settings, so they are
// built from one `TransportConfig`. Only the session client keeps cookies.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::error::Error;

const USER_AGENT: &str = concat!("boycivenga/", env!("CARGO_PKG_VERSION"));

/// How the controller certificate is verified.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// System trust store.
    System,
    /// Trust the PEM certificate(s) in this file in addition to the system store.
    CustomCa(PathBuf),
    /// Accept any certificate. Refused under CI by the config layer.
    DangerAcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Applied to every request, connect included.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Stateless client for probing endpoints before a session exists.
    pub fn probe_client(&self) -> Result<reqwest::Client, Error> {
        finish(self.builder()?)
    }

    /// Client with a cookie store, so the login cookie rides along on
    /// every later request.
    pub fn session_client(&self) -> Result<reqwest::Client, Error> {
        finish(self.builder()?.cookie_store(true))
    }

    fn builder(&self) -> Result<ClientBuilder, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        Ok(match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    Error::Tls(format!("cannot read CA cert {}: {e}", path.display()))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert {}: {e}", path.display())))?;
                builder.add_root_certificate(cert)
            }
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        })
    }
}

fn finish(builder: ClientBuilder) -> Result<reqwest::Client, Error> {
    builder
        .build()
        .map_err(|e| Error::Tls(format!("cannot build HTTP client: {e}")))
}
