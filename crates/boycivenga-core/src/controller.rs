// ── Controller abstraction ──
//
// The capability the executor and reporter need from a controller:
// list/create/update/delete networks on one site. `UnifiController` is
// the real implementation on top of the legacy REST client; tests plug in
// in-memory fakes.

use std::future::Future;

use tracing::{debug, info, warn};

use boycivenga_api::transport::{TlsMode, TransportConfig};
use boycivenga_api::{LegacyClient, LegacyNetworkConf};

use crate::config::{ControllerConfig, RetryPolicy, TlsVerification};
use crate::error::CoreError;
use crate::model::Network;

// ── NetworkController ────────────────────────────────────────────

/// Network CRUD against a single controller site.
///
/// The site is bound when the implementation is constructed. Calls are
/// awaited one at a time; implementations need not be `Sync`.
#[allow(async_fn_in_trait)]
pub trait NetworkController {
    async fn list_networks(&self) -> Result<Vec<Network>, CoreError>;

    /// Create a network, returning the stored object (with its id).
    async fn create_network(&self, network: &Network) -> Result<Network, CoreError>;

    /// Replace the configuration of network `id`.
    async fn update_network(&self, id: &str, network: &Network) -> Result<Network, CoreError>;

    /// Delete network `id`. Deleting a network that is already gone succeeds.
    async fn delete_network(&self, id: &str) -> Result<(), CoreError>;
}

// ── UnifiController ──────────────────────────────────────────────

/// Authenticated session against a UniFi controller site.
pub struct UnifiController {
    client: LegacyClient,
    retry: RetryPolicy,
}

impl UnifiController {
    /// Detect the platform (unless pinned), open a session and log in.
    pub async fn connect(config: &ControllerConfig) -> Result<Self, CoreError> {
        let transport = build_transport(config);

        let platform = match config.platform {
            Some(platform) => platform,
            None => {
                let platform = LegacyClient::detect_platform(&config.url, &transport).await?;
                debug!(?platform, "detected controller platform");
                platform
            }
        };

        let client = LegacyClient::new(
            config.url.clone(),
            config.site.clone(),
            platform,
            &transport,
        )?;
        client
            .login(&config.auth.username, &config.auth.password)
            .await?;
        info!(url = %config.url, site = %config.site, "connected to controller");

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// The site every call is scoped to.
    pub fn site(&self) -> &str {
        self.client.site()
    }

    /// End the session. Logout failures are logged, never returned.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
    }

    /// Run `call`, retrying errors `retryable` accepts with exponential backoff.
    async fn retrying<T, F, Fut>(
        &self,
        operation: &str,
        retryable: fn(&boycivenga_api::Error) -> bool,
        mut call: F,
    ) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, boycivenga_api::Error>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.retry.max_retries && retryable(&e) => {
                    attempt += 1;
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max = self.retry.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "transient controller error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl NetworkController for UnifiController {
    async fn list_networks(&self) -> Result<Vec<Network>, CoreError> {
        let raw = self
            .retrying("list_networks", boycivenga_api::Error::is_transient, || {
                self.client.list_networks()
            })
            .await?;
        Ok(raw.into_iter().map(Network::from).collect())
    }

    async fn create_network(&self, network: &Network) -> Result<Network, CoreError> {
        let payload = LegacyNetworkConf::from(network);
        // A create that reached the controller may have succeeded; only
        // retry when the request never left.
        let created = self
            .retrying("create_network", boycivenga_api::Error::is_connect, || {
                self.client.create_network(&payload)
            })
            .await?;
        Ok(Network::from(created))
    }

    async fn update_network(&self, id: &str, network: &Network) -> Result<Network, CoreError> {
        let mut payload = LegacyNetworkConf::from(network);
        payload.id = Some(id.to_owned());
        let updated = self
            .retrying("update_network", boycivenga_api::Error::is_transient, || {
                self.client.update_network(id, &payload)
            })
            .await?;
        Ok(Network::from(updated))
    }

    async fn delete_network(&self, id: &str) -> Result<(), CoreError> {
        self
            .retrying("delete_network", boycivenga_api::Error::is_transient, || async {
                match self.client.delete_network(id).await {
                    Err(e) if e.is_not_found() => {
                        debug!(id, "network already gone");
                        Ok(())
                    }
                    other => other,
                }
            })
            .await
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
