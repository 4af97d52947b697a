// Session login/logout and platform detection
//
// Login sets a session cookie in the client's store and, on UniFi OS,
// hands out the CSRF token later mutations must carry.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::auth::ControllerPlatform;
use crate::error::Error;
use crate::legacy::client::LegacyClient;
use crate::transport::TransportConfig;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl LegacyClient {
    /// Open a session: `POST /api/auth/login` on UniFi OS, `/api/login` on
    /// a classic controller.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.root_url(self.platform().login_path())?;
        debug!(%url, username, "logging in");

        let response = self
            .http()
            .post(url)
            .json(&LoginRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        self.remember_csrf(response.headers());
        debug!("session established");
        Ok(())
    }

    /// Close the session. A non-success answer is logged, not returned.
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.root_url(self.platform().logout_path())?;
        let response = self.http().post(url).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "logout was not acknowledged");
        }
        self.forget_csrf();
        Ok(())
    }

    /// Work out the platform from the login endpoints.
    ///
    /// Anything but 404 on `/api/auth/login` means UniFi OS; otherwise the
    /// classic endpoint must at least answer. The probe uses the same TLS
    /// settings as the session.
    pub async fn detect_platform(
        base_url: &Url,
        transport: &TransportConfig,
    ) -> Result<ControllerPlatform, Error> {
        let http = transport.probe_client()?;

        let unifi_os = base_url.join(ControllerPlatform::UnifiOs.login_path())?;
        match http.get(unifi_os).send().await {
            Ok(response) if response.status() != StatusCode::NOT_FOUND => {
                debug!(status = %response.status(), "UniFi OS login endpoint present");
                return Ok(ControllerPlatform::UnifiOs);
            }
            Ok(_) => debug!("no UniFi OS login endpoint"),
            Err(e) => debug!(error = %e, "UniFi OS probe failed"),
        }

        let classic = base_url.join(ControllerPlatform::ClassicController.login_path())?;
        http.get(classic).send().await?;
        debug!("classic controller");
        Ok(ControllerPlatform::ClassicController)
    }
}
