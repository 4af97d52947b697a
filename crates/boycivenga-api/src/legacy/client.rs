// Session-scoped HTTP client for the legacy REST API
//
// Every call goes through `call()`: CSRF header on mutations, token
// rotation from responses, and envelope decoding. Endpoint groups live in
// sibling files as inherent methods.

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::auth::ControllerPlatform;
use crate::error::Error;
use crate::legacy::models::{LegacyNetworkConf, LegacyResponse};
use crate::transport::TransportConfig;

const CSRF_HEADER: &str = "X-CSRF-Token";
const CSRF_ROTATED_HEADER: &str = "X-Updated-CSRF-Token";
const PREVIEW_CHARS: usize = 200;

/// Authenticated client for one controller site.
///
/// The site is fixed at construction; every network URL is scoped to it.
pub struct LegacyClient {
    http: reqwest::Client,
    base_url: Url,
    site: String,
    platform: ControllerPlatform,
    /// UniFi OS rejects mutations through `/proxy/network` without it.
    csrf: Mutex<Option<String>>,
}

impl LegacyClient {
    /// Build a client with its own cookie store. `base_url` is the
    /// controller root, e.g. `https://192.168.1.1` (UniFi OS) or
    /// `https://controller:8443` (classic).
    pub fn new(
        base_url: Url,
        site: String,
        platform: ControllerPlatform,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.session_client()?,
            base_url,
            site,
            platform,
            csrf: Mutex::new(None),
        })
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn platform(&self) -> ControllerPlatform {
        self.platform
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── CSRF token ───────────────────────────────────────────────────

    fn csrf_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.csrf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Keep the newest token a response hands out, if any.
    pub(crate) fn remember_csrf(&self, headers: &HeaderMap) {
        let token = headers
            .get(CSRF_ROTATED_HEADER)
            .or_else(|| headers.get(CSRF_HEADER))
            .and_then(|v| v.to_str().ok());
        if let Some(token) = token {
            trace!("CSRF token updated");
            *self.csrf_slot() = Some(token.to_owned());
        }
    }

    pub(crate) fn forget_csrf(&self) {
        *self.csrf_slot() = None;
    }

    // ── URLs ─────────────────────────────────────────────────────────

    /// Controller-root URL, used for the auth endpoints.
    pub(crate) fn root_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// `{base}{prefix}/api/s/{site}/rest/networkconf[/{id}]`
    pub(crate) fn networkconf_url(&self, id: Option<&str>) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let prefix = self.platform.legacy_prefix();
        let mut url = format!("{base}{prefix}/api/s/{}/rest/networkconf", self.site);
        if let Some(id) = id {
            url.push('/');
            url.push_str(id);
        }
        Ok(Url::parse(&url)?)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send one request and return the envelope's `data`.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&LegacyNetworkConf>,
    ) -> Result<Vec<T>, Error> {
        debug!(%method, %url, "legacy request");

        let token = if method == Method::GET {
            None
        } else {
            self.csrf_slot().clone()
        };

        let mut request = self.http.request(method, url);
        if let Some(token) = token {
            request = request.header(CSRF_HEADER, token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.remember_csrf(response.headers());
        let status = response.status();
        let text = response.text().await?;
        decode(status, &text)
    }
}

// ── Envelope decoding ────────────────────────────────────────────────

/// UniFi OS sometimes answers HTTP 200 with `{"error": {"code", "message"}}`.
#[derive(Deserialize)]
struct UnifiOsError {
    error: UnifiOsErrorBody,
}

#[derive(Deserialize)]
struct UnifiOsErrorBody {
    code: u16,
    #[serde(default)]
    message: Option<String>,
}

/// Turn a status and body into `data`, or the most specific error the
/// response allows.
fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<Vec<T>, Error> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "session expired or invalid credentials".into(),
        });
    }

    if !status.is_success() {
        // 4xx answers usually still carry `meta.msg` (e.g. api.err.VlanUsed).
        let message = serde_json::from_str::<LegacyResponse<Value>>(body)
            .ok()
            .and_then(|envelope| envelope.meta.msg)
            .unwrap_or_else(|| preview(body).to_owned());
        return Err(Error::Http {
            status: status.as_u16(),
            message,
        });
    }

    if let Ok(UnifiOsError { error }) = serde_json::from_str::<UnifiOsError>(body) {
        let message = error.message.unwrap_or_default();
        return Err(if error.code == 401 {
            Error::Authentication { message }
        } else {
            Error::LegacyApi {
                message: format!("UniFi OS error {}: {message}", error.code),
            }
        });
    }

    let envelope: LegacyResponse<T> =
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(body)),
            body: body.to_owned(),
        })?;

    if envelope.meta.rc == "ok" {
        Ok(envelope.data)
    } else {
        Err(Error::LegacyApi {
            message: envelope
                .meta
                .msg
                .unwrap_or_else(|| format!("rc={}", envelope.meta.rc)),
        })
    }
}

/// Leading characters of a body, cut on a char boundary.
fn preview(body: &str) -> &str {
    body.char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(body, |(idx, _)| &body[..idx])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(platform: ControllerPlatform) -> LegacyClient {
        let base = Url::parse("https://10.0.0.1:8443/").unwrap();
        LegacyClient::new(base, "default".into(), platform, &TransportConfig::default()).unwrap()
    }

    #[test]
    fn networkconf_url_classic() {
        let url = client(ControllerPlatform::ClassicController)
            .networkconf_url(None)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://10.0.0.1:8443/api/s/default/rest/networkconf"
        );
    }

    #[test]
    fn networkconf_url_unifi_os() {
        let url = client(ControllerPlatform::UnifiOs)
            .networkconf_url(Some("abc"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://10.0.0.1:8443/proxy/network/api/s/default/rest/networkconf/abc"
        );
    }

    #[test]
    fn csrf_rotation_prefers_updated_header() {
        let client = client(ControllerPlatform::UnifiOs);
        let mut headers = HeaderMap::new();
        headers.insert(CSRF_HEADER, "old".parse().unwrap());
        headers.insert(CSRF_ROTATED_HEADER, "new".parse().unwrap());

        client.remember_csrf(&headers);
        assert_eq!(client.csrf_slot().as_deref(), Some("new"));

        client.forget_csrf();
        assert!(client.csrf_slot().is_none());
    }

    #[test]
    fn decode_ok_envelope() {
        let body = json!({ "meta": { "rc": "ok" }, "data": [1, 2] }).to_string();
        let data: Vec<u8> = decode(StatusCode::OK, &body).unwrap();
        assert_eq!(data, vec![1, 2]);
    }

    #[test]
    fn decode_error_status_keeps_controller_message() {
        let body = json!({ "meta": { "rc": "error", "msg": "api.err.VlanUsed" }, "data": [] })
            .to_string();
        let err = decode::<Value>(StatusCode::BAD_REQUEST, &body).unwrap_err();
        assert!(matches!(err, Error::Http { status: 400, ref message } if message == "api.err.VlanUsed"));
    }

    #[test]
    fn decode_unifi_os_error_shape() {
        let body = json!({ "error": { "code": 403, "message": "forbidden" } }).to_string();
        let err = decode::<Value>(StatusCode::OK, &body).unwrap_err();
        assert!(matches!(err, Error::LegacyApi { ref message } if message.contains("403")));
    }

    #[test]
    fn decode_garbage_is_deserialization_error() {
        let err = decode::<Value>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(500);
        assert_eq!(preview(&body).len(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
