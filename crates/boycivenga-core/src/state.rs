// ── Recorded state store ──
//
// The JSON document written after every apply that achieved anything.
// It records what was applied, by whom, and a checksum of the input that
// produced it; the next plan compares against it to detect drift.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::Network;
use crate::model::network::deserialize_vlan_tag;

pub const FORMAT_VERSION: &str = "1.0";
/// Provenance tag stamped on every snapshot.
pub const SNAPSHOT_SOURCE: &str = "netbox";

/// `sha256:<hex>` digest of the raw input bytes.
pub fn checksum(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// The persisted record of the last apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedState {
    pub format_version: String,
    pub applied_at: DateTime<Utc>,
    pub applied_by: String,
    pub site: String,
    pub tfvars_checksum: String,
    #[serde(default)]
    pub networks: Vec<NetworkSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Older tooling copied the controller's tag verbatim, so `"10"` occurs.
    #[serde(default, deserialize_with = "deserialize_vlan_tag")]
    pub vlan_id: Option<u16>,
    #[serde(default)]
    pub subnet: Option<Ipv4Net>,
    pub created_at: DateTime<Utc>,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcpd_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcpd_start: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcpd_stop: Option<Ipv4Addr>,
}

impl NetworkSnapshot {
    fn capture(network: &Network, at: DateTime<Utc>) -> Self {
        Self {
            id: network.id.clone(),
            name: network.name.clone(),
            vlan_id: network.vlan,
            subnet: network.ip_subnet,
            created_at: at,
            source: SNAPSHOT_SOURCE.to_owned(),
            dhcpd_enabled: network.dhcpd_enabled,
            dhcpd_start: network.dhcpd_start,
            dhcpd_stop: network.dhcpd_stop,
        }
    }

    fn to_network(&self) -> Network {
        Network {
            id: self.id.clone(),
            name: self.name.clone(),
            vlan: self.vlan_id,
            ip_subnet: self.subnet,
            dhcpd_enabled: self.dhcpd_enabled,
            dhcpd_start: self.dhcpd_start,
            dhcpd_stop: self.dhcpd_stop,
            extra: serde_json::Map::new(),
        }
    }
}

impl RecordedState {
    /// Build the record of an apply from the networks that succeeded.
    pub fn from_applied(
        applied: &[Network],
        site: impl Into<String>,
        actor: impl Into<String>,
        input_checksum: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_owned(),
            applied_at: at,
            applied_by: actor.into(),
            site: site.into(),
            tfvars_checksum: input_checksum.into(),
            networks: applied
                .iter()
                .map(|n| NetworkSnapshot::capture(n, at))
                .collect(),
        }
    }

    /// The recorded view, as fed to reconciliation.
    pub fn networks(&self) -> Vec<Network> {
        self.networks.iter().map(NetworkSnapshot::to_network).collect()
    }

    /// Whether this state was produced from the given input checksum.
    pub fn matches_input(&self, input_checksum: &str) -> bool {
        self.tfvars_checksum == input_checksum
    }
}

// ── StateStore ───────────────────────────────────────────────────

/// File-backed store for one site's recorded state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{state_dir}/{site}-networks.json`
    pub fn default_path(state_dir: &Path, site: &str) -> PathBuf {
        state_dir.join(format!("{site}-networks.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the recorded state. A missing file is the first-run case, not
    /// an error.
    pub fn load(&self) -> Result<Option<RecordedState>, CoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no recorded state yet");
                return Ok(None);
            }
            Err(e) => return Err(self.error(&e)),
        };

        let state: RecordedState = serde_json::from_slice(&bytes).map_err(|e| self.error(&e))?;
        debug!(
            path = %self.path.display(),
            networks = state.networks.len(),
            "loaded recorded state"
        );
        Ok(Some(state))
    }

    /// Overwrite the recorded state, creating parent directories as needed.
    pub fn save(&self, state: &RecordedState) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.error(&e))?;
        }

        let mut json = serde_json::to_string_pretty(state).map_err(|e| self.error(&e))?;
        json.push('\n');

        // Write-then-rename so a crash never leaves a truncated file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.error(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.error(&e))?;

        info!(path = %self.path.display(), networks = state.networks.len(), "state saved");
        Ok(())
    }

    fn error(&self, err: &dyn std::fmt::Display) -> CoreError {
        CoreError::State {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
