// ── Inventory intent document ──
//
// The desired-state input exported from the source of truth. Two shapes
// are accepted: the minimal export schema and the raw inventory API shape
// (`vid`, `prefix`, nested `vlan` objects, `{value, label}` statuses).
// Each variant is folded into one canonical form here so the builder
// never branches on shape.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Highest assignable 802.1Q tag.
pub const MAX_VLAN_ID: u16 = 4094;

const DEFAULT_STATUS: &str = "active";

/// Normalized desired-state input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntentDocument {
    pub site_name: Option<String>,
    pub site_slug: Option<String>,
    pub site_description: Option<String>,
    pub vlans: Vec<Vlan>,
    pub prefixes: Vec<Prefix>,
    pub tags: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vlan {
    pub vlan_id: u16,
    pub name: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prefix {
    /// Network in CIDR notation, validated by the builder.
    pub cidr: String,
    /// Backing VLAN tag; `None` for prefixes not bound to a VLAN.
    pub vlan_id: Option<u16>,
    pub description: String,
    pub status: String,
}

impl IntentDocument {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: RawDocument = serde_json::from_slice(bytes).map_err(|e| CoreError::InvalidInput {
            message: format!("malformed intent document: {e}"),
        })?;
        raw.normalize()
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        Self::from_slice(text.as_bytes())
    }
}

/// Read the raw input bytes. Kept separate from parsing so the caller can
/// checksum exactly what it was given.
pub fn read_input(path: &Path) -> Result<Vec<u8>, CoreError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::InputNotFound {
            path: path.display().to_string(),
        },
        _ => CoreError::InvalidInput {
            message: format!("cannot read {}: {e}", path.display()),
        },
    })
}

// ── Wire shapes ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    site_name: Option<String>,
    #[serde(default)]
    site_slug: Option<String>,
    #[serde(default)]
    site_description: Option<String>,
    #[serde(default)]
    vlans: Vec<RawVlan>,
    #[serde(default)]
    prefixes: Vec<RawPrefix>,
    #[serde(default)]
    tags: Vec<Value>,
}

#[derive(Deserialize)]
struct RawVlan {
    #[serde(default, alias = "vid")]
    vlan_id: Option<RawTag>,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<RawStatus>,
}

#[derive(Deserialize)]
struct RawPrefix {
    #[serde(alias = "prefix")]
    cidr: String,
    #[serde(default, alias = "vlan")]
    vlan_id: Option<RawVlanRef>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<RawStatus>,
}

/// `"active"` or `{"value": "active", "label": "Active"}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Plain(String),
    Choice {
        value: String,
        #[allow(dead_code)]
        #[serde(default)]
        label: Option<String>,
    },
}

/// `10` or `{"id": 3, "vid": 10, "name": "lan"}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVlanRef {
    Tag(RawTag),
    Nested {
        #[serde(default)]
        vid: Option<RawTag>,
        #[serde(default)]
        vlan_id: Option<RawTag>,
    },
}

/// `10` or `"10"`; exports built from CSV or form data carry the latter.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTag {
    Number(i64),
    Text(String),
}

// ── Normalization ───────────────────────────────────────────────────

impl RawDocument {
    fn normalize(self) -> Result<IntentDocument, CoreError> {
        let vlans = self
            .vlans
            .into_iter()
            .map(RawVlan::normalize)
            .collect::<Result<Vec<_>, _>>()?;
        let prefixes = self
            .prefixes
            .into_iter()
            .map(RawPrefix::normalize)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IntentDocument {
            site_name: self.site_name,
            site_slug: self.site_slug,
            site_description: self.site_description,
            vlans,
            prefixes,
            tags: self.tags,
        })
    }
}

impl RawVlan {
    fn normalize(self) -> Result<Vlan, CoreError> {
        let Some(raw_id) = self.vlan_id else {
            return Err(CoreError::InvalidInput {
                message: format!("VLAN '{}' has no VLAN id", self.name),
            });
        };
        let vlan_id = raw_id.resolve(&format!("VLAN '{}'", self.name))?;

        Ok(Vlan {
            vlan_id,
            name: self.name,
            description: self.description.unwrap_or_default(),
            status: RawStatus::normalize(self.status),
        })
    }
}

impl RawPrefix {
    fn normalize(self) -> Result<Prefix, CoreError> {
        let vlan_id = match self.vlan_id {
            None => None,
            Some(reference) => reference
                .tag()
                .map(|raw| raw.resolve(&format!("prefix {}", self.cidr)))
                .transpose()?,
        };

        Ok(Prefix {
            cidr: self.cidr.trim().to_owned(),
            vlan_id,
            description: self.description.unwrap_or_default(),
            status: RawStatus::normalize(self.status),
        })
    }
}

impl RawStatus {
    fn normalize(status: Option<Self>) -> String {
        match status {
            Some(Self::Plain(value) | Self::Choice { value, .. }) => value,
            None => DEFAULT_STATUS.to_owned(),
        }
    }
}

impl RawVlanRef {
    fn tag(self) -> Option<RawTag> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Nested { vid, vlan_id } => vid.or(vlan_id),
        }
    }
}

impl RawTag {
    fn resolve(self, context: &str) -> Result<u16, CoreError> {
        match self {
            Self::Number(raw) => vlan_tag(raw, context),
            Self::Text(text) => {
                let raw = text.trim().parse().map_err(|_| CoreError::InvalidInput {
                    message: format!("{context}: VLAN id '{text}' is not a number"),
                })?;
                vlan_tag(raw, context)
            }
        }
    }
}

fn vlan_tag(raw: i64, context: &str) -> Result<u16, CoreError> {
    u16::try_from(raw)
        .ok()
        .filter(|tag| *tag <= MAX_VLAN_ID)
        .ok_or_else(|| CoreError::InvalidInput {
            message: format!("{context}: VLAN id {raw} outside 0-{MAX_VLAN_ID}"),
        })
}
