// ── Network domain type ──
//
// The reconciled unit. Desired, recorded and actual views all share this
// shape; `name` is the identity key and only the managed fields are ever
// compared.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, IntoEnumIterator};

/// The fields the reconciler owns. Everything else on a controller
/// network is operational noise as far as diffing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ManagedField {
    Vlan,
    IpSubnet,
    DhcpdEnabled,
    DhcpdStart,
    DhcpdStop,
}

/// A network configuration as seen from one of the three state views.
///
/// Managed fields are optional: a view that does not specify a field
/// (a recorded snapshot written without DHCP bounds, say) is never
/// compared on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Controller-assigned identifier. Absent on desired networks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    /// Gateway address with prefix length (`10.1.0.1/24`), not the network base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_subnet: Option<Ipv4Net>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcpd_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcpd_start: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcpd_stop: Option<Ipv4Addr>,
    /// Controller pass-through fields (`purpose`, `networkgroup`, counters...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Snapshot of the managed fields only.
    pub fn managed(&self) -> ManagedFields {
        ManagedFields {
            vlan: self.vlan,
            ip_subnet: self.ip_subnet,
            dhcpd_enabled: self.dhcpd_enabled,
            dhcpd_start: self.dhcpd_start,
            dhcpd_stop: self.dhcpd_stop,
        }
    }

    /// Overlay this (desired) network onto an existing controller network.
    ///
    /// The existing identifier and pass-through fields are kept; every
    /// field this network specifies wins.
    pub fn merged_over(&self, existing: &Network) -> Network {
        let mut extra = existing.extra.clone();
        extra.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        Network {
            id: existing.id.clone(),
            name: self.name.clone(),
            vlan: self.vlan.or(existing.vlan),
            ip_subnet: self.ip_subnet.or(existing.ip_subnet),
            dhcpd_enabled: self.dhcpd_enabled.or(existing.dhcpd_enabled),
            dhcpd_start: self.dhcpd_start.or(existing.dhcpd_start),
            dhcpd_stop: self.dhcpd_stop.or(existing.dhcpd_stop),
            extra,
        }
    }
}

/// Normalized managed-field snapshot, carried in diff entries for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManagedFields {
    pub vlan: Option<u16>,
    pub ip_subnet: Option<Ipv4Net>,
    pub dhcpd_enabled: Option<bool>,
    pub dhcpd_start: Option<Ipv4Addr>,
    pub dhcpd_stop: Option<Ipv4Addr>,
}

impl ManagedFields {
    /// Display form of one field, `None` when unspecified.
    pub fn value(&self, field: ManagedField) -> Option<String> {
        match field {
            ManagedField::Vlan => self.vlan.map(|v| v.to_string()),
            ManagedField::IpSubnet => self.ip_subnet.map(|v| v.to_string()),
            ManagedField::DhcpdEnabled => self.dhcpd_enabled.map(|v| v.to_string()),
            ManagedField::DhcpdStart => self.dhcpd_start.map(|v| v.to_string()),
            ManagedField::DhcpdStop => self.dhcpd_stop.map(|v| v.to_string()),
        }
    }

    fn field_matches(&self, other: &Self, field: ManagedField) -> bool {
        match field {
            ManagedField::Vlan => self.vlan == other.vlan,
            ManagedField::IpSubnet => self.ip_subnet == other.ip_subnet,
            ManagedField::DhcpdEnabled => self.dhcpd_enabled == other.dhcpd_enabled,
            ManagedField::DhcpdStart => self.dhcpd_start == other.dhcpd_start,
            ManagedField::DhcpdStop => self.dhcpd_stop == other.dhcpd_stop,
        }
    }

    /// Managed fields this snapshot specifies that `other` does not match.
    ///
    /// `self` is the reference side: fields it leaves unspecified are not
    /// compared.
    pub fn differences(&self, other: &Self) -> Vec<ManagedField> {
        ManagedField::iter()
            .filter(|&field| self.value(field).is_some() && !self.field_matches(other, field))
            .collect()
    }

    /// Whether `other` agrees with every field this snapshot specifies.
    pub fn satisfied_by(&self, other: &Self) -> bool {
        self.differences(other).is_empty()
    }
}

// ── VLAN tag parsing ─────────────────────────────────────────────────

/// VLAN tag from a number or a numeric string, as the controller and
/// older state files write it.
pub fn vlan_from_value(raw: &Value) -> Option<u16> {
    match raw {
        Value::Number(n) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `deserialize_with` counterpart of [`vlan_from_value`]. `null` and an
/// absent field are `None`; anything else that is not a tag is an error.
pub(crate) fn deserialize_vlan_tag<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => vlan_from_value(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid VLAN tag {raw}"))),
    }
}
