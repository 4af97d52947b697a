// ── API-to-domain type conversions ──
//
// Bridges raw `rest/networkconf` objects and the domain `Network`. The
// controller is loose about types (the VLAN tag arrives as a number or a
// string); values that do not parse are dropped rather than failing the
// whole listing.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde_json::{Map, Value};
use tracing::debug;

use boycivenga_api::LegacyNetworkConf;

use crate::model::Network;
use crate::model::network::vlan_from_value;

const PURPOSE: &str = "purpose";
const NETWORKGROUP: &str = "networkgroup";
const VLAN_ENABLED: &str = "vlan_enabled";

// ── Helpers ────────────────────────────────────────────────────────

/// VLAN tag from a number or a numeric string.
fn parse_vlan(raw: Option<&Value>) -> Option<u16> {
    raw.and_then(vlan_from_value)
}

fn parse_subnet(raw: Option<&String>) -> Option<Ipv4Net> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn parse_ip(raw: Option<&String>) -> Option<Ipv4Addr> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn take_string(extra: &mut Map<String, Value>, key: &str) -> Option<String> {
    match extra.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            extra.insert(key.to_owned(), other);
            None
        }
    }
}

fn take_bool(extra: &mut Map<String, Value>, key: &str) -> Option<bool> {
    match extra.remove(key)? {
        Value::Bool(b) => Some(b),
        other => {
            extra.insert(key.to_owned(), other);
            None
        }
    }
}

// ── Controller → domain ────────────────────────────────────────────

impl From<LegacyNetworkConf> for Network {
    fn from(conf: LegacyNetworkConf) -> Self {
        let vlan = parse_vlan(conf.vlan.as_ref());
        if vlan.is_none() && conf.vlan.is_some() {
            debug!(name = ?conf.name, raw = ?conf.vlan, "unparseable VLAN tag");
        }

        let mut extra = conf.extra;
        if let Some(purpose) = conf.purpose {
            extra.insert(PURPOSE.into(), Value::String(purpose));
        }
        if let Some(group) = conf.networkgroup {
            extra.insert(NETWORKGROUP.into(), Value::String(group));
        }
        if let Some(enabled) = conf.vlan_enabled {
            extra.insert(VLAN_ENABLED.into(), Value::Bool(enabled));
        }

        Network {
            id: conf.id,
            name: conf.name.unwrap_or_default(),
            vlan,
            ip_subnet: parse_subnet(conf.ip_subnet.as_ref()),
            dhcpd_enabled: conf.dhcpd_enabled,
            dhcpd_start: parse_ip(conf.dhcpd_start.as_ref()),
            dhcpd_stop: parse_ip(conf.dhcpd_stop.as_ref()),
            extra,
        }
    }
}

// ── Domain → controller ────────────────────────────────────────────

impl From<&Network> for LegacyNetworkConf {
    fn from(network: &Network) -> Self {
        let mut extra = network.extra.clone();
        let purpose = take_string(&mut extra, PURPOSE);
        let networkgroup = take_string(&mut extra, NETWORKGROUP);
        let vlan_enabled = take_bool(&mut extra, VLAN_ENABLED);

        LegacyNetworkConf {
            id: network.id.clone(),
            name: Some(network.name.clone()),
            purpose,
            networkgroup,
            vlan_enabled,
            vlan: network.vlan.map(Value::from),
            ip_subnet: network.ip_subnet.map(|s| s.to_string()),
            dhcpd_enabled: network.dhcpd_enabled,
            dhcpd_start: network.dhcpd_start.map(|ip| ip.to_string()),
            dhcpd_stop: network.dhcpd_stop.map(|ip| ip.to_string()),
            extra,
        }
    }
}
