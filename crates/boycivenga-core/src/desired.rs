// ── Desired-state builder ──
//
// Joins inventory VLANs to their prefixes and derives the controller
// network each pair should become: gateway on the first usable host,
// DHCP pool from offset 6 up to .254 or the last usable host.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{IntentDocument, Network, Prefix};

/// Host offset of the first DHCP address. Offsets 1-5 stay static.
pub const DHCP_START_OFFSET: u32 = 6;
/// Highest host offset the DHCP pool may reach.
pub const DHCP_END_OFFSET: u32 = 254;

/// Build the ordered desired network list, one per VLAN with a prefix.
pub fn build_desired_state(intent: &IntentDocument) -> Result<Vec<Network>, CoreError> {
    let prefixes = index_prefixes(&intent.prefixes);
    let mut names = HashSet::new();
    let mut networks = Vec::with_capacity(intent.vlans.len());

    for vlan in &intent.vlans {
        let Some(prefix) = prefixes.get(&vlan.vlan_id) else {
            warn!(
                vlan_id = vlan.vlan_id,
                name = %vlan.name,
                "no prefix found for VLAN, skipping"
            );
            continue;
        };

        if !names.insert(vlan.name.as_str()) {
            return Err(CoreError::DuplicateNetwork {
                name: vlan.name.clone(),
            });
        }

        let net = parse_cidr(&prefix.cidr)?;
        let (dhcp_start, dhcp_stop) = dhcp_range(net)?;

        let mut network = Network::new(vlan.name.clone());
        network.vlan = Some(vlan.vlan_id);
        network.ip_subnet = Some(gateway_for(net));
        network.dhcpd_enabled = Some(true);
        network.dhcpd_start = Some(dhcp_start);
        network.dhcpd_stop = Some(dhcp_stop);
        network.extra = controller_defaults();

        debug!(name = %network.name, vlan = vlan.vlan_id, cidr = %net, "desired network");
        networks.push(network);
    }

    Ok(networks)
}

fn index_prefixes(prefixes: &[Prefix]) -> HashMap<u16, &Prefix> {
    let mut index = HashMap::new();
    for prefix in prefixes {
        let Some(vlan_id) = prefix.vlan_id else {
            continue;
        };
        match index.entry(vlan_id) {
            Entry::Vacant(slot) => {
                slot.insert(prefix);
            }
            Entry::Occupied(first) => {
                warn!(
                    vlan_id,
                    kept = %first.get().cidr,
                    ignored = %prefix.cidr,
                    "multiple prefixes for VLAN, keeping the first"
                );
            }
        }
    }
    index
}

fn controller_defaults() -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("purpose".into(), Value::from("corporate"));
    extra.insert("networkgroup".into(), Value::from("LAN"));
    extra.insert("vlan_enabled".into(), Value::from(true));
    extra
}

/// Parse a CIDR, tolerating host bits (`10.1.0.5/24` means `10.1.0.0/24`).
pub fn parse_cidr(cidr: &str) -> Result<Ipv4Net, CoreError> {
    cidr.parse::<Ipv4Net>()
        .map(|net| net.trunc())
        .map_err(|e| CoreError::InvalidCidr {
            cidr: cidr.to_owned(),
            reason: e.to_string(),
        })
}

/// Gateway address in controller form: first usable host plus prefix length.
pub fn gateway_for(net: Ipv4Net) -> Ipv4Net {
    let gateway = host_at(net, 1);
    // prefix_len comes from a valid Ipv4Net, so this cannot fail
    Ipv4Net::new(gateway, net.prefix_len()).unwrap_or(net)
}

/// DHCP pool bounds for a network.
///
/// Rejects any subnet with fewer than `DHCP_START_OFFSET + 2` usable hosts,
/// which is every /29 and smaller.
pub fn dhcp_range(net: Ipv4Net) -> Result<(Ipv4Addr, Ipv4Addr), CoreError> {
    let usable = usable_hosts(net);
    let required = u64::from(DHCP_START_OFFSET + 2);
    if usable < required {
        return Err(CoreError::SubnetTooSmall {
            cidr: net.to_string(),
            usable,
            required,
        });
    }

    let last = u32::try_from(usable.min(u64::from(DHCP_END_OFFSET))).unwrap_or(DHCP_END_OFFSET);
    Ok((host_at(net, DHCP_START_OFFSET), host_at(net, last)))
}

fn usable_hosts(net: Ipv4Net) -> u64 {
    let total = 1u64 << (32 - u32::from(net.prefix_len()));
    total.saturating_sub(2)
}

fn host_at(net: Ipv4Net, offset: u32) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(net.network()).wrapping_add(offset))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Vlan;

    fn vlan(id: u16, name: &str) -> Vlan {
        Vlan {
            vlan_id: id,
            name: name.into(),
            description: String::new(),
            status: "active".into(),
        }
    }

    fn prefix(cidr: &str, vlan_id: Option<u16>) -> Prefix {
        Prefix {
            cidr: cidr.into(),
            vlan_id,
            description: String::new(),
            status: "active".into(),
        }
    }

    fn intent(vlans: Vec<Vlan>, prefixes: Vec<Prefix>) -> IntentDocument {
        IntentDocument {
            vlans,
            prefixes,
            ..IntentDocument::default()
        }
    }

    #[test]
    fn slash_24_layout() {
        let net = parse_cidr("10.100.0.0/24").unwrap();
        assert_eq!(gateway_for(net).to_string(), "10.100.0.1/24");
        assert_eq!(
            dhcp_range(net).unwrap(),
            (Ipv4Addr::new(10, 100, 0, 6), Ipv4Addr::new(10, 100, 0, 254))
        );
    }

    #[test]
    fn wide_subnet_caps_pool_at_254() {
        let net = parse_cidr("10.0.0.0/16").unwrap();
        assert_eq!(dhcp_range(net).unwrap().1, Ipv4Addr::new(10, 0, 0, 254));
    }

    #[test]
    fn slash_28_uses_last_usable_host() {
        let net = parse_cidr("10.0.0.16/28").unwrap();
        assert_eq!(
            dhcp_range(net).unwrap(),
            (Ipv4Addr::new(10, 0, 0, 22), Ipv4Addr::new(10, 0, 0, 30))
        );
    }

    #[test]
    fn small_subnets_rejected() {
        for cidr in ["10.0.0.0/29", "10.0.0.0/30", "10.0.0.0/31", "10.0.0.0/32"] {
            let err = dhcp_range(parse_cidr(cidr).unwrap()).unwrap_err();
            assert!(
                matches!(err, CoreError::SubnetTooSmall { .. }),
                "{cidr}: {err:?}"
            );
            assert!(err.to_string().contains(cidr));
        }
    }

    #[test]
    fn host_bits_are_tolerated() {
        let net = parse_cidr("10.1.0.77/24").unwrap();
        assert_eq!(net.to_string(), "10.1.0.0/24");
    }

    #[test]
    fn malformed_cidr_is_input_error() {
        let err = parse_cidr("10.1.0/24").unwrap_err();
        assert!(matches!(err, CoreError::InvalidCidr { .. }));
    }

    #[test]
    fn builds_network_per_vlan_with_prefix() {
        let doc = intent(
            vec![vlan(10, "lan"), vlan(20, "orphan"), vlan(30, "iot")],
            vec![
                prefix("10.1.0.0/24", Some(10)),
                prefix("10.3.0.0/24", Some(30)),
                prefix("192.168.0.0/16", None),
            ],
        );

        let networks = build_desired_state(&doc).unwrap();
        let names: Vec<&str> = networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["lan", "iot"]);

        let lan = &networks[0];
        assert_eq!(lan.vlan, Some(10));
        assert_eq!(lan.ip_subnet.unwrap().to_string(), "10.1.0.1/24");
        assert_eq!(lan.dhcpd_enabled, Some(true));
        assert_eq!(lan.id, None);
        assert_eq!(lan.extra.get("purpose"), Some(&Value::from("corporate")));
        assert_eq!(lan.extra.get("vlan_enabled"), Some(&Value::from(true)));
    }

    #[test]
    fn first_prefix_wins_per_vlan() {
        let doc = intent(
            vec![vlan(10, "lan")],
            vec![prefix("10.1.0.0/24", Some(10)), prefix("10.9.0.0/24", Some(10))],
        );
        let networks = build_desired_state(&doc).unwrap();
        assert_eq!(networks[0].ip_subnet.unwrap().to_string(), "10.1.0.1/24");
    }

    #[test]
    fn sizing_error_aborts_build() {
        let doc = intent(
            vec![vlan(10, "lan"), vlan(20, "tiny")],
            vec![prefix("10.1.0.0/24", Some(10)), prefix("10.2.0.0/30", Some(20))],
        );
        assert!(matches!(
            build_desired_state(&doc),
            Err(CoreError::SubnetTooSmall { .. })
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let doc = intent(
            vec![vlan(10, "lan"), vlan(20, "lan")],
            vec![prefix("10.1.0.0/24", Some(10)), prefix("10.2.0.0/24", Some(20))],
        );
        assert!(matches!(
            build_desired_state(&doc),
            Err(CoreError::DuplicateNetwork { name }) if name == "lan"
        ));
    }

    #[test]
    fn vlan_zero_builds() {
        let doc = intent(vec![vlan(0, "native")], vec![prefix("10.0.0.0/24", Some(0))]);
        assert_eq!(build_desired_state(&doc).unwrap()[0].vlan, Some(0));
    }
}
