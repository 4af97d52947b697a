//! Shared helpers for command handlers.

use std::path::Path;

use boycivenga_core::model::intent::read_input;
use boycivenga_core::state::checksum;
use boycivenga_core::{IntentDocument, Network, build_desired_state};
use tracing::info;

use crate::error::CliError;

/// The desired networks for one input file, with the checksum of its bytes.
pub struct DesiredInput {
    pub networks: Vec<Network>,
    pub checksum: String,
}

/// Read, checksum, parse and build. Any input problem is fatal here,
/// before the controller is contacted.
pub fn load_desired(path: &Path) -> Result<DesiredInput, CliError> {
    let bytes = read_input(path)?;
    let checksum = checksum(&bytes);
    let intent = IntentDocument::from_slice(&bytes)?;
    let networks = build_desired_state(&intent)?;

    info!(
        input = %path.display(),
        site = intent.site_slug.as_deref().unwrap_or("-"),
        networks = networks.len(),
        "desired state built"
    );
    Ok(DesiredInput { networks, checksum })
}

/// `name (VLAN n)` for summaries.
pub fn network_label(name: &str, vlan: Option<u16>) -> String {
    match vlan {
        Some(vlan) => format!("{name} (VLAN {vlan})"),
        None => name.to_owned(),
    }
}
