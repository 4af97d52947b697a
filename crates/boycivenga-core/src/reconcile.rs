// ── Reconciliation engine ──
//
// Three-way diff of desired, recorded and actual network state. Pure:
// no I/O, no controller access. Update and drift are independent
// classifications and a network may appear in both.

use indexmap::IndexMap;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{ManagedField, ManagedFields, Network};

/// Name prefix of networks this tool is allowed to delete.
pub const EPHEMERAL_PREFIX: &str = "test-";

/// Whether a controller network is ephemeral (and therefore deletable).
pub fn is_ephemeral(name: &str) -> bool {
    name.starts_with(EPHEMERAL_PREFIX)
}

/// A desired network that exists on the controller but differs from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkChange {
    pub name: String,
    pub current: ManagedFields,
    pub desired: ManagedFields,
    pub fields: Vec<ManagedField>,
}

/// The controller no longer matches what was recorded at the last apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftEntry {
    pub name: String,
    pub recorded: ManagedFields,
    pub actual: ManagedFields,
    pub fields: Vec<ManagedField>,
}

/// Classified difference between the three state views.
///
/// Serializes the four lists plus the derived `is_clean` flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub to_create: Vec<Network>,
    pub to_update: Vec<NetworkChange>,
    pub to_delete: Vec<Network>,
    pub drift: Vec<DriftEntry>,
}

impl DiffResult {
    /// True only when there is nothing to create, update, delete, or
    /// report as drift.
    pub fn is_clean(&self) -> bool {
        self.to_create.is_empty()
            && self.to_update.is_empty()
            && self.to_delete.is_empty()
            && self.drift.is_empty()
    }

    pub fn clear_drift(&mut self) {
        self.drift.clear();
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            create: self.to_create.len(),
            update: self.to_update.len(),
            delete: self.to_delete.len(),
            drift: self.drift.len(),
        }
    }
}

impl Serialize for DiffResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("DiffResult", 5)?;
        out.serialize_field("to_create", &self.to_create)?;
        out.serialize_field("to_update", &self.to_update)?;
        out.serialize_field("to_delete", &self.to_delete)?;
        out.serialize_field("drift", &self.drift)?;
        out.serialize_field("is_clean", &self.is_clean())?;
        out.end()
    }
}

/// Per-category counts for the one-line tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub drift: usize,
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} drifted",
            self.create, self.update, self.delete, self.drift
        )
    }
}

fn by_name(networks: &[Network]) -> IndexMap<&str, &Network> {
    let mut index = IndexMap::with_capacity(networks.len());
    for network in networks {
        if index.insert(network.name.as_str(), network).is_some() {
            warn!(name = %network.name, "duplicate network name, last one wins");
        }
    }
    index
}

/// Diff desired state against the controller and the last recorded apply.
pub fn reconcile(desired: &[Network], recorded: &[Network], actual: &[Network]) -> DiffResult {
    let desired_by_name = by_name(desired);
    let recorded_by_name = by_name(recorded);
    let actual_by_name = by_name(actual);

    let mut diff = DiffResult::default();

    for (name, want) in &desired_by_name {
        let Some(have) = actual_by_name.get(name) else {
            diff.to_create.push((*want).clone());
            continue;
        };

        let want_fields = want.managed();
        let have_fields = have.managed();

        let changed = want_fields.differences(&have_fields);
        if !changed.is_empty() {
            debug!(%name, ?changed, "network differs from desired");
            diff.to_update.push(NetworkChange {
                name: (*name).to_owned(),
                current: have_fields,
                desired: want_fields,
                fields: changed,
            });
        }

        if let Some(was) = recorded_by_name.get(name) {
            let recorded_fields = was.managed();
            let drifted = recorded_fields.differences(&have_fields);
            if !drifted.is_empty() {
                debug!(%name, ?drifted, "network drifted from recorded state");
                diff.drift.push(DriftEntry {
                    name: (*name).to_owned(),
                    recorded: recorded_fields,
                    actual: have_fields,
                    fields: drifted,
                });
            }
        }
    }

    diff.to_delete = actual_by_name
        .iter()
        .filter(|(name, _)| !desired_by_name.contains_key(*name) && is_ephemeral(name))
        .map(|(_, network)| (*network).clone())
        .collect();

    diff
}
