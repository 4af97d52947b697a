// ── Apply executor ──
//
// Pushes desired networks to the controller one at a time, in input
// order. Per-network failures are captured with full context and the
// batch continues unless fail-fast is set; whatever succeeded is reported
// so the caller can persist it.

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::controller::NetworkController;
use crate::error::CoreError;
use crate::model::Network;
use crate::reconcile::is_ephemeral;

/// Executor switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Stop at the first per-network failure.
    pub fail_fast: bool,
    /// Delete ephemeral (`test-`) controller networks absent from desired state.
    pub prune: bool,
}

/// Which operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplyAction {
    Create,
    Update,
    Delete,
}

/// One network that could not be applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyFailure {
    pub network: String,
    pub vlan_id: Option<u16>,
    pub action: ApplyAction,
    pub error: String,
    /// The configuration that was attempted.
    pub config: Network,
}

/// Outcome of one apply run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub created: Vec<Network>,
    pub updated: Vec<Network>,
    pub unchanged: Vec<Network>,
    pub deleted: Vec<Network>,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    /// Networks now known to match desired state on the controller.
    /// Failed networks are excluded.
    pub fn applied_snapshot(&self) -> Vec<Network> {
        self.created
            .iter()
            .chain(&self.updated)
            .chain(&self.unchanged)
            .cloned()
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(
        &mut self,
        network: &Network,
        action: ApplyAction,
        error: &CoreError,
        options: ApplyOptions,
    ) -> Result<(), ApplyError> {
        warn!(name = %network.name, %action, error = %error, "network failed");
        self.failures.push(ApplyFailure {
            network: network.name.clone(),
            vlan_id: network.vlan,
            action,
            error: error.to_string(),
            config: network.clone(),
        });
        if options.fail_fast {
            return Err(ApplyError::Aborted {
                report: Box::new(std::mem::take(self)),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    /// Nothing was attempted: the initial listing failed.
    #[error(transparent)]
    Controller(#[from] CoreError),

    /// Fail-fast stopped the batch. The report holds what succeeded first.
    #[error("apply aborted after failure on '{}'", failed_network(.report))]
    Aborted { report: Box<ApplyReport> },
}

fn failed_network(report: &ApplyReport) -> &str {
    report
        .failures
        .last()
        .map_or("<unknown>", |f| f.network.as_str())
}

/// Create or update every desired network, then optionally prune.
pub async fn apply<C: NetworkController>(
    controller: &C,
    desired: &[Network],
    options: ApplyOptions,
) -> Result<ApplyReport, ApplyError> {
    let mut existing: IndexMap<String, Network> = controller
        .list_networks()
        .await?
        .into_iter()
        .map(|n| (n.name.clone(), n))
        .collect();
    info!(
        desired = desired.len(),
        existing = existing.len(),
        "applying desired networks"
    );

    let mut report = ApplyReport::default();

    for want in desired {
        match existing.get(&want.name) {
            Some(have) if want.managed().satisfied_by(&have.managed()) => {
                debug!(name = %want.name, "already up to date");
                report.unchanged.push(have.clone());
            }
            Some(have) => {
                let merged = want.merged_over(have);
                let Some(id) = have.id.clone() else {
                    let err = CoreError::Internal(format!(
                        "controller network '{}' has no id",
                        have.name
                    ));
                    report.fail(&merged, ApplyAction::Update, &err, options)?;
                    continue;
                };
                match controller.update_network(&id, &merged).await {
                    Ok(updated) => {
                        info!(name = %want.name, %id, "updated network");
                        existing.insert(updated.name.clone(), updated.clone());
                        report.updated.push(updated);
                    }
                    Err(e) => report.fail(&merged, ApplyAction::Update, &e, options)?,
                }
            }
            None => match controller.create_network(want).await {
                Ok(created) => {
                    info!(name = %want.name, id = ?created.id, "created network");
                    existing.insert(created.name.clone(), created.clone());
                    report.created.push(created);
                }
                Err(e) => report.fail(want, ApplyAction::Create, &e, options)?,
            },
        }
    }

    if options.prune {
        prune(controller, desired, &existing, &mut report, options).await?;
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        unchanged = report.unchanged.len(),
        deleted = report.deleted.len(),
        failed = report.failures.len(),
        "apply finished"
    );
    Ok(report)
}

async fn prune<C: NetworkController>(
    controller: &C,
    desired: &[Network],
    existing: &IndexMap<String, Network>,
    report: &mut ApplyReport,
    options: ApplyOptions,
) -> Result<(), ApplyError> {
    let candidates = existing
        .values()
        .filter(|n| is_ephemeral(&n.name) && !desired.iter().any(|d| d.name == n.name));

    for network in candidates {
        let Some(id) = network.id.as_deref() else {
            let err = CoreError::Internal(format!("controller network '{}' has no id", network.name));
            report.fail(network, ApplyAction::Delete, &err, options)?;
            continue;
        };
        match controller.delete_network(id).await {
            Ok(()) => {
                info!(name = %network.name, %id, "deleted ephemeral network");
                report.deleted.push(network.clone());
            }
            Err(e) => report.fail(network, ApplyAction::Delete, &e, options)?,
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::reconcile::reconcile;

    /// In-memory controller with scripted failures.
    #[derive(Default)]
    pub(crate) struct FakeController {
        pub networks: RefCell<IndexMap<String, Network>>,
        pub fail_names: HashSet<String>,
        pub next_id: Cell<u32>,
        pub creates: Cell<u32>,
        pub updates: Cell<u32>,
    }

    impl FakeController {
        pub fn with(networks: Vec<Network>) -> Self {
            let fake = Self::default();
            for mut network in networks {
                if network.id.is_none() {
                    network.id = Some(fake.allocate_id());
                }
                fake.networks
                    .borrow_mut()
                    .insert(network.name.clone(), network);
            }
            fake
        }

        fn allocate_id(&self) -> String {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            format!("net-{id}")
        }

        fn check(&self, name: &str) -> Result<(), CoreError> {
            if self.fail_names.contains(name) {
                return Err(CoreError::Api {
                    message: "api.err.VlanUsed".into(),
                    status: None,
                });
            }
            Ok(())
        }

        pub fn snapshot(&self) -> Vec<Network> {
            self.networks.borrow().values().cloned().collect()
        }
    }

    impl NetworkController for FakeController {
        async fn list_networks(&self) -> Result<Vec<Network>, CoreError> {
            Ok(self.snapshot())
        }

        async fn create_network(&self, network: &Network) -> Result<Network, CoreError> {
            self.check(&network.name)?;
            self.creates.set(self.creates.get() + 1);
            let mut stored = network.clone();
            stored.id = Some(self.allocate_id());
            self.networks
                .borrow_mut()
                .insert(stored.name.clone(), stored.clone());
            Ok(stored)
        }

        async fn update_network(&self, id: &str, network: &Network) -> Result<Network, CoreError> {
            self.check(&network.name)?;
            self.updates.set(self.updates.get() + 1);
            let mut stored = network.clone();
            stored.id = Some(id.to_owned());
            self.networks
                .borrow_mut()
                .insert(stored.name.clone(), stored.clone());
            Ok(stored)
        }

        async fn delete_network(&self, id: &str) -> Result<(), CoreError> {
            let name = self
                .networks
                .borrow()
                .values()
                .find(|n| n.id.as_deref() == Some(id))
                .map(|n| n.name.clone());
            if let Some(name) = name {
                self.check(&name)?;
                self.networks.borrow_mut().shift_remove(&name);
            }
            Ok(())
        }
    }

    pub(crate) fn net(name: &str, vlan: u16, subnet: &str) -> Network {
        let mut network = Network::new(name);
        network.vlan = Some(vlan);
        network.ip_subnet = Some(subnet.parse().unwrap());
        network.dhcpd_enabled = Some(true);
        network
    }

    fn names(networks: &[Network]) -> Vec<&str> {
        networks.iter().map(|n| n.name.as_str()).collect()
    }

    fn three() -> Vec<Network> {
        vec![
            net("lan", 10, "10.1.0.1/24"),
            net("iot", 20, "10.2.0.1/24"),
            net("guest", 30, "10.3.0.1/24"),
        ]
    }

    #[tokio::test]
    async fn creates_missing_networks() {
        let fake = FakeController::default();
        let report = apply(&fake, &three(), ApplyOptions::default()).await.unwrap();

        assert_eq!(names(&report.created), vec!["lan", "iot", "guest"]);
        assert!(report.is_success());
        assert!(report.created.iter().all(|n| n.id.is_some()));
    }

    #[tokio::test]
    async fn partial_failure_keeps_going() {
        let fake = FakeController {
            fail_names: HashSet::from(["iot".to_owned()]),
            ..FakeController::default()
        };
        let report = apply(&fake, &three(), ApplyOptions::default()).await.unwrap();

        assert_eq!(names(&report.applied_snapshot()), vec!["lan", "guest"]);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.network, "iot");
        assert_eq!(failure.vlan_id, Some(20));
        assert_eq!(failure.action, ApplyAction::Create);
        assert!(failure.error.contains("VlanUsed"));
        assert_eq!(failure.config.ip_subnet, three()[1].ip_subnet);
    }

    #[tokio::test]
    async fn fail_fast_stops_and_keeps_prior_successes() {
        let fake = FakeController {
            fail_names: HashSet::from(["iot".to_owned()]),
            ..FakeController::default()
        };
        let options = ApplyOptions {
            fail_fast: true,
            ..ApplyOptions::default()
        };

        let Err(ApplyError::Aborted { report }) = apply(&fake, &three(), options).await else {
            panic!("expected abort");
        };
        assert_eq!(names(&report.created), vec!["lan"]);
        assert_eq!(report.failures[0].network, "iot");
        assert!(!fake.networks.borrow().contains_key("guest"));
    }

    #[tokio::test]
    async fn updates_merge_over_controller_fields() {
        let mut live = net("lan", 5, "10.1.0.1/24");
        live.extra.insert("site_id".into(), "s1".into());
        let fake = FakeController::with(vec![live]);

        let report = apply(&fake, &[net("lan", 10, "10.1.0.1/24")], ApplyOptions::default())
            .await
            .unwrap();

        assert_eq!(names(&report.updated), vec!["lan"]);
        let stored = &fake.snapshot()[0];
        assert_eq!(stored.vlan, Some(10));
        assert_eq!(stored.id.as_deref(), Some("net-1"));
        assert_eq!(stored.extra.get("site_id"), Some(&"s1".into()));
    }

    #[tokio::test]
    async fn matching_networks_are_not_resent() {
        let fake = FakeController::with(vec![net("lan", 10, "10.1.0.1/24")]);
        let report = apply(&fake, &[net("lan", 10, "10.1.0.1/24")], ApplyOptions::default())
            .await
            .unwrap();

        assert_eq!(names(&report.unchanged), vec!["lan"]);
        assert_eq!(fake.updates.get(), 0);
        assert_eq!(names(&report.applied_snapshot()), vec!["lan"]);
    }

    #[tokio::test]
    async fn second_apply_is_idempotent() {
        let fake = FakeController::default();
        let desired = three();

        let first = apply(&fake, &desired, ApplyOptions::default()).await.unwrap();
        let second = apply(&fake, &desired, ApplyOptions::default()).await.unwrap();

        assert_eq!(fake.creates.get(), 3);
        assert_eq!(fake.snapshot().len(), 3);
        assert!(second.created.is_empty() && second.updated.is_empty());
        assert_eq!(second.unchanged.len(), 3);

        let diff = reconcile(&desired, &first.applied_snapshot(), &fake.snapshot());
        assert!(diff.is_clean(), "{diff:?}");
    }

    #[tokio::test]
    async fn prune_deletes_only_ephemeral_strays() {
        let fake = FakeController::with(vec![
            net("Default", 1, "192.168.1.1/24"),
            net("test-ci-42", 900, "10.90.0.1/24"),
        ]);
        let options = ApplyOptions {
            prune: true,
            ..ApplyOptions::default()
        };

        let report = apply(&fake, &[net("lan", 10, "10.1.0.1/24")], options)
            .await
            .unwrap();

        assert_eq!(names(&report.deleted), vec!["test-ci-42"]);
        let remaining: Vec<String> = fake.snapshot().into_iter().map(|n| n.name).collect();
        assert_eq!(remaining, vec!["Default", "lan"]);
    }

    #[tokio::test]
    async fn no_prune_without_flag() {
        let fake = FakeController::with(vec![net("test-ci-42", 900, "10.90.0.1/24")]);
        let report = apply(&fake, &[], ApplyOptions::default()).await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(fake.snapshot().len(), 1);
    }
}
