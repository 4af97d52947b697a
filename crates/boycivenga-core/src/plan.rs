// ── Plan reporter ──
//
// Read-only counterpart of apply: reconcile and classify, never mutate.

use serde::Serialize;
use tracing::info;

use crate::controller::NetworkController;
use crate::error::CoreError;
use crate::model::Network;
use crate::reconcile::{DiffResult, reconcile};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Drop drift entries before deciding whether the plan is clean.
    pub ignore_drift: bool,
}

/// Overall verdict of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Clean,
    ChangesPending,
}

impl PlanStatus {
    pub fn of(diff: &DiffResult) -> Self {
        if diff.is_clean() {
            Self::Clean
        } else {
            Self::ChangesPending
        }
    }
}

/// Classify the difference between the three views.
pub fn plan(
    desired: &[Network],
    recorded: &[Network],
    actual: &[Network],
    options: PlanOptions,
) -> DiffResult {
    let mut diff = reconcile(desired, recorded, actual);
    if options.ignore_drift {
        diff.clear_drift();
    }
    info!(summary = %diff.summary(), "plan computed");
    diff
}

/// Query the controller for actual state, then plan.
pub async fn plan_against<C: NetworkController>(
    controller: &C,
    desired: &[Network],
    recorded: &[Network],
    options: PlanOptions,
) -> Result<DiffResult, CoreError> {
    let actual = controller.list_networks().await?;
    Ok(plan(desired, recorded, &actual, options))
}
