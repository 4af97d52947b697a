//! `boycivenga plan`: read-only diff of inventory, recorded and live state.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tabled::Tabled;

use boycivenga_core::plan::plan_against;
use boycivenga_core::{
    DiffResult, DiffSummary, ManagedField, ManagedFields, PlanOptions, PlanStatus, RecordedState,
    UnifiController,
};

use super::util;
use crate::cli::PlanArgs;
use crate::config::Context;
use crate::error::{CliError, exit_code};
use crate::output::{self, Painter};

// ── Report shape ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PlanReport<'a> {
    site: &'a str,
    status: PlanStatus,
    summary: DiffSummary,
    input_checksum: &'a str,
    last_apply: Option<LastApply<'a>>,
    diff: &'a DiffResult,
}

#[derive(Debug, Serialize)]
struct LastApply<'a> {
    applied_at: DateTime<Utc>,
    applied_by: &'a str,
    input_checksum: &'a str,
    /// The input is byte-identical to the one last applied.
    input_matches: bool,
}

impl<'a> LastApply<'a> {
    fn of(state: &'a RecordedState, input_checksum: &str) -> Self {
        Self {
            applied_at: state.applied_at,
            applied_by: &state.applied_by,
            input_checksum: &state.tfvars_checksum,
            input_matches: state.matches_input(input_checksum),
        }
    }
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "VLAN")]
    vlan: String,
    #[tabled(rename = "Subnet")]
    subnet: String,
    #[tabled(rename = "Changes")]
    changes: String,
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: PlanArgs, ctx: &Context<'_>) -> Result<i32, CliError> {
    ctx.check_transport()?;

    let input = util::load_desired(&args.input)?;
    let site = ctx.site()?;
    let recorded = ctx.state_store(&site, args.state_file.as_deref()).load()?;
    let recorded_networks = recorded
        .as_ref()
        .map(RecordedState::networks)
        .unwrap_or_default();

    let controller = UnifiController::connect(&ctx.controller_config()?).await?;
    let options = PlanOptions {
        ignore_drift: args.ignore_drift,
    };
    let diff = plan_against(&controller, &input.networks, &recorded_networks, options).await;
    controller.disconnect().await;
    let diff = diff?;

    let status = PlanStatus::of(&diff);
    let report = PlanReport {
        site: &site,
        status,
        summary: diff.summary(),
        input_checksum: &input.checksum,
        last_apply: recorded
            .as_ref()
            .map(|state| LastApply::of(state, &input.checksum)),
        diff: &diff,
    };

    let painter = Painter::new(ctx.color());
    let rendered = output::render_report(args.output, &report, |r| render_human(r, painter))?;
    output::print_output(&rendered, ctx.global.quiet);

    Ok(exit_status(status))
}

/// 0 when the controller already matches, 2 when apply has work to do.
fn exit_status(status: PlanStatus) -> i32 {
    match status {
        PlanStatus::Clean => exit_code::SUCCESS,
        PlanStatus::ChangesPending => exit_code::CHANGES_PENDING,
    }
}

// ── Human rendering ──────────────────────────────────────────────────

fn render_human(report: &PlanReport<'_>, painter: Painter) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", painter.heading(&format!("Plan for site '{}'", report.site)));

    match &report.last_apply {
        Some(last) => {
            let _ = writeln!(
                out,
                "Last apply: {} by {}",
                last.applied_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                last.applied_by
            );
            let note = if last.input_matches {
                "Input unchanged since last apply".to_owned()
            } else {
                painter.warning("Input changed since last apply")
            };
            let _ = writeln!(out, "{note}");
        }
        None => {
            let _ = writeln!(out, "No recorded state (first apply)");
        }
    }
    out.push('\n');

    let rows = change_rows(report.diff);
    if rows.is_empty() {
        let _ = writeln!(out, "{}", painter.success("No changes. Controller matches the inventory."));
    } else {
        let _ = writeln!(out, "{}", output::render_table(&rows));
    }

    let _ = write!(out, "Plan: {}", report.summary);
    out
}

fn change_rows(diff: &DiffResult) -> Vec<ChangeRow> {
    let mut rows = Vec::new();

    for network in &diff.to_create {
        rows.push(ChangeRow {
            action: "create".into(),
            name: network.name.clone(),
            vlan: output::or_dash(network.vlan),
            subnet: output::or_dash(network.ip_subnet),
            changes: "-".into(),
        });
    }
    for change in &diff.to_update {
        rows.push(ChangeRow {
            action: "update".into(),
            name: change.name.clone(),
            vlan: output::or_dash(change.desired.vlan.or(change.current.vlan)),
            subnet: output::or_dash(change.desired.ip_subnet.or(change.current.ip_subnet)),
            changes: describe(&change.fields, &change.current, &change.desired),
        });
    }
    for network in &diff.to_delete {
        rows.push(ChangeRow {
            action: "delete".into(),
            name: network.name.clone(),
            vlan: output::or_dash(network.vlan),
            subnet: output::or_dash(network.ip_subnet),
            changes: "-".into(),
        });
    }
    for drift in &diff.drift {
        rows.push(ChangeRow {
            action: "drift".into(),
            name: drift.name.clone(),
            vlan: output::or_dash(drift.actual.vlan),
            subnet: output::or_dash(drift.actual.ip_subnet),
            changes: describe(&drift.fields, &drift.recorded, &drift.actual),
        });
    }
    rows
}

/// One `field: from -> to` line per differing field.
fn describe(fields: &[ManagedField], from: &ManagedFields, to: &ManagedFields) -> String {
    fields
        .iter()
        .map(|&field| {
            format!(
                "{field}: {} -> {}",
                output::or_dash(from.value(field)),
                output::or_dash(to.value(field))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boycivenga_core::{Network, plan::plan};

    use super::*;
    use crate::cli::ColorMode;

    fn net(name: &str, vlan: u16, subnet: &str) -> Network {
        let mut n = Network::new(name);
        n.vlan = Some(vlan);
        n.ip_subnet = Some(subnet.parse().unwrap());
        n
    }

    fn report<'a>(diff: &'a DiffResult, last: Option<LastApply<'a>>) -> PlanReport<'a> {
        PlanReport {
            site: "default",
            status: PlanStatus::of(diff),
            summary: diff.summary(),
            input_checksum: "sha256:aa",
            last_apply: last,
            diff,
        }
    }

    #[test]
    fn first_run_lists_creates() {
        let diff = plan(&[net("lan", 10, "10.1.0.1/24")], &[], &[], PlanOptions::default());
        let out = render_human(&report(&diff, None), Painter::new(ColorMode::Never));

        assert!(out.contains("No recorded state"));
        assert!(out.contains("create"));
        assert!(out.contains("10.1.0.1/24"));
        assert!(out.ends_with("Plan: 1 to create, 0 to update, 0 to delete, 0 drifted"));
    }

    #[test]
    fn update_shows_field_transitions() {
        let desired = [net("lan", 10, "10.1.0.1/24")];
        let actual = [net("lan", 5, "10.1.0.1/24")];
        let diff = plan(&desired, &[], &actual, PlanOptions::default());
        let out = render_human(&report(&diff, None), Painter::new(ColorMode::Never));

        assert!(out.contains("vlan: 5 -> 10"));
    }

    #[test]
    fn clean_plan_notes_matching_input() {
        let lan = net("lan", 10, "10.1.0.1/24");
        let diff = plan(
            std::slice::from_ref(&lan),
            std::slice::from_ref(&lan),
            std::slice::from_ref(&lan),
            PlanOptions::default(),
        );
        let at = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let state = RecordedState::from_applied(&[lan], "default", "alice", "sha256:aa", at);
        let out = render_human(
            &report(&diff, Some(LastApply::of(&state, "sha256:aa"))),
            Painter::new(ColorMode::Never),
        );

        assert!(out.contains("Last apply: 2025-03-01T12:00:00Z by alice"));
        assert!(out.contains("Input unchanged since last apply"));
        assert!(out.contains("No changes."));
    }

    #[test]
    fn json_report_carries_status() {
        let diff = plan(&[net("lan", 10, "10.1.0.1/24")], &[], &[], PlanOptions::default());
        let rendered = output::render_report(crate::cli::OutputFormat::Json, &report(&diff, None), |_| {
            String::new()
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["status"], "changes_pending");
        assert_eq!(value["summary"]["create"], 1);
        assert_eq!(value["diff"]["to_create"][0]["name"], "lan");
        assert_eq!(value["diff"]["is_clean"], false);
    }

    #[test]
    fn exit_status_per_plan_status() {
        assert_eq!(exit_status(PlanStatus::Clean), 0);
        assert_eq!(exit_status(PlanStatus::ChangesPending), 2);
    }
}
