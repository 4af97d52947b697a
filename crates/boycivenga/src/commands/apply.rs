//! `boycivenga apply`: push the desired networks and record what succeeded.

use std::fmt::Write as _;

use chrono::Utc;
use tracing::{info, warn};

use boycivenga_core::{
    ApplyError, ApplyOptions, ApplyReport, Network, RecordedState, UnifiController, apply,
};

use super::util::{self, DesiredInput};
use crate::cli::ApplyArgs;
use crate::config::Context;
use crate::error::{CliError, exit_code};
use crate::output::{self, Painter};

pub async fn handle(args: ApplyArgs, ctx: &Context<'_>) -> Result<i32, CliError> {
    ctx.check_transport()?;

    let input = util::load_desired(&args.input)?;

    if args.dry_run {
        let site = ctx.site()?;
        output::print_output(&render_dry_run(&site, &input.networks), ctx.global.quiet);
        return Ok(exit_code::SUCCESS);
    }

    let controller = UnifiController::connect(&ctx.controller_config()?).await?;
    let options = ApplyOptions {
        fail_fast: args.fail_fast,
        prune: args.prune,
    };
    let outcome = apply::apply(&controller, &input.networks, options).await;
    controller.disconnect().await;

    let (report, aborted) = match outcome {
        Ok(report) => (report, false),
        Err(ApplyError::Aborted { report }) => (*report, true),
        Err(ApplyError::Controller(e)) => return Err(e.into()),
    };

    record(ctx, controller.site(), args.state_file.as_deref(), &input, &report)?;

    let painter = Painter::new(ctx.color());
    output::print_output(&render_summary(&report, aborted, painter), ctx.global.quiet);

    if report.is_success() {
        Ok(exit_code::SUCCESS)
    } else {
        Err(CliError::ApplyFailed {
            failed: report.failures.len(),
            attempted: input.networks.len(),
        })
    }
}

/// Persist the applied snapshot. When nothing succeeded and something
/// failed, the previous record is left in place.
fn record(
    ctx: &Context<'_>,
    site: &str,
    state_file: Option<&std::path::Path>,
    input: &DesiredInput,
    report: &ApplyReport,
) -> Result<(), CliError> {
    let applied = report.applied_snapshot();
    let store = ctx.state_store(site, state_file);

    if applied.is_empty() && !report.is_success() {
        warn!(path = %store.path().display(), "no network applied, recorded state left unchanged");
        return Ok(());
    }

    let state = RecordedState::from_applied(
        &applied,
        site,
        Context::actor(),
        input.checksum.as_str(),
        Utc::now(),
    );
    store.save(&state)?;
    info!(networks = applied.len(), site, "recorded applied state");
    Ok(())
}

fn render_dry_run(site: &str, networks: &[Network]) -> String {
    let mut out = format!("Networks to apply to site '{site}':\n");
    for network in networks {
        let _ = writeln!(
            out,
            "  - {}: {}",
            util::network_label(&network.name, network.vlan),
            output::or_dash(network.ip_subnet)
        );
    }
    out.push_str("No changes applied (dry-run mode)");
    out
}

fn render_summary(report: &ApplyReport, aborted: bool, painter: Painter) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", painter.heading("Apply summary"));
    let _ = writeln!(out, "  Created:   {}", report.created.len());
    let _ = writeln!(out, "  Updated:   {}", report.updated.len());
    let _ = writeln!(out, "  Unchanged: {}", report.unchanged.len());
    if !report.deleted.is_empty() {
        let _ = writeln!(out, "  Deleted:   {}", report.deleted.len());
    }

    let failed = format!("  Failed:    {}", report.failures.len());
    if report.is_success() {
        let _ = write!(out, "{}", painter.success(&failed));
    } else {
        let _ = write!(out, "{}", painter.failure(&failed));
        for failure in &report.failures {
            let _ = write!(
                out,
                "\n    {} {} [{}]: {}",
                painter.failure("✗"),
                util::network_label(&failure.network, failure.vlan_id),
                failure.action,
                failure.error
            );
        }
    }

    if aborted {
        let _ = write!(
            out,
            "\n{}",
            painter.warning("Stopped at the first failure (--fail-fast); remaining networks were not attempted")
        );
    }
    out
}
