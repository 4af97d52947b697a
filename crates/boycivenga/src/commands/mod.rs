//! Command dispatch: bridges CLI args -> core reconciliation -> output.

pub mod apply;
pub mod plan;
pub mod util;

use crate::cli::Command;
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a command to its handler. Returns the process exit status.
pub async fn dispatch(cmd: Command, ctx: &Context<'_>) -> Result<i32, CliError> {
    match cmd {
        Command::Apply(args) => apply::handle(args, ctx).await,
        Command::Plan(args) => plan::handle(args, ctx).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
