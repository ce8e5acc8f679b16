//! Sub-commands of `git-tracking`.

mod pull;
mod show;
mod status;
mod sync;
mod track;

use std::fmt::Write;

use cursive_core::theme::{BaseColor, Effect, Style};
use git_tracking_invoke::CommandContext;
use git_tracking_opts::{Command, Opts};
use lazy_static::lazy_static;
use lib::core::config::print_hint;
use lib::core::effects::Effects;
use lib::core::error::Error;
use lib::core::formatting::StyledStringBuilder;
use lib::util::{ExitCode, EyreExitOr};
use tracing::debug;

lazy_static! {
    static ref STYLE_ERROR: Style = Style::merge(&[BaseColor::Red.light().into(), Effect::Bold.into()]);
}

/// Print a domain error and its hint, if any, to the error stream and return
/// the exit code the command should end with.
fn report_error(effects: &Effects, err: &Error) -> eyre::Result<ExitCode> {
    debug!(?err, "Command failed");
    writeln!(
        effects.get_error_stream(),
        "{}",
        effects.get_glyphs().render(
            StyledStringBuilder::new()
                .append_styled("error", *STYLE_ERROR)
                .append_plain(format!(": {err}"))
                .build()
        )?
    )?;
    if let Some(hint) = err.hint() {
        print_hint(effects, &hint)?;
    }
    Ok(err.exit_code())
}

/// Convert the result of a core operation into the command's result: domain
/// errors are reported to the user and become a failing exit code.
fn handle_result<T>(effects: &Effects, result: lib::core::error::Result<T>) -> EyreExitOr<T> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(err) => Ok(Err(report_error(effects, &err)?)),
    }
}

/// End the command with `exit_code`.
fn finish(exit_code: ExitCode) -> EyreExitOr<()> {
    if exit_code.is_success() {
        Ok(Ok(()))
    } else {
        Ok(Err(exit_code))
    }
}

fn command_main(ctx: CommandContext, opts: Opts) -> EyreExitOr<()> {
    let CommandContext {
        effects,
        git_run_info,
    } = ctx;
    let Opts {
        global_args: _,
        command,
    } = opts;

    match command {
        Command::Sync {
            fetch_options,
            stash_options,
        } => sync::sync(
            &effects,
            &git_run_info,
            fetch_options.choice(),
            stash_options.choice(),
        ),

        Command::Pull {
            rebase,
            merge,
            no_fetch,
            stash_options,
        } => {
            let prefer_rebase = match (rebase, merge) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            };
            pull::pull(
                &effects,
                &git_run_info,
                prefer_rebase,
                !no_fetch,
                stash_options.choice(),
            )
        }

        Command::Track {
            remote,
            branch,
            start_point,
            marker,
            reset,
            new,
            fetch,
        } => track::track(
            &effects,
            &git_run_info,
            &remote,
            branch,
            track::TrackOptions {
                start_point,
                marker,
                reset,
                new,
                fetch,
            },
        ),

        Command::Status {
            fetch_options,
            pull,
            stash_options,
            remote_only,
            all,
        } => {
            let remote_only = match (remote_only, all) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            };
            status::status(
                &effects,
                &git_run_info,
                fetch_options.choice(),
                pull,
                stash_options.choice(),
                remote_only,
            )
        }

        Command::Show { branch } => show::show(&effects, &git_run_info, branch),
    }
}

/// Execute the main process and exit with the appropriate exit code.
pub fn main() {
    git_tracking_invoke::invoke_main(command_main)
}
