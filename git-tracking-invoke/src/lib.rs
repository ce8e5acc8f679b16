//! Process setup shared by every `git-tracking` command: global arguments,
//! working directory, color selection, and logging.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

use std::any::Any;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::SystemTime;

use clap::Parser;
use eyre::Context;
use git_tracking_opts::{ColorSetting, GlobalArgs, WithGlobalArgs};
use lib::core::config::env_vars::{get_git_exec_path, get_path_to_git};
use lib::core::effects::Effects;
use lib::core::formatting::Glyphs;
use lib::git::GitRunInfo;
use lib::util::{ExitCode, EyreExitOr};
use tracing::level_filters::LevelFilter;
use tracing::{info, instrument, warn};
use tracing_chrome::ChromeLayerBuilder;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Shared context for all commands.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// The `Effects` to use.
    pub effects: Effects,

    /// Information about the Git executable currently being used.
    pub git_run_info: GitRunInfo,
}

/// The log filter to use when `RUST_LOG` isn't set. Third-party crates are
/// left out so that they can't log spuriously.
fn default_log_directive(verbose: bool) -> &'static str {
    if verbose {
        "git_tracking=info,tracking=info"
    } else {
        "git_tracking=warn,tracking=warn"
    }
}

/// Where to write a Chrome trace, as requested by `RUST_PROFILE`. A value of
/// `1` or `true` picks a timestamped file name.
fn profile_output_path() -> eyre::Result<Option<String>> {
    match std::env::var("RUST_PROFILE") {
        Ok(value) if value == "1" || value == "true" => {
            let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
            Ok(Some(format!("trace-{}.json", now.as_secs())))
        }
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        Ok(_) | Err(_) => Ok(None),
    }
}

#[must_use = "This function returns a guard object to flush traces. Dropping it immediately is probably incorrect. Make sure that the returned value lives until tracing has finished."]
#[instrument]
fn install_tracing(effects: Effects, verbose: bool) -> eyre::Result<impl Drop> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse(
            std::env::var(EnvFilter::DEFAULT_ENV)
                .unwrap_or_else(|_| default_log_directive(verbose).to_string()),
        )?;
    let fmt_layer = tracing_fmt::layer().with_writer(move || effects.clone().get_error_stream());

    struct NoFlush;
    let (profile_layer, flush_guard): (_, Box<dyn Any>) = match profile_output_path()? {
        Some(path) => {
            let include_args = std::env::var_os("RUST_PROFILE_INCLUDE_ARGS")
                .is_some_and(|value| !value.is_empty());
            let (layer, flush_guard) = ChromeLayerBuilder::new()
                .file(path)
                .include_args(include_args)
                .build();
            (Some(layer), Box::new(flush_guard))
        }
        None => (None, Box::new(NoFlush)),
    };

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(fmt_layer.with_filter(env_filter))
        .with(profile_layer)
        .try_init()?;

    Ok(flush_guard)
}

#[instrument]
fn install_libgit2_tracing() {
    fn git_trace(level: git2::TraceLevel, msg: &[u8]) {
        info!("[{:?}]: {}", level, String::from_utf8_lossy(msg));
    }

    if let Err(err) = git2::trace_set(git2::TraceLevel::Trace, git_trace) {
        warn!("Failed to install libgit2 tracing: {err}");
    }
}

/// Git is launched with this process's environment. Outside of tests the
/// executable is the `git` on `PATH`.
fn make_git_run_info() -> eyre::Result<GitRunInfo> {
    let mut env: HashMap<OsString, OsString> = std::env::vars_os().collect();
    if let Ok(git_exec_path) = get_git_exec_path() {
        env.entry("GIT_EXEC_PATH".into())
            .or_insert(git_exec_path.into());
    }
    Ok(GitRunInfo {
        path_to_git: get_path_to_git().unwrap_or_else(|_| PathBuf::from("git")),
        working_directory: std::env::current_dir()?,
        env,
    })
}

fn glyphs_for(color: Option<ColorSetting>) -> Glyphs {
    match color {
        Some(ColorSetting::Always) => Glyphs::pretty(),
        Some(ColorSetting::Never) => Glyphs::text(),
        Some(ColorSetting::Auto) | None => Glyphs::detect(),
    }
}

/// Wrapper function for `main` to ensure that `Drop` is called for local
/// variables, since `std::process::exit` will skip them. You probably want to
/// call `invoke_main` instead.
#[instrument(skip(f))]
pub fn do_main_and_drop_locals<T: Parser + WithGlobalArgs>(
    f: impl Fn(CommandContext, T) -> EyreExitOr<()>,
    args: Vec<OsString>,
) -> eyre::Result<i32> {
    let command_args = T::parse_from(&args);
    let GlobalArgs {
        working_directory,
        color,
        quiet,
        verbose,
    } = command_args.global_args();
    let (working_directory, color, quiet, verbose) =
        (working_directory.clone(), color.clone(), *quiet, *verbose);

    if let Some(working_directory) = working_directory {
        std::env::set_current_dir(&working_directory)
            .wrap_err_with(|| format!("Could not set working directory to: {working_directory:?}"))?;
    }
    let git_run_info = make_git_run_info()?;
    let effects = Effects::new(glyphs_for(color));

    // Logs still go to stderr under `--quiet`.
    let _tracing_guard = install_tracing(effects.clone(), verbose);
    install_libgit2_tracing();

    let ctx = CommandContext {
        effects: if quiet { effects.suppress() } else { effects },
        git_run_info,
    };
    match f(ctx, command_args)? {
        Ok(()) => Ok(0),
        Err(ExitCode(exit_code)) => Ok(exit_code.try_into()?),
    }
}

/// Invoke the provided main function. This should be used in the `main.rs`
/// file of the executable. For example:
///
/// ```ignore
/// fn main() {
///     git_tracking_invoke::invoke_main(git_tracking::commands::command_main)
/// }
/// ```
#[instrument(skip(f))]
pub fn invoke_main<T: Parser + WithGlobalArgs>(f: impl Fn(CommandContext, T) -> EyreExitOr<()>) {
    // Install panic handler.
    color_eyre::install().expect("Could not install panic handler");
    let args = git_tracking_opts::rewrite_args(std::env::args_os().collect());
    let exit_code = do_main_and_drop_locals(f, args).expect("A fatal error occurred");
    std::process::exit(exit_code);
}
