//! The command-line options for `git-tracking`.

#![warn(missing_docs)]
#![warn(
    clippy::all,
    clippy::as_conversions,
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro
)]
#![allow(clippy::too_many_arguments, clippy::blocks_in_conditions)]

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

/// Whether to display terminal colors.
#[derive(Clone, Debug, ValueEnum)]
pub enum ColorSetting {
    /// Automatically determine whether to display colors from the terminal and environment variables.
    /// This is the default behavior.
    Auto,
    /// Always display terminal colors.
    Always,
    /// Never display terminal colors.
    Never,
}

/// Arguments which apply to all commands. Used during setup.
#[derive(Debug, Parser)]
pub struct GlobalArgs {
    /// Change to the given directory before executing the rest of the program.
    /// (The option is called `-C` for symmetry with Git.)
    #[clap(value_parser, short = 'C', global = true)]
    pub working_directory: Option<PathBuf>,

    /// Flag to force enable or disable terminal colors.
    #[clap(value_parser, long = "color", value_enum, global = true)]
    pub color: Option<ColorSetting>,

    /// Don't print progress or status messages. Exit codes are unaffected.
    #[clap(action, short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Log what is being done to stderr.
    #[clap(action, short = 'v', long = "verbose", global = true, conflicts_with = "quiet")]
    pub verbose: bool,
}

/// Whether to fetch before comparing. When neither flag is given, the
/// `tracking.fetchFirst` configuration option decides.
#[derive(Args, Debug, Default)]
pub struct FetchOptions {
    /// Fetch from the remote first.
    #[clap(action, long = "fetch")]
    pub fetch: bool,

    /// Don't fetch, even if `tracking.fetchFirst` is set.
    #[clap(action, long = "no-fetch", conflicts_with = "fetch")]
    pub no_fetch: bool,
}

impl FetchOptions {
    /// The explicit choice made on the command line, if any.
    pub fn choice(&self) -> Option<bool> {
        flag_choice(self.fetch, self.no_fetch)
    }
}

/// Whether to stash uncommitted changes around the operation. When neither
/// flag is given, the `tracking.autoStash` configuration option decides.
#[derive(Args, Debug, Default)]
pub struct StashOptions {
    /// Stash uncommitted changes first and restore them afterwards.
    #[clap(action, long = "stash")]
    pub stash: bool,

    /// Don't stash, even if `tracking.autoStash` is set.
    #[clap(action, long = "no-stash", conflicts_with = "stash")]
    pub no_stash: bool,
}

impl StashOptions {
    /// The explicit choice made on the command line, if any.
    pub fn choice(&self) -> Option<bool> {
        flag_choice(self.stash, self.no_stash)
    }
}

fn flag_choice(enable: bool, disable: bool) -> Option<bool> {
    match (enable, disable) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

/// `git-tracking` subcommands.
#[derive(Debug, Parser)]
pub enum Command {
    /// Bring the current branch up to date with its upstream, but only if
    /// that is a fast-forward.
    ///
    /// Never creates merge commits or rewrites history. If the branch has
    /// diverged from its upstream, nothing is changed and the command exits
    /// with a non-zero status.
    Sync {
        /// Options for fetching.
        #[clap(flatten)]
        fetch_options: FetchOptions,

        /// Options for stashing.
        #[clap(flatten)]
        stash_options: StashOptions,
    },

    /// Fetch the upstream of the current branch and integrate it.
    ///
    /// Clean linear local work is rebased onto the upstream; local history
    /// containing merge commits is merged instead.
    Pull {
        /// Rebase local commits onto the upstream when possible (the default
        /// unless `tracking.preferRebase` is `false`).
        #[clap(action, short = 'r', long = "rebase")]
        rebase: bool,

        /// Always merge the upstream instead of rebasing.
        #[clap(action, short = 'm', long = "merge", conflicts_with = "rebase")]
        merge: bool,

        /// Don't fetch before integrating.
        #[clap(action, long = "no-fetch")]
        no_fetch: bool,

        /// Options for stashing.
        #[clap(flatten)]
        stash_options: StashOptions,
    },

    /// Make a branch track the branch of the same name on a remote.
    ///
    /// An existing untracked branch is adopted as-is. A missing branch is
    /// created. A branch which already tracks something else is left alone.
    Track {
        /// The remote to track. Use `.` to track another local branch.
        #[clap(value_parser)]
        remote: String,

        /// The branch to set up. Defaults to the current branch.
        #[clap(value_parser)]
        branch: Option<String>,

        /// Where to create the branch if it doesn't exist yet. Defaults to
        /// `HEAD`.
        #[clap(value_parser, long = "from")]
        start_point: Option<String>,

        /// Add an empty commit to a newly-created branch recording where it
        /// started.
        #[clap(action, long = "marker")]
        marker: bool,

        /// Replace an existing untracked branch with the remote branch, as
        /// long as no local commits would be lost.
        #[clap(action, long = "reset")]
        reset: bool,

        /// Allow tracking a remote branch which doesn't exist yet, such as
        /// one that will be created by the first push.
        #[clap(action, long = "new", conflicts_with = "reset")]
        new: bool,

        /// Fetch the remote branch first.
        #[clap(action, long = "fetch")]
        fetch: bool,
    },

    /// Show how every local branch relates to its upstream.
    ///
    /// The current branch is listed first.
    Status {
        /// Options for fetching.
        #[clap(flatten)]
        fetch_options: FetchOptions,

        /// Fast-forward every branch which is strictly behind its upstream.
        #[clap(action, long = "pull")]
        pull: bool,

        /// Options for stashing.
        #[clap(flatten)]
        stash_options: StashOptions,

        /// Only list branches which track a remote branch.
        #[clap(action, long = "remote-only")]
        remote_only: bool,

        /// List untracked branches too, even if `tracking.remoteOnly` is set.
        #[clap(action, long = "all", conflicts_with = "remote_only")]
        all: bool,
    },

    /// Show the upstream of a branch and how far apart they are.
    Show {
        /// The branch to show. Defaults to the current branch.
        #[clap(value_parser)]
        branch: Option<String>,
    },
}

/// Keep local branches in step with the remote branches they track.
#[derive(Debug, Parser)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Opts {
    /// Global arguments.
    #[clap(flatten)]
    pub global_args: GlobalArgs,

    /// The `git-tracking` subcommand to run.
    #[clap(subcommand)]
    pub command: Command,
}

/// A parsed command line which carries the [`GlobalArgs`]. Global flags may
/// appear before or after the subcommand, so they are only known once the
/// whole command line has been parsed.
pub trait WithGlobalArgs {
    /// The global arguments given anywhere on the command line.
    fn global_args(&self) -> &GlobalArgs;
}

impl WithGlobalArgs for Opts {
    fn global_args(&self) -> &GlobalArgs {
        &self.global_args
    }
}

/// Carry out some rewrites on the command-line arguments for uniformity.
///
/// For example, `git-tracking-status` becomes `git-tracking status`, and the
/// `.exe` suffix is removed on Windows.
pub fn rewrite_args(args: Vec<OsString>) -> Vec<OsString> {
    let first_arg = match args.first() {
        None => return args,
        Some(first_arg) => first_arg.clone(),
    };

    // Don't use `std::env::current_exe`, because it may or may not resolve the
    // symlink.
    let exe_path = PathBuf::from(first_arg);
    let exe_name = match exe_path.file_name().and_then(|arg| arg.to_str()) {
        Some(exe_name) => exe_name,
        None => return args,
    };
    let exe_name = exe_name
        .strip_suffix(std::env::consts::EXE_SUFFIX)
        .unwrap_or(exe_name);

    match exe_name.strip_prefix("git-tracking-") {
        Some(subcommand) => {
            let mut new_args = vec![OsString::from("git-tracking"), OsString::from(subcommand)];
            new_args.extend(args.into_iter().skip(1));
            new_args
        }
        None => {
            let mut new_args = vec![OsString::from(exe_name)];
            new_args.extend(args.into_iter().skip(1));
            new_args
        }
    }
}
