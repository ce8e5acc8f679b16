//! Running the `git` executable as a subprocess.
//!
//! Reads go through `git2`. Anything that moves branches or touches the
//! working copy runs the real `git` instead, so that hooks, merge drivers and
//! the user's configuration all apply.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt::Write;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use eyre::Context;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::core::effects::{Effects, OperationType};
use crate::git::repo::Repo;
use crate::util::{ExitCode, EyreExitOr};

/// Where the `git` executable is and how to launch it.
#[derive(Clone)]
pub struct GitRunInfo {
    /// The path to the Git executable on disk.
    pub path_to_git: PathBuf,

    /// The directory `git-tracking` was started in.
    pub working_directory: PathBuf,

    /// The complete environment passed to each Git process.
    pub env: HashMap<OsString, OsString>,
}

impl std::fmt::Debug for GitRunInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<GitRunInfo path_to_git={:?} working_directory={:?} env=not shown>",
            self.path_to_git, self.working_directory
        )
    }
}

/// What a quiet Git invocation left behind.
#[must_use]
#[derive(Debug)]
pub struct GitOutput {
    /// The exit code of the process.
    pub exit_code: ExitCode,

    /// Everything the process wrote to stderr, decoded lossily.
    pub stderr: String,
}

fn to_exit_code(status: ExitStatus) -> eyre::Result<ExitCode> {
    // A child terminated by a signal has no exit code and is reported as `1`.
    ExitCode::try_from(status).wrap_err("Converting exit code from i32 to isize")
}

/// Copy `stream` line by line into `output` on a separate thread, so that a
/// full stderr pipe can't block the child while stdout is being read.
fn forward_lines(
    stream: Option<impl Read + Send + 'static>,
    mut output: impl Write + Send + 'static,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let Some(stream) = stream else {
            return;
        };
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else {
                break;
            };
            if writeln!(output, "{line}").is_err() {
                break;
            }
        }
    })
}

impl GitRunInfo {
    /// A `git` command with the stored environment and no stdin.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.path_to_git);
        command
            .current_dir(&self.working_directory)
            .env_clear()
            .envs(self.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    /// Run Git, echoing the command line and forwarding its output through
    /// `effects`. A non-zero exit is returned as `Err(exit_code)`.
    #[instrument]
    #[must_use = "The return code for `GitRunInfo::run` must be checked"]
    pub fn run<S: AsRef<OsStr> + std::fmt::Debug>(
        &self,
        effects: &Effects,
        args: &[S],
    ) -> EyreExitOr<()> {
        let args: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
        let args_string = args.iter().map(|arg| arg.to_string_lossy()).join(" ");
        let (effects, _progress) = effects.start_operation(OperationType::RunGitCommand(
            Arc::new(format!("git {args_string}")),
        ));
        writeln!(
            effects.get_output_stream(),
            "git-tracking: running command: {} {args_string}",
            self.path_to_git.to_string_lossy(),
        )?;

        let mut child = self
            .command()
            .args(&args)
            .spawn()
            .wrap_err("Spawning Git subprocess")?;
        let stdout_thread = forward_lines(child.stdout.take(), effects.get_output_stream());
        let stderr_thread = forward_lines(child.stderr.take(), effects.get_error_stream());
        let status = child
            .wait()
            .wrap_err("Waiting for Git subprocess to complete")?;
        for (thread, stream_name) in [(stdout_thread, "stdout"), (stderr_thread, "stderr")] {
            thread
                .join()
                .map_err(|_| eyre::eyre!("Git {stream_name} forwarding thread panicked"))?;
        }

        let exit_code = to_exit_code(status)?;
        if exit_code.is_success() {
            Ok(Ok(()))
        } else {
            Ok(Err(exit_code))
        }
    }

    /// Run Git against `repo` without showing anything to the user. The
    /// caller decides what a non-zero exit code means.
    #[instrument]
    pub fn run_quietly(&self, repo: &Repo, args: &[&str]) -> eyre::Result<GitOutput> {
        let repo_dir = repo
            .get_working_copy_path()
            .unwrap_or_else(|| repo.get_path().to_path_buf());
        let output = self
            .command()
            .arg("-C")
            .arg(&repo_dir)
            .args(args)
            .output()
            .wrap_err("Running Git subprocess")?;

        let result = GitOutput {
            exit_code: to_exit_code(output.status)?,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.exit_code.is_success() {
            debug!(?args, ?result, "Git exited unsuccessfully");
        }
        Ok(result)
    }
}
