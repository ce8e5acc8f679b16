//! Testing utilities.
//!
//! This is inside `src` rather than `tests` since the unit tests of the core
//! modules use [`FakeVcs`].

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::io::Write;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use eyre::Context;
use itertools::Itertools;
use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use tempfile::TempDir;
use tracing::instrument;

use crate::core::config::env_vars::{get_git_exec_path, get_path_to_git, TEST_GIT};
use crate::core::effects::Effects;
use crate::core::error::{Error, Result};
use crate::core::formatting::Glyphs;
use crate::git::{
    GitRunInfo, NonZeroOid, ReferenceName, Repo, RepoVcs, StashOutcome, UpdateOutcome, Vcs,
};
use crate::util::ExitCode;

const DUMMY_NAME: &str = "Testy McTestface";
const DUMMY_EMAIL: &str = "test@example.com";
const DUMMY_DATE: &str = "Wed 29 Oct 12:34:56 2020 PDT";

/// The directory containing the `git-tracking` binary under test, if it has
/// been built. Cargo names it in `CARGO_BIN_EXE_git-tracking` for the binary
/// crate's integration tests; otherwise look next to the test executable's
/// `deps` directory. Library tests don't need the binary at all.
fn find_tracking_bin_dir() -> Option<PathBuf> {
    let bin_path = match std::env::var_os("CARGO_BIN_EXE_git-tracking") {
        Some(path) => PathBuf::from(path),
        None => {
            let test_exe = std::env::current_exe().ok()?;
            let target_dir = test_exe.parent()?.parent()?;
            target_dir.join(format!("git-tracking{}", std::env::consts::EXE_SUFFIX))
        }
    };
    if bin_path.is_file() {
        bin_path.parent().map(Path::to_path_buf)
    } else {
        None
    }
}

/// Wrapper around the Git executable, for testing.
#[derive(Clone, Debug)]
pub struct Git {
    /// The path to the repository on disk. The directory itself must exist,
    /// although it might not have a `.git` folder in it. (Use `Git::init_repo`
    /// to initialize it.)
    pub repo_path: PathBuf,

    /// The path to the Git executable on disk.
    pub path_to_git: PathBuf,

    /// The `GIT_EXEC_PATH` environment variable value to use for testing.
    pub git_exec_path: PathBuf,
}

/// Options for `Git::init_repo_with_options`.
#[derive(Debug)]
pub struct GitInitOptions {
    /// If `true`, then `init_repo_with_options` makes an initial commit with
    /// some content.
    pub make_initial_commit: bool,
}

impl Default for GitInitOptions {
    fn default() -> Self {
        GitInitOptions {
            make_initial_commit: true,
        }
    }
}

/// Options for `Git::run_with_options`.
#[derive(Debug, Default)]
pub struct GitRunOptions {
    /// The timestamp of the command. Mostly useful for `git commit`. This should
    /// be a number like 0, 1, 2, 3...
    pub time: isize,

    /// The exit code that `Git` should return.
    pub expected_exit_code: i32,

    /// The input to write to the child process's stdin.
    pub input: Option<String>,

    /// Additional environment variables to start the process with.
    pub env: HashMap<String, String>,
}

impl Git {
    /// Constructor.
    pub fn new(path_to_git: PathBuf, repo_path: PathBuf, git_exec_path: PathBuf) -> Self {
        Git {
            repo_path,
            path_to_git,
            git_exec_path,
        }
    }

    /// Replace dynamic strings in the output, for testing purposes.
    pub fn preprocess_output(&self, stdout: String) -> eyre::Result<String> {
        let path_to_git = self
            .path_to_git
            .to_str()
            .ok_or_else(|| eyre::eyre!("Could not convert path to Git to string"))?;
        let output = stdout.replace(path_to_git, "<git-executable>");

        let repo_path = std::fs::canonicalize(&self.repo_path)?;
        let repo_path = repo_path
            .to_str()
            .ok_or_else(|| eyre::eyre!("Could not convert repo path to string"))?;
        let output = output.replace(repo_path, "<repo-path>");

        lazy_static! {
            // Progress displays rewrite the same line with a carriage return
            // before emitting the final newline.
            static ref CLEAR_LINE_RE: Regex = Regex::new(r"(^|\n).*(\r|\x1B\[K)").unwrap();
        }
        let output = CLEAR_LINE_RE
            .replace_all(&output, |captures: &Captures| captures[1].to_string())
            .into_owned();

        Ok(output)
    }

    /// Get the `PATH` environment variable to use for testing. The directory
    /// holding a built `git-tracking` comes first when there is one, so that
    /// `git tracking` runs it.
    pub fn get_path_for_env(&self) -> OsString {
        std::env::join_paths(
            find_tracking_bin_dir()
                .into_iter()
                .chain(std::iter::once(self.git_exec_path.clone())),
        )
        .expect("joining paths")
    }

    /// Get the environment variables needed to run git in the test environment.
    pub fn get_base_env(&self, time: isize) -> Vec<(OsString, OsString)> {
        // Baked into commit hashes.
        let date: OsString = format!("{DUMMY_DATE} -{time:0>2}").into();

        // ":" is understood by `git` to skip editing, which `git merge` and
        // `git rebase` would otherwise ask for.
        let git_editor = OsString::from(":");

        let envs = vec![
            ("GIT_CONFIG_NOSYSTEM", OsString::from("1")),
            ("GIT_AUTHOR_DATE", date.clone()),
            ("GIT_COMMITTER_DATE", date),
            ("GIT_EDITOR", git_editor),
            ("GIT_EXEC_PATH", self.git_exec_path.as_os_str().into()),
            ("PATH", self.get_path_for_env()),
            (TEST_GIT, self.path_to_git.as_os_str().into()),
        ];

        envs.into_iter()
            .map(|(key, value)| (OsString::from(key), value))
            .collect()
    }

    #[instrument]
    fn run_with_options_inner(
        &self,
        args: &[&str],
        options: &GitRunOptions,
    ) -> eyre::Result<(String, String)> {
        let GitRunOptions {
            time,
            expected_exit_code,
            input,
            env,
        } = options;

        let env: BTreeMap<_, _> = self
            .get_base_env(*time)
            .into_iter()
            .chain(
                env.iter()
                    .map(|(k, v)| (OsString::from(k), OsString::from(v))),
            )
            .collect();
        let mut command = Command::new(&self.path_to_git);
        command
            .current_dir(&self.repo_path)
            .args(args)
            .env_clear()
            .envs(&env);

        let result = if let Some(input) = input {
            let mut child = command
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()?;
            write!(child.stdin.take().unwrap(), "{}", &input)?;
            child.wait_with_output().wrap_err_with(|| {
                format!(
                    "Running git
                    Executable: {:?}
                    Args: {:?}
                    Stdin: {:?}
                    Env: <not shown>",
                    &self.path_to_git, &args, input
                )
            })?
        } else {
            command.output().wrap_err_with(|| {
                format!(
                    "Running git
                    Executable: {:?}
                    Args: {:?}
                    Env: <not shown>",
                    &self.path_to_git, &args
                )
            })?
        };

        let exit_code = result
            .status
            .code()
            .expect("Failed to read exit code from Git process");
        if exit_code != *expected_exit_code {
            eyre::bail!(
                "Git command {:?} {:?} exited with unexpected code {} (expected {})
stdout:
{}
stderr:
{}",
                &self.path_to_git,
                &args,
                exit_code,
                expected_exit_code,
                &String::from_utf8_lossy(&result.stdout),
                &String::from_utf8_lossy(&result.stderr),
            );
        }
        let stdout = self.preprocess_output(String::from_utf8(result.stdout)?)?;
        let stderr = self.preprocess_output(String::from_utf8(result.stderr)?)?;
        Ok((stdout, stderr))
    }

    /// Run a Git command.
    pub fn run_with_options<S: AsRef<str> + std::fmt::Debug>(
        &self,
        args: &[S],
        options: &GitRunOptions,
    ) -> eyre::Result<(String, String)> {
        self.run_with_options_inner(
            args.iter().map(|arg| arg.as_ref()).collect_vec().as_slice(),
            options,
        )
    }

    /// Run a Git command.
    pub fn run<S: AsRef<str> + std::fmt::Debug>(
        &self,
        args: &[S],
    ) -> eyre::Result<(String, String)> {
        if let Some(first_arg) = args.first() {
            if first_arg.as_ref() == "tracking" {
                eyre::bail!(
                    r#"Refusing to invoke `tracking` via `git.run(&["tracking", ...])`; instead, call `git.tracking(...)`"#
                );
            }
        }

        self.run_with_options(args, &Default::default())
    }

    /// Run a `git tracking` subcommand, expecting it to succeed.
    #[instrument]
    pub fn tracking(&self, subcommand: &str, args: &[&str]) -> eyre::Result<(String, String)> {
        self.tracking_with_options(subcommand, args, &Default::default())
    }

    /// Run a `git tracking` subcommand with the provided `GitRunOptions`.
    #[instrument]
    pub fn tracking_with_options(
        &self,
        subcommand: &str,
        args: &[&str],
        options: &GitRunOptions,
    ) -> eyre::Result<(String, String)> {
        let git_run_args = ["tracking", subcommand]
            .into_iter()
            .chain(args.iter().copied())
            .map(ToOwned::to_owned)
            .collect_vec();
        self.run_with_options(&git_run_args, options)
    }

    /// Set up a Git repo in the directory, with `master` as the initial
    /// branch.
    #[instrument]
    pub fn init_repo_with_options(&self, options: &GitInitOptions) -> eyre::Result<()> {
        self.run(&["init"])?;
        self.run(&["symbolic-ref", "HEAD", "refs/heads/master"])?;
        self.run(&["config", "user.name", DUMMY_NAME])?;
        self.run(&["config", "user.email", DUMMY_EMAIL])?;
        self.run(&["config", "core.autocrlf", "false"])?;

        if options.make_initial_commit {
            self.commit_file("initial", 0)?;
        }
        Ok(())
    }

    /// Set up a Git repo in the directory with an initial commit.
    pub fn init_repo(&self) -> eyre::Result<()> {
        self.init_repo_with_options(&Default::default())
    }

    /// Clone this repository into the `target` repository (which must not have
    /// been initialized).
    pub fn clone_repo_into(&self, target: &Git, additional_args: &[&str]) -> eyre::Result<()> {
        let remote = format!("file://{}", self.repo_path.to_str().unwrap());
        let mut args = vec![
            "clone",
            "-c",
            "core.autocrlf=false",
            &remote,
            target.repo_path.to_str().unwrap(),
        ];
        args.extend(additional_args.iter());
        self.run(args.as_slice())?;

        // Clones don't inherit the identity of the repository they came from.
        target.run(&["config", "user.name", DUMMY_NAME])?;
        target.run(&["config", "user.email", DUMMY_EMAIL])?;
        Ok(())
    }

    /// Write the provided contents to `<name>.txt` in the repository root.
    pub fn write_file_txt(&self, name: &str, contents: &str) -> eyre::Result<()> {
        let path = self.repo_path.join(format!("{name}.txt"));
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Commit a file with the given contents. The `time` argument is used to
    /// set the commit timestamp, which is factored into the commit hash.
    #[instrument]
    pub fn commit_file_with_contents(
        &self,
        name: &str,
        time: isize,
        contents: &str,
    ) -> eyre::Result<NonZeroOid> {
        self.write_file_txt(name, contents)?;
        self.run(&["add", "."])?;
        self.run_with_options(
            &["commit", "-m", &format!("create {name}.txt")],
            &GitRunOptions {
                time,
                ..Default::default()
            },
        )?;

        let repo = self.get_repo()?;
        let oid = repo
            .get_head_info()?
            .oid
            .expect("Could not find OID for just-created commit");
        Ok(oid)
    }

    /// Commit a file with default contents.
    pub fn commit_file(&self, name: &str, time: isize) -> eyre::Result<NonZeroOid> {
        self.commit_file_with_contents(name, time, &format!("{name} contents\n"))
    }

    /// Get a `Repo` object for this repository.
    #[instrument]
    pub fn get_repo(&self) -> eyre::Result<Repo> {
        let repo = Repo::from_dir(&self.repo_path)?;
        Ok(repo)
    }

    /// Get the `GitRunInfo` to use for this repository.
    #[instrument]
    pub fn get_git_run_info(&self) -> GitRunInfo {
        GitRunInfo {
            path_to_git: self.path_to_git.clone(),
            working_directory: self.repo_path.clone(),
            env: self.get_base_env(0).into_iter().collect(),
        }
    }

    /// Open the repository and run `f` against a [`RepoVcs`] for it, with
    /// output suppressed.
    pub fn with_vcs<T>(
        &self,
        f: impl FnOnce(&RepoVcs, &Effects) -> eyre::Result<T>,
    ) -> eyre::Result<T> {
        let effects = Effects::new_suppress_for_test(Glyphs::text());
        let repo = self.get_repo()?;
        let git_run_info = self.get_git_run_info();
        let vcs = RepoVcs::new(&effects, &repo, &git_run_info);
        f(&vcs, &effects)
    }
}

/// Wrapper around a `Git` instance which cleans up the repository once dropped.
pub struct GitWrapper {
    #[allow(dead_code)]
    repo_dir: TempDir,
    git: Git,
}

impl Deref for GitWrapper {
    type Target = Git;

    fn deref(&self) -> &Self::Target {
        &self.git
    }
}

static COLOR_EYRE_INSTALL: OnceCell<()> = OnceCell::new();

/// Create a temporary directory for testing and a `Git` instance to use with it.
pub fn make_git() -> eyre::Result<GitWrapper> {
    COLOR_EYRE_INSTALL.get_or_try_init(color_eyre::install)?;

    let repo_dir = tempfile::tempdir()?;
    let path_to_git = get_path_to_git()?;
    let git_exec_path = get_git_exec_path()?;
    let git = Git::new(path_to_git, repo_dir.path().to_path_buf(), git_exec_path);
    Ok(GitWrapper { repo_dir, git })
}

/// Represents a pair of directories that will be cleaned up after this value
/// dropped. The two directories need to be `init`ed and `clone`ed by the
/// caller, respectively.
pub struct GitWrapperWithRemoteRepo {
    /// Guard to clean up the containing temporary directory. Make sure to bind
    /// this to a local variable not named `_`.
    pub temp_dir: TempDir,

    /// The wrapper around the original repository, which acts as `origin`.
    pub original_repo: Git,

    /// The wrapper around the cloned repository.
    pub cloned_repo: Git,
}

/// Create a [`GitWrapperWithRemoteRepo`].
pub fn make_git_with_remote_repo() -> eyre::Result<GitWrapperWithRemoteRepo> {
    COLOR_EYRE_INSTALL.get_or_try_init(color_eyre::install)?;

    let path_to_git = get_path_to_git()?;
    let git_exec_path = get_git_exec_path()?;
    let temp_dir = tempfile::tempdir()?;
    let original_repo_path = temp_dir.path().join("original");
    std::fs::create_dir_all(&original_repo_path)?;
    let original_repo = Git::new(
        path_to_git.clone(),
        original_repo_path,
        git_exec_path.clone(),
    );
    let cloned_repo_path = temp_dir.path().join("cloned");
    let cloned_repo = Git::new(path_to_git, cloned_repo_path, git_exec_path);

    Ok(GitWrapperWithRemoteRepo {
        temp_dir,
        original_repo,
        cloned_repo,
    })
}

const FAKE_DEFAULT_OID: &str = "abcdef0123456789abcdef0123456789abcdef01";

#[derive(Debug)]
struct FakeState {
    current_branch: Option<String>,
    config: BTreeMap<String, String>,
    refs: BTreeMap<String, NonZeroOid>,
    commits_only_in: HashMap<(String, String), usize>,
    merge_commits: HashMap<(String, String), bool>,
    has_uncommitted_changes: bool,
    stash_depth: usize,
    update_outcome: UpdateOutcome,
    next_oid: u64,
    mutations: Vec<String>,
    queries: Vec<String>,
}

/// An in-memory [`Vcs`] which records every call made against it.
///
/// Commit graphs aren't modeled: the answers to `commits_only_in` and
/// `has_multi_parent_commit` are whatever was set up with
/// [`FakeVcs::set_commits_only_in`] and [`FakeVcs::set_has_merge_commit`]
/// (zero and `false` otherwise). Mutations update the fake's state where a
/// later query would observe it, so a successful update of the checked-out
/// branch leaves it no longer behind its target.
#[derive(Debug)]
pub struct FakeVcs {
    state: RefCell<FakeState>,
}

fn fake_failure(command: String) -> Error {
    Error::SubprocessFailed {
        command,
        exit_code: ExitCode(1),
    }
}

impl FakeVcs {
    /// A repository with `current_branch` checked out. The branch's ref is
    /// not created; use [`FakeVcs::add_ref`] for that.
    pub fn new(current_branch: &str) -> Self {
        Self::with_head(Some(current_branch.to_owned()))
    }

    /// A repository with a detached `HEAD`.
    pub fn detached() -> Self {
        Self::with_head(None)
    }

    fn with_head(current_branch: Option<String>) -> Self {
        Self {
            state: RefCell::new(FakeState {
                current_branch,
                config: Default::default(),
                refs: Default::default(),
                commits_only_in: Default::default(),
                merge_commits: Default::default(),
                has_uncommitted_changes: false,
                stash_depth: 0,
                update_outcome: UpdateOutcome::Updated,
                next_oid: 1,
                mutations: Default::default(),
                queries: Default::default(),
            }),
        }
    }

    /// Set a configuration value without recording a mutation.
    pub fn set_config_value(&self, key: &str, value: &str) {
        self.state
            .borrow_mut()
            .config
            .insert(key.to_owned(), value.to_owned());
    }

    /// Create a reference pointing at a fixed commit.
    pub fn add_ref(&self, name: &str) {
        self.add_ref_at(name, FAKE_DEFAULT_OID);
    }

    /// Create a reference pointing at the commit with the given hex ID.
    pub fn add_ref_at(&self, name: &str, oid: &str) {
        let oid: NonZeroOid = oid.parse().expect("Invalid OID for fake reference");
        self.state.borrow_mut().refs.insert(name.to_owned(), oid);
    }

    /// Delete a reference without recording a mutation.
    pub fn remove_ref(&self, name: &str) {
        self.state.borrow_mut().refs.remove(name);
    }

    /// Set the number of commits reachable from `from` but not `excluding`.
    pub fn set_commits_only_in(&self, from: &str, excluding: &str, num_commits: usize) {
        self.state
            .borrow_mut()
            .commits_only_in
            .insert((from.to_owned(), excluding.to_owned()), num_commits);
    }

    /// Set whether the commits reachable from `from` but not `excluding`
    /// include a merge commit.
    pub fn set_has_merge_commit(&self, from: &str, excluding: &str, value: bool) {
        self.state
            .borrow_mut()
            .merge_commits
            .insert((from.to_owned(), excluding.to_owned()), value);
    }

    /// Set whether there is anything for `stash_save` to save.
    pub fn set_has_uncommitted_changes(&self, value: bool) {
        self.state.borrow_mut().has_uncommitted_changes = value;
    }

    /// Set the outcome of subsequent `merge` and `rebase` calls.
    pub fn set_update_outcome(&self, outcome: UpdateOutcome) {
        self.state.borrow_mut().update_outcome = outcome;
    }

    /// Every mutating call made so far, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.state.borrow().mutations.clone()
    }

    /// Every read-only call made so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state.borrow().queries.clone()
    }

    fn query(&self, description: String) {
        self.state.borrow_mut().queries.push(description);
    }

    fn mutate(&self, description: String) {
        self.state.borrow_mut().mutations.push(description);
    }

    fn resolve_start_point(state: &FakeState, start_point: &str) -> Option<NonZeroOid> {
        [
            start_point.to_owned(),
            format!("refs/heads/{start_point}"),
            format!("refs/remotes/{start_point}"),
        ]
        .iter()
        .find_map(|name| state.refs.get(name).copied())
    }

    fn head_oid(state: &FakeState) -> Option<NonZeroOid> {
        match &state.current_branch {
            Some(branch_name) => state.refs.get(&format!("refs/heads/{branch_name}")).copied(),
            None => state.refs.get("HEAD").copied(),
        }
    }

    fn mint_oid(state: &mut FakeState) -> NonZeroOid {
        let oid = format!("{:040x}", state.next_oid);
        state.next_oid += 1;
        oid.parse().expect("Minted OID should be valid")
    }

    /// Move the checked-out branch to `target` after a successful update.
    fn apply_update(&self, target: &ReferenceName) {
        let mut state = self.state.borrow_mut();
        let branch_name = match &state.current_branch {
            Some(branch_name) => branch_name.clone(),
            None => return,
        };
        let local = format!("refs/heads/{branch_name}");
        if let Some(oid) = state.refs.get(target.as_str()).copied() {
            state.refs.insert(local.clone(), oid);
        }
        state
            .commits_only_in
            .insert((target.as_str().to_owned(), local), 0);
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> Result<Option<String>> {
        self.query("current_branch".to_owned());
        Ok(self.state.borrow().current_branch.clone())
    }

    fn get_config(&self, key: &str) -> Result<Option<String>> {
        self.query(format!("get_config {key}"));
        Ok(self
            .state
            .borrow()
            .config
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned())
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(format!("set_config {key} {value}"));
        self.set_config_value(key, value);
        Ok(())
    }

    fn unset_config(&self, key: &str) -> Result<()> {
        self.mutate(format!("unset_config {key}"));
        self.state.borrow_mut().config.remove(key);
        Ok(())
    }

    fn ref_exists(&self, reference: &ReferenceName) -> Result<bool> {
        self.query(format!("ref_exists {reference}"));
        Ok(self.state.borrow().refs.contains_key(reference.as_str()))
    }

    fn ref_target(&self, reference: &ReferenceName) -> Result<Option<NonZeroOid>> {
        self.query(format!("ref_target {reference}"));
        let state = self.state.borrow();
        if reference.as_str() == "HEAD" {
            return Ok(Self::head_oid(&state));
        }
        Ok(state.refs.get(reference.as_str()).copied())
    }

    fn local_branch_names(&self) -> Result<Vec<String>> {
        self.query("local_branch_names".to_owned());
        Ok(self
            .state
            .borrow()
            .refs
            .keys()
            .filter_map(|name| name.strip_prefix("refs/heads/"))
            .map(ToOwned::to_owned)
            .collect())
    }

    fn remote_names(&self) -> Result<Vec<String>> {
        self.query("remote_names".to_owned());
        Ok(self
            .state
            .borrow()
            .config
            .keys()
            .filter_map(|key| key.strip_prefix("remote.")?.strip_suffix(".url"))
            .map(ToOwned::to_owned)
            .collect())
    }

    fn commits_only_in(&self, from: &ReferenceName, excluding: &ReferenceName) -> Result<usize> {
        self.query(format!("commits_only_in {from} {excluding}"));
        let key = (from.as_str().to_owned(), excluding.as_str().to_owned());
        Ok(self
            .state
            .borrow()
            .commits_only_in
            .get(&key)
            .copied()
            .unwrap_or_default())
    }

    fn has_multi_parent_commit(
        &self,
        from: &ReferenceName,
        excluding: &ReferenceName,
    ) -> Result<bool> {
        self.query(format!("has_multi_parent_commit {from} {excluding}"));
        let key = (from.as_str().to_owned(), excluding.as_str().to_owned());
        Ok(self
            .state
            .borrow()
            .merge_commits
            .get(&key)
            .copied()
            .unwrap_or_default())
    }

    fn fetch(&self, remote: &str, refspec: Option<&str>) -> Result<()> {
        match refspec {
            Some(refspec) => self.mutate(format!("fetch {remote} {refspec}")),
            None => self.mutate(format!("fetch {remote}")),
        }
        Ok(())
    }

    /// The fake has no separate remote; a branch exists there if its
    /// remote-tracking ref does.
    fn remote_has_branch(&self, remote: &str, branch_name: &str) -> Result<bool> {
        self.query(format!("remote_has_branch {remote} {branch_name}"));
        Ok(self
            .state
            .borrow()
            .refs
            .contains_key(&format!("refs/remotes/{remote}/{branch_name}")))
    }

    fn merge_fast_forward_only(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
        let ahead_count = {
            let state = self.state.borrow();
            match &state.current_branch {
                Some(branch_name) => state
                    .commits_only_in
                    .get(&(format!("refs/heads/{branch_name}"), target.as_str().to_owned()))
                    .copied()
                    .unwrap_or_default(),
                None => 0,
            }
        };
        if ahead_count > 0 {
            return Ok(UpdateOutcome::NotFastForward);
        }
        self.mutate(format!("merge_fast_forward_only {target}"));
        self.apply_update(target);
        Ok(UpdateOutcome::Updated)
    }

    fn merge(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
        self.mutate(format!("merge {target}"));
        let outcome = self.state.borrow().update_outcome;
        if outcome == UpdateOutcome::Updated {
            self.apply_update(target);
        }
        Ok(outcome)
    }

    fn rebase(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
        self.mutate(format!("rebase {target}"));
        let outcome = self.state.borrow().update_outcome;
        if outcome == UpdateOutcome::Updated {
            self.apply_update(target);
        }
        Ok(outcome)
    }

    fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<()> {
        let local = format!("refs/heads/{name}");
        if self.state.borrow().refs.contains_key(&local) {
            return Err(fake_failure(format!("git branch {name}")));
        }
        match start_point {
            Some(start_point) => self.mutate(format!("create_branch {name} {start_point}")),
            None => self.mutate(format!("create_branch {name}")),
        }

        let mut state = self.state.borrow_mut();
        let oid = match start_point {
            Some(start_point) => Self::resolve_start_point(&state, start_point),
            None => Self::head_oid(&state),
        };
        let oid = match oid {
            Some(oid) => oid,
            None => FAKE_DEFAULT_OID
                .parse()
                .expect("Default fake OID should be valid"),
        };
        state.refs.insert(local, oid);
        Ok(())
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        if force {
            self.mutate(format!("delete_branch {name} force"));
        } else {
            self.mutate(format!("delete_branch {name}"));
        }
        let mut state = self.state.borrow_mut();
        if state.refs.remove(&format!("refs/heads/{name}")).is_none() {
            return Err(fake_failure(format!("git branch -D {name}")));
        }
        // Git drops the branch's configuration section along with it.
        let prefix = format!("branch.{name}.");
        state.config.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        self.mutate(format!("checkout {name}"));
        let mut state = self.state.borrow_mut();
        if !state.refs.contains_key(&format!("refs/heads/{name}")) {
            return Err(fake_failure(format!("git checkout {name}")));
        }
        state.current_branch = Some(name.to_owned());
        Ok(())
    }

    fn checkout_detached(&self, target: &str) -> Result<()> {
        self.mutate(format!("checkout_detached {target}"));
        let mut state = self.state.borrow_mut();
        let oid = Self::resolve_start_point(&state, target)
            .or_else(|| target.parse().ok())
            .ok_or_else(|| fake_failure(format!("git checkout --detach {target}")))?;
        state.refs.insert("HEAD".to_owned(), oid);
        state.current_branch = None;
        Ok(())
    }

    fn create_marker_commit(&self, branch_name: &str, _message: &str) -> Result<NonZeroOid> {
        self.mutate(format!("create_marker_commit {branch_name}"));
        let mut state = self.state.borrow_mut();
        let oid = Self::mint_oid(&mut state);
        state.refs.insert(format!("refs/heads/{branch_name}"), oid);
        Ok(oid)
    }

    fn stash_save(&self, label: &str) -> Result<StashOutcome> {
        if !self.state.borrow().has_uncommitted_changes {
            return Ok(StashOutcome::NothingToStash);
        }
        self.mutate(format!("stash_save {label}"));
        let mut state = self.state.borrow_mut();
        state.has_uncommitted_changes = false;
        state.stash_depth += 1;
        Ok(StashOutcome::Saved)
    }

    fn stash_pop(&self) -> Result<()> {
        self.mutate("stash_pop".to_owned());
        let mut state = self.state.borrow_mut();
        if state.stash_depth == 0 {
            return Err(fake_failure("git stash pop".to_owned()));
        }
        state.stash_depth -= 1;
        state.has_uncommitted_changes = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_tracking_rolls_back_on_failure() -> eyre::Result<()> {
        struct FailingMergeWrite(FakeVcs);

        // Delegate everything except writes of the `merge` key.
        impl Vcs for FailingMergeWrite {
            fn current_branch(&self) -> Result<Option<String>> {
                self.0.current_branch()
            }
            fn get_config(&self, key: &str) -> Result<Option<String>> {
                self.0.get_config(key)
            }
            fn set_config(&self, key: &str, value: &str) -> Result<()> {
                if key.ends_with(".merge") {
                    return Err(fake_failure(format!("git config {key} {value}")));
                }
                self.0.set_config(key, value)
            }
            fn unset_config(&self, key: &str) -> Result<()> {
                self.0.unset_config(key)
            }
            fn ref_exists(&self, reference: &ReferenceName) -> Result<bool> {
                self.0.ref_exists(reference)
            }
            fn ref_target(&self, reference: &ReferenceName) -> Result<Option<NonZeroOid>> {
                self.0.ref_target(reference)
            }
            fn local_branch_names(&self) -> Result<Vec<String>> {
                self.0.local_branch_names()
            }
            fn remote_names(&self) -> Result<Vec<String>> {
                self.0.remote_names()
            }
            fn commits_only_in(
                &self,
                from: &ReferenceName,
                excluding: &ReferenceName,
            ) -> Result<usize> {
                self.0.commits_only_in(from, excluding)
            }
            fn has_multi_parent_commit(
                &self,
                from: &ReferenceName,
                excluding: &ReferenceName,
            ) -> Result<bool> {
                self.0.has_multi_parent_commit(from, excluding)
            }
            fn fetch(&self, remote: &str, refspec: Option<&str>) -> Result<()> {
                self.0.fetch(remote, refspec)
            }
            fn remote_has_branch(&self, remote: &str, branch_name: &str) -> Result<bool> {
                self.0.remote_has_branch(remote, branch_name)
            }
            fn merge_fast_forward_only(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
                self.0.merge_fast_forward_only(target)
            }
            fn merge(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
                self.0.merge(target)
            }
            fn rebase(&self, target: &ReferenceName) -> Result<UpdateOutcome> {
                self.0.rebase(target)
            }
            fn create_branch(&self, name: &str, start_point: Option<&str>) -> Result<()> {
                self.0.create_branch(name, start_point)
            }
            fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
                self.0.delete_branch(name, force)
            }
            fn checkout(&self, name: &str) -> Result<()> {
                self.0.checkout(name)
            }
            fn checkout_detached(&self, target: &str) -> Result<()> {
                self.0.checkout_detached(target)
            }
            fn create_marker_commit(&self, branch_name: &str, message: &str) -> Result<NonZeroOid> {
                self.0.create_marker_commit(branch_name, message)
            }
            fn stash_save(&self, label: &str) -> Result<StashOutcome> {
                self.0.stash_save(label)
            }
            fn stash_pop(&self) -> Result<()> {
                self.0.stash_pop()
            }
        }

        let vcs = FailingMergeWrite(FakeVcs::new("master"));
        let result = vcs.set_tracking("feature", "origin", &"refs/heads/feature".into());
        assert!(matches!(result, Err(Error::SubprocessFailed { .. })));
        assert_eq!(vcs.get_config("branch.feature.remote")?, None);
        assert_eq!(
            vcs.0.mutations(),
            vec![
                "set_config branch.feature.remote origin".to_owned(),
                "unset_config branch.feature.remote".to_owned(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_fake_update_clears_behind_count() -> eyre::Result<()> {
        let vcs = FakeVcs::new("master");
        vcs.add_ref("refs/heads/master");
        vcs.add_ref_at(
            "refs/remotes/origin/master",
            "2222222222222222222222222222222222222222",
        );
        vcs.set_commits_only_in("refs/remotes/origin/master", "refs/heads/master", 3);

        let target = ReferenceName::from("refs/remotes/origin/master");
        assert_eq!(vcs.merge_fast_forward_only(&target)?, UpdateOutcome::Updated);
        assert_eq!(vcs.commits_only_in(&target, &"refs/heads/master".into())?, 0);
        assert_eq!(
            vcs.ref_target(&"refs/heads/master".into())?,
            vcs.ref_target(&target)?
        );
        Ok(())
    }

    #[test]
    fn test_path_for_env_without_tracking_binary() -> eyre::Result<()> {
        let git = make_git()?;
        let path = git.get_path_for_env();
        let entries = std::env::split_paths(&path).collect_vec();
        assert_eq!(entries.last(), Some(&git.git_exec_path));
        assert!(entries.len() <= 2, "PATH was: {entries:?}");

        git.init_repo()?;
        let (stdout, _stderr) = git.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        assert_eq!(stdout, "master\n");
        Ok(())
    }
}
