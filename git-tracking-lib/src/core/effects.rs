//! Wrappers around various side effects.

use std::fmt::{Display, Write};
use std::io::{self, stderr, stdout, Write as WriteIo};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bstr::ByteSlice;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use tracing::warn;

use crate::core::formatting::Glyphs;

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationType {
    AnalyzeRelationship(Arc<String>),
    FetchRemotes,
    ProvisionTracking(Arc<String>),
    ReportBranches,
    RunGitCommand(Arc<String>),
    SyncBranch(Arc<String>),
}

impl Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::AnalyzeRelationship(branch_name) => {
                write!(f, "Comparing {branch_name} with its upstream")
            }
            OperationType::FetchRemotes => write!(f, "Fetching remotes"),
            OperationType::ProvisionTracking(branch_name) => {
                write!(f, "Setting up tracking for {branch_name}")
            }
            OperationType::ReportBranches => write!(f, "Examining local branches"),
            OperationType::RunGitCommand(command) => {
                write!(f, "Running Git command: {}", &command)
            }
            OperationType::SyncBranch(branch_name) => write!(f, "Syncing {branch_name}"),
        }
    }
}

#[derive(Clone, Debug)]
enum OutputDest {
    Stdout,
    Suppress,
    BufferForTest {
        stdout: Arc<Mutex<Vec<u8>>>,
        stderr: Arc<Mutex<Vec<u8>>>,
    },
}

/// A spinner which is currently being displayed for an in-progress operation.
#[derive(Debug)]
struct ActiveOperation {
    operation_key: Vec<OperationType>,
    progress_bar: ProgressBar,
}

/// Wrapper around side-effectful operations, such as output and progress
/// indicators.
#[derive(Clone)]
pub struct Effects {
    glyphs: Glyphs,
    dest: OutputDest,
    operation_key: Vec<OperationType>,
    active_operations: Arc<Mutex<Vec<ActiveOperation>>>,
}

impl std::fmt::Debug for Effects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<Output fancy={}>",
            self.glyphs.should_write_ansi_escape_codes
        )
    }
}

impl Effects {
    /// Constructor. Writes to stdout.
    pub fn new(glyphs: Glyphs) -> Self {
        Effects {
            glyphs,
            dest: OutputDest::Stdout,
            operation_key: Default::default(),
            active_operations: Default::default(),
        }
    }

    /// Constructor. Suppresses all output.
    pub fn new_suppress_for_test(glyphs: Glyphs) -> Self {
        Effects {
            glyphs,
            dest: OutputDest::Suppress,
            operation_key: Default::default(),
            active_operations: Default::default(),
        }
    }

    /// Constructor. Writes to the provided buffer.
    pub fn new_from_buffer_for_test(
        glyphs: Glyphs,
        stdout: &Arc<Mutex<Vec<u8>>>,
        stderr: &Arc<Mutex<Vec<u8>>>,
    ) -> Self {
        Effects {
            glyphs,
            dest: OutputDest::BufferForTest {
                stdout: Arc::clone(stdout),
                stderr: Arc::clone(stderr),
            },
            operation_key: Default::default(),
            active_operations: Default::default(),
        }
    }

    /// Suppress output sent to the returned `Effects`.
    pub fn suppress(&self) -> Self {
        Self {
            dest: OutputDest::Suppress,
            ..self.clone()
        }
    }

    /// Start reporting progress for the specified operation type.
    ///
    /// A progress spinner is shown on an attended terminal until the returned
    /// `ProgressHandle` is dropped. Operations started while another
    /// `ProgressHandle` is alive are nested under it.
    pub fn start_operation(&self, operation_type: OperationType) -> (Effects, ProgressHandle<'_>) {
        let operation_key = {
            let mut result = self.operation_key.clone();
            result.push(operation_type.clone());
            result
        };
        let progress = ProgressHandle {
            effects: self,
            operation_key: operation_key.clone(),
        };
        match self.dest {
            OutputDest::Stdout => {}
            OutputDest::Suppress | OutputDest::BufferForTest { .. } => {
                return (self.clone(), progress)
            }
        }

        if console::user_attended_stderr() {
            let progress_bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            progress_bar.set_style(
                ProgressStyle::with_template("{spinner} {prefix}{msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            progress_bar.set_prefix("  ".repeat(self.operation_key.len()));
            progress_bar.set_message(operation_type.to_string());
            progress_bar.enable_steady_tick(Duration::from_millis(100));
            let mut active_operations = self.active_operations.lock().unwrap();
            active_operations.push(ActiveOperation {
                operation_key: operation_key.clone(),
                progress_bar,
            });
        }

        let effects = Self {
            operation_key,
            ..self.clone()
        };
        (effects, progress)
    }

    fn on_drop_progress_handle(&self, operation_key: &[OperationType]) {
        match self.dest {
            OutputDest::Stdout => {}
            OutputDest::Suppress | OutputDest::BufferForTest { .. } => return,
        }

        let mut active_operations = self.active_operations.lock().unwrap();
        match active_operations
            .iter()
            .rposition(|operation| operation.operation_key == operation_key)
        {
            Some(index) => {
                let operation = active_operations.remove(index);
                operation.progress_bar.finish_and_clear();
            }
            None if console::user_attended_stderr() => {
                drop(active_operations); // Avoid potential deadlock.
                warn!(?operation_key, "Progress operation not started");
            }
            None => {}
        }
    }

    /// Get the set of glyphs associated with the output.
    pub fn get_glyphs(&self) -> &Glyphs {
        &self.glyphs
    }

    /// Create a stream that can be written to. The output might go to stdout or
    /// be rendered specially in the terminal.
    pub fn get_output_stream(&self) -> OutputStream {
        OutputStream {
            dest: self.dest.clone(),
            active_operations: Arc::clone(&self.active_operations),
        }
    }

    /// Create a stream that error output can be written to, rather than regular
    /// output.
    pub fn get_error_stream(&self) -> ErrorStream {
        ErrorStream {
            dest: self.dest.clone(),
            active_operations: Arc::clone(&self.active_operations),
        }
    }
}

/// Write `contents` to the real terminal stream, hiding any spinners while
/// doing so, so that output isn't interleaved with progress rendering.
fn write_above_progress(
    active_operations: &Arc<Mutex<Vec<ActiveOperation>>>,
    mut stream: impl WriteIo,
    contents: &[u8],
) -> io::Result<()> {
    let active_operations = active_operations.lock().unwrap();
    let progress_bars = active_operations
        .iter()
        .map(|operation| &operation.progress_bar)
        .collect_vec();
    match progress_bars.last() {
        None => {
            stream.write_all(contents)?;
            stream.flush()
        }
        Some(progress_bar) => progress_bar.suspend(|| {
            stream.write_all(contents)?;
            stream.flush()
        }),
    }
}

/// A handle to stdout, but doesn't overwrite interactive progress notifications.
pub struct OutputStream {
    dest: OutputDest,
    active_operations: Arc<Mutex<Vec<ActiveOperation>>>,
}

impl Write for OutputStream {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        match &self.dest {
            OutputDest::Stdout => {
                write_above_progress(&self.active_operations, stdout(), s.as_bytes())
                    .map_err(|_| std::fmt::Error)?;
            }

            OutputDest::Suppress => {
                // Do nothing.
            }

            OutputDest::BufferForTest { stdout, stderr: _ } => {
                let mut buffer = stdout.lock().unwrap();
                buffer.extend_from_slice(s.as_bytes());
            }
        }
        Ok(())
    }
}

/// A handle to stderr, but doesn't overwrite interactive progress notifications.
pub struct ErrorStream {
    dest: OutputDest,
    active_operations: Arc<Mutex<Vec<ActiveOperation>>>,
}

impl Write for ErrorStream {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        io::Write::write_all(self, s.as_bytes()).map_err(|_| std::fmt::Error)
    }
}

/// You probably don't want this. This implementation is only for `tracing`'s `fmt_layer`, because
/// it needs a writer of type `io::Write`, but `Effects` normally uses its implementation of
/// `fmt::Write`.
impl io::Write for ErrorStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.dest {
            OutputDest::Stdout => {
                let contents = buf.to_str_lossy();
                write_above_progress(&self.active_operations, stderr(), contents.as_bytes())?;
                Ok(buf.len())
            }
            OutputDest::Suppress => {
                // Do nothing.
                Ok(buf.len())
            }
            OutputDest::BufferForTest { stdout: _, stderr } => {
                let mut buffer = stderr.lock().unwrap();
                buffer.write(buf)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.dest {
            OutputDest::Stdout => stderr().flush(),
            OutputDest::Suppress | OutputDest::BufferForTest { .. } => Ok(()),
        }
    }
}

/// A handle to an operation in progress. This object should be kept live while
/// the operation is underway.
#[derive(Debug)]
pub struct ProgressHandle<'a> {
    effects: &'a Effects,
    operation_key: Vec<OperationType>,
}

impl Drop for ProgressHandle<'_> {
    fn drop(&mut self) {
        self.effects.on_drop_progress_handle(&self.operation_key)
    }
}
