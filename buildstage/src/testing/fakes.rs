//! In-memory and recording implementations of every port.

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::observability::StageLogger;
use crate::ports::{
    split_patterns, CommandOutput, CommandRunner, CommandSpec, Compiler, FileAccess,
    PublishedRelease, ReleasePublisher, ReleaseRequest, ScssOptions,
};
use crate::recovery::{error_name, ErrorHandler, HandledError, TryOptions};

const GLOB_OPTIONS: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// [`FileAccess`] over an in-memory tree.
///
/// Directories exist implicitly above every file, or explicitly through
/// [`FileAccess::create_dir_all`].
#[derive(Debug)]
pub struct MemoryFileAccess {
    root: PathBuf,
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
}

impl Default for MemoryFileAccess {
    fn default() -> Self {
        Self::new("/project")
    }
}

impl MemoryFileAccess {
    /// Creates an empty tree rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
        }
    }

    /// Adds a file (builder form).
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Adds or replaces a file.
    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let path = self.resolve(path.as_ref());
        self.files.lock().insert(path, contents.into().into_bytes());
    }

    /// Contents of a file as UTF-8, if present.
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = self.resolve(path.as_ref());
        self.files
            .lock()
            .get(&path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Every file path, relative to the root, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().map(|p| self.relative(p)).collect()
    }

    fn dir_exists(&self, dir: &Path) -> bool {
        self.dirs.lock().contains(dir)
            || self
                .files
                .lock()
                .keys()
                .any(|f| f.starts_with(dir) && f != dir)
    }
}

#[async_trait]
impl FileAccess for MemoryFileAccess {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn exists(&self, path: &Path) -> bool {
        self.is_file(path).await || self.is_dir(path).await
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.files.lock().contains_key(&self.resolve(path))
    }

    async fn is_dir(&self, path: &Path) -> bool {
        self.dir_exists(&self.resolve(path))
    }

    async fn glob(&self, patterns: &[String]) -> Result<Vec<PathBuf>> {
        let (includes, excludes) = split_patterns(patterns)?;
        let includes = includes
            .into_iter()
            .map(|p| glob::Pattern::new(p).with_context(|| format!("invalid glob `{p}`")))
            .collect::<Result<Vec<_>>>()?;
        let files = self.files.lock();
        Ok(files
            .keys()
            .filter(|path| {
                let rel = self.relative(path);
                includes.iter().any(|p| p.matches_path_with(&rel, GLOB_OPTIONS))
                    && !excludes.iter().any(|p| p.matches_path_with(&rel, GLOB_OPTIONS))
            })
            .cloned()
            .collect())
    }

    async fn read(&self, path: &Path) -> Result<String> {
        let bytes = self.read_bytes(path).await?;
        String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))
    }

    async fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        match self.files.lock().get(&full) {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("reading {}: no such file", full.display()),
        }
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.insert(path, contents);
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let bytes = self.read_bytes(from).await?;
        self.files.lock().insert(self.resolve(to), bytes);
        Ok(())
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> Result<usize> {
        let (from, to) = (self.resolve(from), self.resolve(to));
        if !self.dir_exists(&from) {
            bail!("reading {}: no such directory", from.display());
        }
        let mut files = self.files.lock();
        let copies: Vec<(PathBuf, Vec<u8>)> = files
            .iter()
            .filter_map(|(path, bytes)| {
                path.strip_prefix(&from)
                    .ok()
                    .map(|rel| (to.join(rel), bytes.clone()))
            })
            .collect();
        let count = copies.len();
        files.extend(copies);
        drop(files);
        self.dirs.lock().insert(to);
        Ok(count)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let full = self.resolve(path);
        self.files.lock().retain(|p, _| !p.starts_with(&full));
        self.dirs.lock().retain(|d| !d.starts_with(&full));
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.dirs.lock().insert(self.resolve(path));
        Ok(())
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let dir = self.resolve(path);
        let mut children = BTreeSet::new();
        let dirs = self.dirs.lock();
        let files = self.files.lock();
        for entry in files.keys().chain(dirs.iter()) {
            if let Ok(rest) = entry.strip_prefix(&dir) {
                if let Some(first) = rest.components().next() {
                    children.insert(dir.join(first));
                }
            }
        }
        Ok(children.into_iter().collect())
    }
}

/// [`CommandRunner`] that records every command and succeeds unless told
/// otherwise.
#[derive(Debug, Default)]
pub struct RecordingCommandRunner {
    commands: Mutex<Vec<CommandSpec>>,
    failures: Mutex<BTreeSet<String>>,
    outputs: Mutex<BTreeMap<String, CommandOutput>>,
}

impl RecordingCommandRunner {
    /// Creates a runner that succeeds for every command.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every command whose display starts with `prefix` fail.
    pub fn fail_on(&self, prefix: impl Into<String>) {
        self.failures.lock().insert(prefix.into());
    }

    /// Returns `output` for commands whose display starts with `prefix`.
    pub fn respond(&self, prefix: impl Into<String>, output: CommandOutput) {
        self.outputs.lock().insert(prefix.into(), output);
    }

    /// Commands run so far.
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands.lock().clone()
    }

    /// Display strings of the commands run so far.
    #[must_use]
    pub fn displays(&self) -> Vec<String> {
        self.commands.lock().iter().map(CommandSpec::display).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingCommandRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.commands.lock().push(command.clone());
        let display = command.display();
        if self.failures.lock().iter().any(|p| display.starts_with(p.as_str())) {
            return Err(crate::errors::BuildstageError::Command {
                command: display,
                status: "exit status: 1".to_string(),
                stderr: "scripted failure".to_string(),
            }
            .into());
        }
        let outputs = self.outputs.lock();
        Ok(outputs
            .iter()
            .find(|(prefix, _)| display.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }
}

/// [`Compiler`] that records calls as short strings.
///
/// Calls look like `scss src/a.scss -> dist/a.css`, `ts tsconfig.json`,
/// `prettify dist/a.js dist/b.css` and `minimize dist/a.js -> dist/a.min.js`,
/// with paths relative to `root`.
#[derive(Debug)]
pub struct RecordingCompiler {
    root: PathBuf,
    calls: Mutex<Vec<String>>,
    failing: Mutex<BTreeSet<String>>,
}

impl Default for RecordingCompiler {
    fn default() -> Self {
        Self::new("/project")
    }
}

impl RecordingCompiler {
    /// Creates a compiler reporting paths relative to `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(BTreeSet::new()),
        }
    }

    /// Makes the operation (`scss`, `ts`, `prettify`, `minimize`) fail.
    pub fn fail_on(&self, operation: impl Into<String>) {
        self.failing.lock().insert(operation.into());
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn record(&self, operation: &str, call: String) -> Result<()> {
        self.calls.lock().push(call);
        if self.failing.lock().contains(operation) {
            bail!("{operation} failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Compiler for RecordingCompiler {
    async fn compile_scss(&self, input: &Path, output: &Path, _options: &ScssOptions) -> Result<()> {
        self.record("scss", format!("scss {} -> {}", self.rel(input), self.rel(output)))
    }

    async fn compile_ts(&self, project: &Path, out_dir: Option<&Path>) -> Result<()> {
        let call = match out_dir {
            Some(dir) => format!("ts {} -> {}", self.rel(project), self.rel(dir)),
            None => format!("ts {}", self.rel(project)),
        };
        self.record("ts", call)
    }

    async fn prettify(&self, files: &[PathBuf]) -> Result<()> {
        let names: Vec<String> = files.iter().map(|f| self.rel(f)).collect();
        self.record("prettify", format!("prettify {}", names.join(" ")))
    }

    async fn minimize(&self, input: &Path, output: &Path) -> Result<()> {
        self.record("minimize", format!("minimize {} -> {}", self.rel(input), self.rel(output)))
    }
}

/// [`ReleasePublisher`] that records requests.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    requests: Mutex<Vec<ReleaseRequest>>,
}

impl RecordingPublisher {
    /// Creates an empty publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ReleaseRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ReleasePublisher for RecordingPublisher {
    async fn publish(&self, request: &ReleaseRequest) -> Result<PublishedRelease> {
        let mut requests = self.requests.lock();
        requests.push(request.clone());
        Ok(PublishedRelease {
            id: requests.len() as u64,
            url: format!(
                "https://example.invalid/{}/releases/{}",
                request.repository, request.tag
            ),
        })
    }
}

/// One call to [`RecordingErrorHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledCall {
    /// Stage of the logger passed in.
    pub stage: String,
    /// Error message.
    pub message: String,
    /// Level passed in.
    pub level: usize,
    /// Whether the caller asked for a fatal outcome.
    pub exit_process: bool,
}

/// [`ErrorHandler`] that records errors and never writes files.
#[derive(Debug, Default)]
pub struct RecordingErrorHandler {
    calls: Mutex<Vec<HandledCall>>,
}

impl RecordingErrorHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<HandledCall> {
        self.calls.lock().clone()
    }
}

impl ErrorHandler for RecordingErrorHandler {
    fn handle(
        &self,
        error: &anyhow::Error,
        level: usize,
        logger: &StageLogger,
        options: &TryOptions,
    ) -> HandledError {
        self.calls.lock().push(HandledCall {
            stage: logger.stage().to_string(),
            message: error.to_string(),
            level,
            exit_process: options.exit_process,
        });
        HandledError {
            name: error_name(error),
            message: error.to_string(),
            report: format!("{error:#}"),
            log_file: None,
        }
    }
}
