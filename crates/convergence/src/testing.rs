//! In-memory collaborators for provider tests.
//!
//! [`FakeShell`] answers commands from a script keyed by the rendered
//! command line and records every invocation. [`FakeFileSystem`] keeps files,
//! directories and symlinks in a map and records every mutation.

use crate::context::{FileSystem, Shell};
use crate::error::{Error, Result};
use crate::types::{CommandOutput, ShellCommand};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded shell invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCall {
    pub command: String,
    pub stdin: Option<String>,
}

/// Scripted shell.
///
/// Unscripted commands succeed with empty output. A command line scripted
/// several times answers in order, repeating the last answer.
#[derive(Debug, Default)]
pub struct FakeShell {
    script: Mutex<BTreeMap<String, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<ShellCall>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `output` for the exact command line `command`.
    #[must_use]
    pub fn respond(self, command: &str, output: CommandOutput) -> Self {
        lock(&self.script)
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    #[must_use]
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        self.respond(command, CommandOutput::ok(stdout))
    }

    #[must_use]
    pub fn with_failure(self, command: &str, status: i32, stderr: &str) -> Self {
        self.respond(command, CommandOutput::failed(status, stderr))
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).iter().map(|c| c.command.clone()).collect()
    }

    /// Calls with their stdin.
    pub fn invocations(&self) -> Vec<ShellCall> {
        lock(&self.calls).clone()
    }

    /// Calls whose command line starts with `prefix`.
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

impl Shell for FakeShell {
    fn run(&self, command: &ShellCommand) -> Result<CommandOutput> {
        let line = command.to_string();
        lock(&self.calls).push(ShellCall {
            command: line.clone(),
            stdin: command.stdin.clone(),
        });
        let mut script = lock(&self.script);
        let output = match script.get_mut(&line) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(output.unwrap_or_else(|| CommandOutput::ok("")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File(String),
    Dir,
    Symlink(PathBuf),
}

/// A filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsWrite {
    Write(PathBuf),
    Remove(PathBuf),
}

/// In-memory filesystem.
#[derive(Debug, Default)]
pub struct FakeFileSystem {
    entries: Mutex<BTreeMap<PathBuf, Entry>>,
    writes: Mutex<Vec<FsWrite>>,
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

fn not_found(path: &Path) -> Error {
    Error::io(path, io::Error::from(io::ErrorKind::NotFound))
}

impl FakeFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, path: &Path, entry: Entry) {
        let path = normalize(path);
        let mut entries = lock(&self.entries);
        let mut parent = path.parent();
        while let Some(dir) = parent {
            entries.entry(dir.to_path_buf()).or_insert(Entry::Dir);
            parent = dir.parent();
        }
        entries.insert(path, entry);
    }

    /// Add a file, creating its parent directories.
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        self.insert(path.as_ref(), Entry::File(contents.to_string()));
        self
    }

    #[must_use]
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Entry::Dir);
        self
    }

    #[must_use]
    pub fn with_symlink(self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Entry::Symlink(normalize(target.as_ref())));
        self
    }

    /// Current contents of a file, following symlinks.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let resolved = self.resolve(path.as_ref()).ok()?;
        let entries = lock(&self.entries);
        match entries.get(&resolved) {
            Some(Entry::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    /// Every mutation performed through the [`FileSystem`] trait.
    pub fn writes(&self) -> Vec<FsWrite> {
        lock(&self.writes).clone()
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let entries = lock(&self.entries);
        let mut resolved = PathBuf::from("/");
        let mut hops = 0;
        for component in normalize(path).components() {
            let Component::Normal(part) = component else {
                continue;
            };
            resolved.push(part);
            while let Some(Entry::Symlink(target)) = entries.get(&resolved) {
                hops += 1;
                if hops > 40 {
                    return Err(Error::io(
                        path,
                        io::Error::other("too many levels of symbolic links"),
                    ));
                }
                resolved.clone_from(target);
            }
        }
        Ok(resolved)
    }

    fn entry(&self, path: &Path) -> Option<Entry> {
        let resolved = self.resolve(path).ok()?;
        if resolved == Path::new("/") {
            return Some(Entry::Dir);
        }
        lock(&self.entries).get(&resolved).cloned()
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.entry(path) {
            Some(Entry::File(contents)) => Ok(contents),
            Some(_) => Err(Error::io(path, io::Error::other("is a directory"))),
            None => Err(not_found(path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(Entry::Dir))
    }

    fn realpath(&self, path: &Path) -> Result<PathBuf> {
        let resolved = self.resolve(path)?;
        if self.entry(&resolved).is_none() {
            return Err(not_found(path));
        }
        Ok(resolved)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let resolved = self.resolve(path)?;
        let parent_ok = resolved
            .parent()
            .is_none_or(|p| matches!(self.entry(p), Some(Entry::Dir)));
        if !parent_ok {
            return Err(not_found(path));
        }
        if matches!(self.entry(&resolved), Some(Entry::Dir)) {
            return Err(Error::io(path, io::Error::other("is a directory")));
        }
        lock(&self.entries).insert(resolved.clone(), Entry::File(contents.to_string()));
        lock(&self.writes).push(FsWrite::Write(resolved));
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let key = normalize(path);
        if lock(&self.entries).remove(&key).is_none() {
            return Err(not_found(path));
        }
        lock(&self.writes).push(FsWrite::Remove(key));
        Ok(())
    }
}
