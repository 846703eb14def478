//! Scoped cleanup of transient files and directories.
//!
//! Everything a run creates on disk is registered with a [`ResourceJanitor`].
//! Cleanup runs when [`ResourceJanitor::cleanup`] is called or, failing that,
//! when the janitor is dropped, so an early return or a panic still removes
//! the files. Removing something that is already gone is not an error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A single thing cleanup could not do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupIssue {
    RemoveFile { path: PathBuf, error: String },
    RemoveDir { path: PathBuf, error: String },
    ScanDir { path: PathBuf, error: String },
}

impl std::fmt::Display for CleanupIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoveFile { path, error } => {
                write!(f, "cannot remove file {}: {error}", path.display())
            }
            Self::RemoveDir { path, error } => {
                write!(f, "cannot remove directory {}: {error}", path.display())
            }
            Self::ScanDir { path, error } => {
                write!(f, "cannot scan {}: {error}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
    pub issues: Vec<CleanupIssue>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone)]
struct SweepRule {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

#[derive(Debug, Default)]
pub struct ResourceJanitor {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    sweeps: Vec<SweepRule>,
    cleaned: bool,
}

impl ResourceJanitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete `path` at cleanup.
    pub fn track_file(&mut self, path: impl Into<PathBuf>) {
        self.files.push(path.into());
        self.cleaned = false;
    }

    /// Delete `path` and its contents at cleanup.
    pub fn track_dir(&mut self, path: impl Into<PathBuf>) {
        self.dirs.push(path.into());
        self.cleaned = false;
    }

    /// At cleanup, delete files directly inside `dir` named
    /// `<prefix>*.<extension>`, including strays from earlier runs.
    pub fn sweep_dir(&mut self, dir: impl Into<PathBuf>, prefix: &str, extension: &str) {
        self.sweeps.push(SweepRule {
            dir: dir.into(),
            prefix: prefix.to_string(),
            extension: extension.to_string(),
        });
        self.cleaned = false;
    }

    /// Remove everything registered. Safe to call repeatedly.
    pub fn cleanup(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();

        for path in &self.files {
            remove_file(path, &mut report);
        }
        for rule in &self.sweeps {
            sweep(rule, &mut report);
        }
        for dir in &self.dirs {
            match std::fs::remove_dir_all(dir) {
                Ok(()) => report.dirs_removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => report.issues.push(CleanupIssue::RemoveDir {
                    path: dir.clone(),
                    error: e.to_string(),
                }),
            }
        }

        for issue in &report.issues {
            tracing::warn!(%issue, "Cleanup incomplete");
        }
        tracing::debug!(
            files = report.files_removed,
            dirs = report.dirs_removed,
            issues = report.issues.len(),
            "Cleanup finished"
        );

        self.cleaned = true;
        report
    }
}

impl Drop for ResourceJanitor {
    fn drop(&mut self) {
        if !self.cleaned {
            self.cleanup();
        }
    }
}

fn remove_file(path: &Path, report: &mut CleanupReport) {
    match std::fs::remove_file(path) {
        Ok(()) => report.files_removed += 1,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => report.issues.push(CleanupIssue::RemoveFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        }),
    }
}

fn sweep(rule: &SweepRule, report: &mut CleanupReport) {
    let entries = match std::fs::read_dir(&rule.dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return,
        Err(e) => {
            report.issues.push(CleanupIssue::ScanDir {
                path: rule.dir.clone(),
                error: e.to_string(),
            });
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && matches_rule(&path, rule) {
            remove_file(&path, report);
        }
    }
}

fn matches_rule(path: &Path, rule: &SweepRule) -> bool {
    let name_ok = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(&rule.prefix))
        .unwrap_or(false);
    let ext_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(&rule.extension))
        .unwrap_or(false);
    name_ok && ext_ok
}
