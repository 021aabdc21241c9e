//! Repository-to-context serialization.
//!
//! Walks a materialized tree, keeps files whose extension is
//! recognized, prunes ignored directories, and concatenates the survivors into
//! a [`CodeContext`] in lexical path order. Unreadable files are reported and skipped.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Component, Path};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::ContextConfig;
use crate::models::{CodeContext, FileRecord};

/// Which files make it into the context.
#[derive(Debug, Clone)]
pub struct ContextPolicy {
    extensions: HashSet<String>,
    ignored_dirs: HashSet<String>,
    exclude_set: GlobSet,
    follow_symlinks: bool,
}

impl ContextPolicy {
    pub fn from_config(config: &ContextConfig) -> Result<Self> {
        Ok(Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
            ignored_dirs: config.ignored_dirs.iter().cloned().collect(),
            exclude_set: build_globset(&config.exclude_globs)?,
            follow_symlinks: config.follow_symlinks,
        })
    }

    /// True if any component of `relative` is an ignored directory name.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        relative.components().any(|c| match c {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|n| self.ignored_dirs.contains(n)),
            _ => false,
        })
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(e))
    }

    fn is_excluded(&self, rel_str: &str) -> bool {
        self.exclude_set.is_match(rel_str)
    }
}

impl Default for ContextPolicy {
    fn default() -> Self {
        let config = ContextConfig::default();
        Self {
            extensions: config.extensions.into_iter().collect(),
            ignored_dirs: config.ignored_dirs.into_iter().collect(),
            exclude_set: GlobSet::empty(),
            follow_symlinks: config.follow_symlinks,
        }
    }
}

/// A file that qualified but could not be read.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Result of a context build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub context: CodeContext,
    pub skipped: Vec<SkippedFile>,
}

/// Serialize every qualifying file under `root` into one context document.
///
/// Output is byte-identical across builds of an unchanged tree: files are
/// ordered by their `/`-separated relative path.
pub fn build(root: &Path, policy: &ContextPolicy) -> BuildReport {
    let (records, skipped) = collect_records(root, policy);

    let context = CodeContext::from_records(&records);
    info!(
        root = %root.display(),
        files = context.file_count(),
        bytes = context.len(),
        skipped = skipped.len(),
        "context built"
    );

    BuildReport { context, skipped }
}

fn collect_records(root: &Path, policy: &ContextPolicy) -> (Vec<FileRecord>, Vec<SkippedFile>) {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let canonical_root = root.canonicalize().ok();

    let walker = WalkDir::new(root)
        .follow_links(policy.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry, root, policy));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| relative_str(p, root))
                    .unwrap_or_default();
                warn!(path = %path, error = %e, "skipping unreadable entry");
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink()
                && links_to_file_within(entry.path(), canonical_root.as_deref()));
        if !is_file || !policy.is_supported(entry.path()) {
            continue;
        }

        let rel_str = relative_str(entry.path(), root);
        if policy.is_excluded(&rel_str) {
            debug!(path = %rel_str, "excluded by glob");
            continue;
        }

        match std::fs::read(entry.path()) {
            Ok(bytes) => records.push(FileRecord {
                relative_path: rel_str,
                content: decode_text(&bytes),
            }),
            Err(e) => {
                warn!(path = %rel_str, error = %e, "skipping unreadable file");
                skipped.push(SkippedFile {
                    path: rel_str,
                    reason: e.to_string(),
                });
            }
        }
    }

    // Sort for deterministic ordering
    records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    (records, skipped)
}

/// Ignored directories are pruned so their contents are never read.
fn is_pruned(entry: &DirEntry, root: &Path, policy: &ContextPolicy) -> bool {
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    policy.is_ignored(relative)
}

fn relative_str(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A symlink that resolves to a regular file inside `root`.
fn links_to_file_within(path: &Path, root: Option<&Path>) -> bool {
    let Some(root) = root else {
        return false;
    };
    match path.canonicalize() {
        Ok(target) => target.starts_with(root) && target.is_file(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "dangling symlink");
            false
        }
    }
}

/// Decode UTF-8, dropping invalid byte sequences instead of replacing them,
/// and fold `\r\n` and lone `\r` line endings into `\n`.
fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    if out.contains('\r') {
        out = out.replace("\r\n", "\n").replace('\r', "\n");
    }
    out
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
