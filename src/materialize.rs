use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::GitConfig;
use crate::error::FetchError;

/// Transport that populates a destination directory with a repository.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, identifier: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Clones with the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitFetcher {
    shallow: bool,
    branch: Option<String>,
}

impl GitFetcher {
    pub fn from_config(config: &GitConfig) -> Self {
        let branch = Some(config.branch.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        Self {
            shallow: config.shallow,
            branch,
        }
    }
}

impl Fetcher for GitFetcher {
    fn fetch(&self, identifier: &str, dest: &Path) -> Result<(), FetchError> {
        let mut cmd = Command::new("git");
        cmd.arg("clone");
        if let Some(branch) = &self.branch {
            cmd.args(["--branch", branch, "--single-branch"]);
        }
        if self.shallow {
            cmd.args(["--depth", "1"]);
        }
        cmd.arg(identifier);
        cmd.arg(dest);

        let output = cmd.output().map_err(|e| {
            FetchError::transport(
                identifier,
                format!("failed to execute 'git clone' (is git installed?): {}", e),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::transport(
                identifier,
                format!("git clone failed: {}", stderr.trim()),
            ));
        }

        Ok(())
    }
}

/// Derive the local directory name for a repository identifier.
///
/// `https://github.com/pallets/flask.git` and `git@github.com:pallets/flask`
/// both map to `flask`. A `:` only separates the path in scheme-less
/// SCP-style identifiers, so URL ports are left alone.
pub fn local_dir_name(identifier: &str) -> Result<String, FetchError> {
    let trimmed = identifier.trim().trim_end_matches(['/', '\\']);
    let separators: &[char] = if trimmed.contains("://") {
        &['/', '\\']
    } else {
        &['/', '\\', ':']
    };
    let last = trimmed
        .rsplit(separators)
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." {
        return Err(FetchError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(name.to_string())
}

/// Owns the base data directory and produces fresh local copies in it.
pub struct Materializer<F: Fetcher> {
    base_dir: PathBuf,
    fetcher: F,
}

impl<F: Fetcher> Materializer<F> {
    /// Create the materializer, creating `base_dir` if it does not exist.
    pub fn new(base_dir: impl Into<PathBuf>, fetcher: F) -> Result<Self, FetchError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| FetchError::io(&base_dir, e))?;
        Ok(Self { base_dir, fetcher })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Target path for `identifier`, without touching the filesystem.
    pub fn target_path(&self, identifier: &str) -> Result<PathBuf, FetchError> {
        Ok(self.base_dir.join(local_dir_name(identifier)?))
    }

    /// Replace any existing copy of `identifier` with a freshly fetched one.
    ///
    /// On failure nothing is left at the target path.
    pub fn materialize(&self, identifier: &str) -> Result<PathBuf, FetchError> {
        if identifier.trim().is_empty() {
            return Err(FetchError::InvalidIdentifier(identifier.to_string()));
        }
        let target = self.target_path(identifier)?;

        if target.exists() {
            info!(path = %target.display(), "existing copy found, deleting to refresh");
            force_remove_dir_all(&target)?;
        }

        info!(identifier, path = %target.display(), "fetching repository");
        if let Err(e) = self.fetcher.fetch(identifier, &target) {
            if target.exists() {
                if let Err(cleanup) = force_remove_dir_all(&target) {
                    warn!(path = %target.display(), error = %cleanup, "failed to clean up partial copy");
                }
            }
            return Err(e);
        }

        Ok(target)
    }
}

/// Recursively delete `path`, clearing read-only permissions that would
/// otherwise block removal.
pub fn force_remove_dir_all(path: &Path) -> Result<(), FetchError> {
    match fs::remove_dir_all(path) {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "permission denied, clearing read-only entries");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(FetchError::io(path, e)),
    }

    clear_read_only(path)?;
    fs::remove_dir_all(path).map_err(|e| FetchError::io(path, e))
}

/// Give the owner full access to every entry under `path`, symlinks excepted.
fn clear_read_only(path: &Path) -> Result<(), FetchError> {
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| {
            let at = e.path().unwrap_or(path).to_path_buf();
            FetchError::io(at, e.into())
        })?;
        if entry.path_is_symlink() {
            continue;
        }
        make_writable(entry.path())?;
    }
    Ok(())
}

fn make_writable(path: &Path) -> Result<(), FetchError> {
    let metadata = fs::metadata(path).map_err(|e| FetchError::io(path, e))?;
    let mut perms = metadata.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o700);
    }
    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
    }

    fs::set_permissions(path, perms).map_err(|e| FetchError::io(path, e))
}
