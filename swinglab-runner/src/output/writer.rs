//! Atomic persistence.
//!
//! A run directory is assembled in a hidden staging sibling, every file is
//! fsync'd, and the staging directory is renamed into place. An existing run
//! directory is moved aside first and deleted only once the new one is live,
//! so readers see either the old run or the new one, never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::OutputError;

/// One file of a run, relative to the run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub relative_path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Files of one run, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArtifacts {
    files: Vec<Artifact>,
}

impl RunArtifacts {
    pub fn add(&mut self, relative_path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.push(Artifact {
            relative_path: relative_path.into(),
            bytes,
        });
    }

    pub fn files(&self) -> &[Artifact] {
        &self.files
    }

    pub fn get(&self, relative_path: impl AsRef<Path>) -> Option<&[u8]> {
        let wanted = relative_path.as_ref();
        self.files
            .iter()
            .find(|a| a.relative_path == wanted)
            .map(|a| a.bytes.as_slice())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn split(path: &Path) -> Result<(PathBuf, String), OutputError> {
    let name = path
        .file_name()
        .ok_or_else(|| OutputError::InvalidPath(path.to_path_buf()))?
        .to_string_lossy()
        .into_owned();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((parent, name))
}

fn remove_dir_if_exists(path: &Path) -> Result<(), OutputError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(OutputError::io(path, e)),
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let mut file = File::create(path).map_err(|e| OutputError::io(path, e))?;
    file.write_all(bytes).map_err(|e| OutputError::io(path, e))?;
    file.sync_all().map_err(|e| OutputError::io(path, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(err) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %err, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn stage(staging: &Path, artifacts: &RunArtifacts) -> Result<(), OutputError> {
    fs::create_dir_all(staging).map_err(|e| OutputError::io(staging, e))?;
    for artifact in artifacts.files() {
        let target = staging.join(&artifact.relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
        }
        write_synced(&target, &artifact.bytes)?;
    }
    sync_dir(staging);
    Ok(())
}

/// Replace `dir` with exactly `artifacts`.
pub fn write_run_dir(dir: &Path, artifacts: &RunArtifacts) -> Result<(), OutputError> {
    let (parent, name) = split(dir)?;
    fs::create_dir_all(&parent).map_err(|e| OutputError::io(&parent, e))?;

    let staging = parent.join(format!(".{name}.staging"));
    let previous = parent.join(format!(".{name}.previous"));
    remove_dir_if_exists(&staging)?;

    if let Err(err) = stage(&staging, artifacts) {
        let _ = fs::remove_dir_all(&staging);
        return Err(err);
    }

    let had_previous = dir.exists();
    if had_previous {
        remove_dir_if_exists(&previous)?;
        fs::rename(dir, &previous).map_err(|e| OutputError::io(dir, e))?;
    }
    if let Err(e) = fs::rename(&staging, dir) {
        if had_previous {
            let _ = fs::rename(&previous, dir);
        }
        let _ = fs::remove_dir_all(&staging);
        return Err(OutputError::io(dir, e));
    }
    if had_previous {
        remove_dir_if_exists(&previous)?;
    }
    sync_dir(&parent);

    debug!(dir = %dir.display(), files = artifacts.len(), "run directory written");
    Ok(())
}

/// Write one file via a temporary sibling and rename.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let (parent, name) = split(path)?;
    fs::create_dir_all(&parent).map_err(|e| OutputError::io(&parent, e))?;
    let tmp = parent.join(format!(".{name}.tmp"));
    if let Err(err) = write_synced(&tmp, bytes) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(OutputError::io(path, e));
    }
    sync_dir(&parent);
    Ok(())
}
