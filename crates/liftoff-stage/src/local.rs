//! Directory-backed [`SharedStore`].
//!
//! Maps every store path (scheme and authority dropped) under one local root.
//! Used by the CLI against a mounted shared filesystem and by tests.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use liftoff_core::{FileStatus, SharedStore, StoreError, StorePath, StoreResult};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(root.display(), e))?;
        Ok(LocalStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local filesystem location backing `path`.
    pub fn resolve(&self, path: &StorePath) -> PathBuf {
        self.root.join(path.path().trim_start_matches('/'))
    }

    fn status_of(&self, path: StorePath, local: &Path) -> StoreResult<FileStatus> {
        let metadata = fs::metadata(local).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
            _ => StoreError::io(&path, e),
        })?;
        let modification_time = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Ok(FileStatus {
            len: if metadata.is_dir() { 0 } else { metadata.len() },
            modification_time,
            is_dir: metadata.is_dir(),
            path,
        })
    }
}

/// Copy a file or a whole tree. An existing destination is replaced when
/// `overwrite` is set.
fn copy_tree(src: &Path, dst: &Path, display_dst: &StorePath, overwrite: bool) -> StoreResult<()> {
    let src_meta = fs::metadata(src).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(src.display().to_string()),
        _ => StoreError::io(src.display(), e),
    })?;

    if dst.exists() {
        if !overwrite {
            return Err(StoreError::AlreadyExists(display_dst.to_string()));
        }
        let removed = if dst.is_dir() { fs::remove_dir_all(dst) } else { fs::remove_file(dst) };
        removed.map_err(|e| StoreError::io(display_dst, e))?;
    }

    if src_meta.is_file() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(display_dst, e))?;
        }
        fs::copy(src, dst).map_err(|e| StoreError::io(display_dst, e))?;
        return Ok(());
    }

    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| StoreError::io(src.display(), io::Error::other(e)))?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| StoreError::io(display_dst, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| StoreError::io(display_dst, e))?;
        }
    }
    Ok(())
}

impl SharedStore for LocalStore {
    fn uri(&self) -> String {
        format!("local://{}", self.root.display())
    }

    fn copy_local_to_store(&self, src: &Path, dst: &StorePath, overwrite: bool) -> StoreResult<()> {
        copy_tree(src, &self.resolve(dst), dst, overwrite)
    }

    fn copy_store_to_store(&self, src: &StorePath, dst: &StorePath, overwrite: bool) -> StoreResult<()> {
        let local_src = self.resolve(src);
        if !local_src.exists() {
            return Err(StoreError::NotFound(src.to_string()));
        }
        copy_tree(&local_src, &self.resolve(dst), dst, overwrite)
    }

    fn list_children(&self, dir: &StorePath) -> StoreResult<Vec<FileStatus>> {
        let local = self.resolve(dir);
        let entries = fs::read_dir(&local).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(dir.to_string()),
            _ => StoreError::io(dir, e),
        })?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            children.push(self.status_of(dir.join(&name), &entry.path())?);
        }
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    fn delete(&self, path: &StorePath, recursive: bool) -> StoreResult<bool> {
        let local = self.resolve(path);
        let metadata = match fs::symlink_metadata(&local) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let removed = if metadata.is_dir() {
            if recursive { fs::remove_dir_all(&local) } else { fs::remove_dir(&local) }
        } else {
            fs::remove_file(&local)
        };
        removed.map_err(|e| StoreError::io(path, e))?;
        Ok(true)
    }

    fn open_for_read(&self, path: &StorePath) -> StoreResult<Box<dyn Read>> {
        let file = fs::File::open(self.resolve(path)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
            _ => StoreError::io(path, e),
        })?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn create_for_write(&self, path: &StorePath, overwrite: bool) -> StoreResult<Box<dyn Write>> {
        let local = self.resolve(path);
        if local.exists() && !overwrite {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(path, e))?;
        }
        let file = fs::File::create(&local).map_err(|e| StoreError::io(path, e))?;
        Ok(Box::new(file))
    }

    fn get_status(&self, path: &StorePath) -> StoreResult<FileStatus> {
        self.status_of(path.clone(), &self.resolve(path))
    }

    fn rename(&self, from: &StorePath, to: &StorePath) -> StoreResult<()> {
        let local_from = self.resolve(from);
        if !local_from.exists() {
            return Err(StoreError::NotFound(from.to_string()));
        }
        let local_to = self.resolve(to);
        if let Some(parent) = local_to.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(to, e))?;
        }
        fs::rename(&local_from, &local_to).map_err(|e| StoreError::io(from, e))
    }

    fn mkdirs(&self, path: &StorePath) -> StoreResult<()> {
        fs::create_dir_all(self.resolve(path)).map_err(|e| StoreError::io(path, e))
    }
}
