//! Directory-backed bucket store.
//!
//! Each bucket is a directory under the store root and each object a file
//! named by its object name. Object names may contain `/`, which maps onto
//! nested directories.

use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use eyre::{Result, WrapErr};
use walkdir::WalkDir;

use crate::copy_task::CopyTask;
use crate::dispatcher::CopyOperation;
use crate::errors::{StoreError, StoreErrorKind, StoreResult};

#[derive(Clone, Debug)]
pub struct BucketStore {
    root: PathBuf,
}

impl BucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_path(&self, bucket: &str) -> StoreResult<PathBuf> {
        let mut components = Path::new(bucket).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket)),
            _ => Err(StoreError::invalid_name(
                format!("invalid bucket name {bucket:?}"),
                None,
            )),
        }
    }

    pub fn object_path(&self, bucket: &str, object: &str) -> StoreResult<PathBuf> {
        let label = Some(format!("{bucket}/{object}"));
        let rel = Path::new(object);
        if object.is_empty() || rel.is_absolute() {
            return Err(StoreError::invalid_name(
                "object name must be a non-empty relative name",
                label,
            ));
        }
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(StoreError::invalid_name(
                "object name may not contain parent or root components",
                label,
            ));
        }
        Ok(self.bucket_path(bucket)?.join(rel))
    }

    pub fn create_bucket(&self, bucket: &str) -> StoreResult<PathBuf> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&path).map_err(|err| StoreError::from_io(&err, Some(bucket.into())))?;
        Ok(path)
    }

    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.bucket_path(bucket).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Uploads a local file as `bucket/name`, replacing any existing object.
    ///
    /// Returns the number of bytes stored.
    pub fn insert_object(&self, bucket: &str, name: &str, source: &Path) -> StoreResult<u64> {
        self.require_bucket(bucket)?;
        let dest = self.object_path(bucket, name)?;
        let label = Some(format!("{bucket}/{name}"));
        if !source.is_file() {
            return Err(StoreError::not_found(
                format!("upload source {} is not a file", source.display()),
                label,
            ));
        }
        write_object(source, &dest, label)
    }

    /// Copies `source_bucket/source_object` to `dest_bucket/dest_object`.
    ///
    /// Repeating a copy overwrites the destination with identical content.
    pub fn copy_object(&self, task: &CopyTask) -> StoreResult<u64> {
        self.require_bucket(&task.source_bucket)?;
        self.require_bucket(&task.dest_bucket)?;
        let src = self.object_path(&task.source_bucket, &task.source_object)?;
        let dest = self.object_path(&task.dest_bucket, &task.dest_object)?;
        if !src.is_file() {
            return Err(StoreError::not_found(
                "source object not found",
                Some(format!("{}/{}", task.source_bucket, task.source_object)),
            ));
        }
        write_object(
            &src,
            &dest,
            Some(format!("{}/{}", task.dest_bucket, task.dest_object)),
        )
    }

    /// Object names in `bucket`, sorted.
    pub fn list_objects(&self, bucket: &str) -> StoreResult<Vec<String>> {
        let base = self.require_bucket(bucket)?;
        let mut names = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1) {
            let entry = entry.map_err(|err| {
                StoreError::new(StoreErrorKind::Io, err.to_string(), Some(bucket.into()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&base) {
                let name: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                names.push(name.join("/"));
            }
        }
        names.sort();
        Ok(names)
    }

    fn require_bucket(&self, bucket: &str) -> StoreResult<PathBuf> {
        let path = self.bucket_path(bucket)?;
        if !path.is_dir() {
            return Err(StoreError::not_found(
                "bucket does not exist",
                Some(bucket.to_string()),
            ));
        }
        Ok(path)
    }
}

fn write_object(src: &Path, dest: &Path, label: Option<String>) -> StoreResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|err| StoreError::from_io(&err, label.clone()))?;
    }
    fs::copy(src, dest).map_err(|err| StoreError::from_io(&err, label))
}

#[async_trait]
impl CopyOperation for BucketStore {
    async fn copy(&self, task: &CopyTask) -> Result<()> {
        let store = self.clone();
        let task = task.clone();
        let bytes = tokio::task::spawn_blocking(move || store.copy_object(&task))
            .await
            .wrap_err("bucket copy task failed to run")??;
        log::trace!("copied {bytes} byte(s)");
        Ok(())
    }
}
