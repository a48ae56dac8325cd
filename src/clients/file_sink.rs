use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use log::debug;
use tokio::io::AsyncWriteExt;

use crate::clients::errors::{Error, Result};

/// Outcome of [`FileSink::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Written(PathBuf),
    AlreadyExists(PathBuf),
}

/// Outcome of [`FileSink::claim`].
pub enum Claim {
    /// Nothing at the target yet; the caller owns the temporary file.
    Vacant(PendingFile),
    /// The target exists, or another unit of this run is writing it.
    Occupied(PathBuf),
}

type HeldPaths = Arc<Mutex<HashSet<PathBuf>>>;

/// Places downloaded bytes under one destination directory.
///
/// Only a file at the final path counts as done, and it is never overwritten.
/// Bytes go to a hidden `.{name}.part` sibling and are moved to the final name
/// by [`PendingFile::commit`]. A leftover `.part` from an interrupted run is
/// truncated and reused. Clones share one set of held paths, so two units of
/// the same run cannot write the same name at once.
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
    held: HeldPaths,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSink {
            root: root.into(),
            held: HeldPaths::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Reserve `filename` without writing anything yet.
    pub async fn claim(&self, filename: &str) -> Result<Claim> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::fs(&self.root, e))?;

        let final_path = self.path_for(filename);
        if tokio::fs::try_exists(&final_path)
            .await
            .map_err(|e| Error::fs(&final_path, e))?
        {
            return Ok(Claim::Occupied(final_path));
        }

        if !lock_paths(&self.held).insert(final_path.clone()) {
            debug!("{final_path:?} is being written by another unit");
            return Ok(Claim::Occupied(final_path));
        }

        let part_path = self.root.join(format!(".{filename}.part"));
        // dropping `pending` releases the hold on any early return
        let mut pending = PendingFile {
            file: None,
            part_path,
            final_path,
            held: Arc::clone(&self.held),
            committed: false,
        };
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&pending.part_path)
            .await
            .map_err(|e| Error::fs(&pending.part_path, e))?;
        pending.file = Some(file);
        Ok(Claim::Vacant(pending))
    }

    /// Write `chunks` to `filename` unless it is already there.
    ///
    /// The stream is left untouched when the file exists.
    pub async fn place<S>(&self, filename: &str, chunks: S) -> Result<Placement>
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        match self.claim(filename).await? {
            Claim::Occupied(path) => Ok(Placement::AlreadyExists(path)),
            Claim::Vacant(mut pending) => {
                pending.write_all(chunks).await?;
                Ok(Placement::Written(pending.commit().await?))
            }
        }
    }
}

fn lock_paths(held: &Mutex<HashSet<PathBuf>>) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
    // the set stays consistent even if a holder panicked
    held.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A reserved, not yet committed output file.
///
/// Dropping it before [`PendingFile::commit`] removes the temporary file, so
/// failed or cancelled downloads leave nothing under either name.
#[derive(Debug)]
pub struct PendingFile {
    file: Option<tokio::fs::File>,
    part_path: PathBuf,
    final_path: PathBuf,
    held: HeldPaths,
    committed: bool,
}

impl PendingFile {
    /// Where the bytes live until [`Self::commit`].
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Write every chunk in order to the temporary file.
    pub async fn write_all<S>(&mut self, mut chunks: S) -> Result<()>
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        let Some(mut file) = self.file.take() else {
            return Err(Error::fs(
                &self.part_path,
                std::io::Error::other("temporary file already written"),
            ));
        };

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::fs(&self.part_path, e))?;
        }
        file.flush()
            .await
            .map_err(|e| Error::fs(&self.part_path, e))
    }

    /// Move the temporary file to its final name.
    pub async fn commit(mut self) -> Result<PathBuf> {
        drop(self.file.take());
        tokio::fs::rename(&self.part_path, &self.final_path)
            .await
            .map_err(|e| Error::fs(&self.final_path, e))?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        lock_paths(&self.held).remove(&self.final_path);
        if self.committed {
            return;
        }
        drop(self.file.take());
        // blocking unlink, Drop cannot await
        if let Err(e) = std::fs::remove_file(&self.part_path)
            && e.kind() != ErrorKind::NotFound
        {
            debug!("Failed to remove {:?}: {e}", self.part_path);
        }
    }
}
