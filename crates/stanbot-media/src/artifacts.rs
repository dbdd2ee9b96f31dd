//! Temp artifact tracking for a single conversion request.
//!
//! Every intermediate file the pipeline writes is registered here under the
//! attempt index that produced it. The arena guarantees removal of all
//! registered paths on every exit path; the only file that survives is the
//! one explicitly moved out with [`ArtifactArena::transfer`]. The caller's
//! uploaded source file is never registered, so it is never deleted.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use stanbot_models::UserId;

/// Attempt-indexed table of live artifact paths for one request.
///
/// Each request gets its own namespace directory under the work dir, named
/// `{user_id}_{uuid}`, so concurrent conversions never collide.
#[derive(Debug)]
pub struct ArtifactArena {
    /// Directory all attempt artifacts are written into.
    namespace_dir: PathBuf,
    /// Unique per-request prefix.
    namespace: String,
    /// Parent work directory; the final artifact is moved here.
    work_dir: PathBuf,
    /// Live artifact paths keyed by attempt index.
    live: BTreeMap<u32, PathBuf>,
    /// Set once cleanup has run.
    cleaned: bool,
}

impl ArtifactArena {
    /// Create the namespace directory for one request.
    pub async fn create(work_dir: impl AsRef<Path>, requester: UserId) -> io::Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();
        let namespace = format!("{}_{}", requester, Uuid::new_v4().simple());
        let namespace_dir = work_dir.join(&namespace);
        fs::create_dir_all(&namespace_dir).await?;

        Ok(Self {
            namespace_dir,
            namespace,
            work_dir,
            live: BTreeMap::new(),
            cleaned: false,
        })
    }

    /// Register and return the artifact path for an attempt.
    ///
    /// The file does not exist yet; the caller writes it. Registered paths
    /// are swept by [`cleanup`](Self::cleanup) whether or not the write ever
    /// happened.
    pub fn attempt_path(&mut self, attempt: u32) -> PathBuf {
        let path = self.namespace_dir.join(format!("attempt_{attempt}.gif"));
        self.live.insert(attempt, path.clone());
        path
    }

    /// Best-effort removal of a superseded attempt's artifact.
    ///
    /// Missing files are fine; any other deletion failure is logged and
    /// swallowed so it cannot mask the pipeline's primary result.
    pub async fn discard(&mut self, attempt: u32) {
        let Some(path) = self.live.remove(&attempt) else {
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!(attempt, path = %path.display(), "Removed superseded artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                attempt,
                path = %path.display(),
                error = %e,
                "Failed to remove superseded artifact"
            ),
        }
    }

    /// Move an attempt's artifact out of the arena and hand ownership to the
    /// caller.
    ///
    /// The file is renamed into the work directory (out of the namespace
    /// directory) and dropped from the live table, so the final cleanup sweep
    /// will not touch it.
    pub async fn transfer(&mut self, attempt: u32) -> io::Result<PathBuf> {
        let src = self.live.remove(&attempt).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no live artifact for attempt {attempt}"),
            )
        })?;

        let dst = self.work_dir.join(format!("{}.gif", self.namespace));
        fs::rename(&src, &dst).await?;
        debug!(attempt, path = %dst.display(), "Transferred final artifact out of arena");
        Ok(dst)
    }

    /// Delete every live artifact and the namespace directory.
    ///
    /// Idempotent: a second call is a no-op, and missing files are not
    /// errors. Deletion failures are logged, never escalated.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }

        for (attempt, path) in std::mem::take(&mut self.live) {
            match fs::remove_file(&path).await {
                Ok(()) => debug!(attempt, path = %path.display(), "Removed leftover artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    attempt,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove leftover artifact"
                ),
            }
        }

        if let Err(e) = fs::remove_dir(&self.namespace_dir).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    path = %self.namespace_dir.display(),
                    error = %e,
                    "Failed to remove artifact directory"
                );
            }
        }

        self.cleaned = true;
    }

    /// Per-request namespace, `{user_id}_{uuid}`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Directory holding this request's intermediate artifacts.
    pub fn namespace_dir(&self) -> &Path {
        &self.namespace_dir
    }

    /// Number of artifacts still tracked.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Drop for ArtifactArena {
    fn drop(&mut self) {
        // Backstop for early returns that skipped cleanup. Sync and
        // best-effort only.
        if !self.cleaned {
            for path in self.live.values() {
                let _ = std::fs::remove_file(path);
            }
            let _ = std::fs::remove_dir(&self.namespace_dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cleanup_removes_artifacts_and_dir() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(42)).await.unwrap();

        let p0 = arena.attempt_path(0);
        let p1 = arena.attempt_path(1);
        fs::write(&p0, b"a").await.unwrap();
        fs::write(&p1, b"b").await.unwrap();

        let namespace_dir = arena.namespace_dir().to_path_buf();
        arena.cleanup().await;

        assert!(!p0.exists());
        assert!(!p1.exists());
        assert!(!namespace_dir.exists());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(1)).await.unwrap();

        let p0 = arena.attempt_path(0);
        fs::write(&p0, b"a").await.unwrap();

        arena.cleanup().await;
        arena.cleanup().await;
        assert!(!p0.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_never_written_paths() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(1)).await.unwrap();

        // Registered but the write never happened.
        let p0 = arena.attempt_path(0);
        assert!(!p0.exists());

        arena.cleanup().await;
        assert!(!arena.namespace_dir().exists());
    }

    #[tokio::test]
    async fn test_discard_unregisters_and_removes() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(1)).await.unwrap();

        let p0 = arena.attempt_path(0);
        fs::write(&p0, b"a").await.unwrap();
        assert_eq!(arena.live_count(), 1);

        arena.discard(0).await;
        assert!(!p0.exists());
        assert_eq!(arena.live_count(), 0);

        // Discarding again is a no-op.
        arena.discard(0).await;
        arena.cleanup().await;
    }

    #[tokio::test]
    async fn test_transfer_survives_cleanup() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(7)).await.unwrap();

        let p2 = arena.attempt_path(2);
        fs::write(&p2, b"final gif bytes").await.unwrap();

        let result = arena.transfer(2).await.unwrap();
        arena.cleanup().await;

        assert!(result.exists());
        assert!(!p2.exists());
        assert!(!arena.namespace_dir().exists());
        assert_eq!(fs::read(&result).await.unwrap(), b"final gif bytes");
    }

    #[tokio::test]
    async fn test_transfer_unknown_attempt_fails() {
        let dir = TempDir::new().unwrap();
        let mut arena = ArtifactArena::create(dir.path(), UserId(7)).await.unwrap();

        let err = arena.transfer(5).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        arena.cleanup().await;
    }

    #[tokio::test]
    async fn test_drop_backstop_removes_leftovers() {
        let dir = TempDir::new().unwrap();
        let (p0, namespace_dir) = {
            let mut arena = ArtifactArena::create(dir.path(), UserId(9)).await.unwrap();
            let p0 = arena.attempt_path(0);
            fs::write(&p0, b"a").await.unwrap();
            (p0, arena.namespace_dir().to_path_buf())
            // Arena dropped here without cleanup().
        };

        assert!(!p0.exists());
        assert!(!namespace_dir.exists());
    }

    #[tokio::test]
    async fn test_namespaces_are_disjoint() {
        let dir = TempDir::new().unwrap();
        let mut a = ArtifactArena::create(dir.path(), UserId(1)).await.unwrap();
        let mut b = ArtifactArena::create(dir.path(), UserId(1)).await.unwrap();

        assert_ne!(a.namespace(), b.namespace());
        assert_ne!(a.attempt_path(0), b.attempt_path(0));

        a.cleanup().await;
        b.cleanup().await;
    }
}
