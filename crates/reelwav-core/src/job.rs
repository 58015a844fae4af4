//! Per-request scratch directories

use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// File name of the audio artifact inside a job directory.
pub const AUDIO_FILE_NAME: &str = "audio.wav";

/// A single conversion job and the scratch directory it owns.
///
/// The directory is removed when the `Job` is dropped, on success and
/// failure alike. Removal is best-effort: errors are only logged.
#[derive(Debug)]
pub struct Job {
    id: String,
    dir: PathBuf,
    keep: bool,
}

impl Job {
    /// Create a job with a fresh random identifier under `root`.
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let id = Uuid::new_v4().simple().to_string();
        let dir = root.join(&id);
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Created job {} at {}", id, dir.display());
        Ok(Self {
            id,
            dir,
            keep: false,
        })
    }

    /// Leave the directory on disk when the job is dropped.
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join(AUDIO_FILE_NAME)
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if self.keep {
            debug!("Keeping job directory: {}", self.dir.display());
            return;
        }

        let dir = std::mem::take(&mut self.dir);
        let remove = move || {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Failed to remove job directory {}: {}", dir.display(), e);
                }
            }
        };

        // Off the executor when there is one; inline otherwise.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(remove);
            }
            Err(_) => remove(),
        }
    }
}

/// Create the process-wide scratch root if it does not exist yet.
pub async fn ensure_scratch_root(root: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_until_gone(path: &Path) -> bool {
        for _ in 0..100 {
            if !path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn creates_hex_named_directory() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path()).await.unwrap();

        assert_eq!(job.id().len(), 32);
        assert!(job.id().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(job.dir().is_dir());
        assert_eq!(job.dir().parent(), Some(root.path()));
        assert_eq!(job.audio_path(), job.dir().join("audio.wav"));
    }

    #[tokio::test]
    async fn drop_removes_directory_with_contents() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path()).await.unwrap();
        let dir = job.dir().to_path_buf();
        std::fs::write(dir.join("video.mp4"), b"not really a video").unwrap();

        drop(job);
        assert!(wait_until_gone(&dir).await);
    }

    #[tokio::test]
    async fn keep_leaves_directory_behind() {
        let root = tempfile::tempdir().unwrap();
        let job = Job::create(root.path()).await.unwrap().keep(true);
        let dir = job.dir().to_path_buf();

        drop(job);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn concurrent_jobs_are_isolated() {
        let root = tempfile::tempdir().unwrap();
        let (a, b) = tokio::join!(Job::create(root.path()), Job::create(root.path()));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.id(), b.id());
        std::fs::write(a.audio_path(), b"a").unwrap();
        std::fs::write(b.audio_path(), b"b").unwrap();

        let files = |job: &Job| -> Vec<PathBuf> {
            std::fs::read_dir(job.dir())
                .unwrap()
                .map(|e| e.unwrap().path())
                .collect()
        };
        let (fa, fb) = (files(&a), files(&b));
        assert!(fa.iter().all(|p| !fb.contains(p)));
        assert_eq!(std::fs::read(a.audio_path()).unwrap(), b"a");
    }

    #[test]
    fn drop_outside_runtime_removes_inline() {
        let root = tempfile::tempdir().unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let job = rt.block_on(Job::create(root.path())).unwrap();
        let dir = job.dir().to_path_buf();
        drop(rt);

        drop(job);
        assert!(!dir.exists());
    }
}
