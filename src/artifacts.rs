//! Artifact mirror - copies a run's artifact tree to and from a bundle
//!
//! Both directions share one failure policy: a single file's copy or
//! upload failure is logged and skipped, and the run-level operation
//! continues. A partial artifact set is an accepted degraded outcome, not
//! a fatal error.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::tracking::{ArtifactEntry, TrackingStore};

/// Mirrors artifact trees between a tracking store and a bundle directory.
pub struct ArtifactMirror<'a> {
    store: &'a dyn TrackingStore,
}

impl<'a> ArtifactMirror<'a> {
    /// Create a mirror over a store.
    #[must_use]
    pub fn new(store: &'a dyn TrackingStore) -> Self {
        Self { store }
    }

    /// Export direction: copy the store-side artifact tree of `run_id`
    /// into `dest_root`, preserving relative paths. Directories are
    /// descended before sibling files are copied. Returns the number of
    /// files copied.
    pub fn download_run(&self, run_id: &str, dest_root: &Path) -> usize {
        self.download_tree(run_id, None, dest_root)
    }

    fn download_tree(&self, run_id: &str, path: Option<&str>, dest_root: &Path) -> usize {
        let entries = match self.store.list_artifacts(run_id, path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(run_id, path, error = %e, "artifact listing failed, skipping subtree");
                return 0;
            }
        };

        let (dirs, files): (Vec<ArtifactEntry>, Vec<ArtifactEntry>) =
            entries.into_iter().partition(ArtifactEntry::is_dir);

        let mut copied = 0;
        for dir in &dirs {
            copied += self.download_tree(run_id, Some(dir.path()), dest_root);
        }
        for file in &files {
            let dest = join_relative(dest_root, file.path());
            match self.store.download_artifact(run_id, file.path(), &dest) {
                Ok(()) => {
                    debug!(run_id, artifact = file.path(), "downloaded artifact");
                    copied += 1;
                }
                Err(e) => {
                    warn!(run_id, artifact = file.path(), error = %e, "artifact download failed, skipping");
                }
            }
        }
        copied
    }

    /// Import direction: walk a run's mirrored tree at `src_root` and
    /// upload every file to `dest_run_id`, preserving the relative path as
    /// the destination artifact path (root-level files get no sub-path).
    /// Returns the number of files uploaded.
    pub fn upload_run(&self, src_root: &Path, dest_run_id: &str) -> usize {
        let mut uploaded = 0;
        for entry in WalkDir::new(src_root).into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(src = %src_root.display(), error = %e, "artifact walk failed, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let artifact_dir = entry
                .path()
                .parent()
                .and_then(|parent| parent.strip_prefix(src_root).ok())
                .and_then(|relative| {
                    let joined = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    (!joined.is_empty()).then_some(joined)
                });
            match self
                .store
                .upload_artifact(dest_run_id, entry.path(), artifact_dir.as_deref())
            {
                Ok(()) => {
                    debug!(run_id = dest_run_id, file = %entry.path().display(), "uploaded artifact");
                    uploaded += 1;
                }
                Err(e) => {
                    warn!(run_id = dest_run_id, file = %entry.path().display(), error = %e, "artifact upload failed, skipping");
                }
            }
        }
        uploaded
    }
}

// Artifact paths use '/' separators; rebuild them as native path segments.
fn join_relative(root: &Path, artifact_path: &str) -> std::path::PathBuf {
    let mut path = root.to_path_buf();
    for segment in artifact_path.split('/') {
        path.push(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{MemoryStore, TrackingStore};

    fn store_with_artifact_tree() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let exp = store.create_experiment("baseline").unwrap();
        let run = store.create_run(exp.experiment_id(), "alice").unwrap();
        let run_id = run.run_id().to_string();
        store.put_artifact(&run_id, "report.txt", b"summary".to_vec());
        store.put_artifact(&run_id, "model/weights.bin", b"wwww".to_vec());
        store.put_artifact(&run_id, "model/ckpt/epoch1.bin", b"e1".to_vec());
        (store, run_id)
    }

    #[test]
    fn test_download_preserves_relative_paths() {
        let (store, run_id) = store_with_artifact_tree();
        let dir = tempfile::tempdir().unwrap();

        let copied = ArtifactMirror::new(&store).download_run(&run_id, dir.path());
        assert_eq!(copied, 3);
        assert_eq!(std::fs::read(dir.path().join("report.txt")).unwrap(), b"summary");
        assert_eq!(
            std::fs::read(dir.path().join("model/weights.bin")).unwrap(),
            b"wwww"
        );
        assert_eq!(
            std::fs::read(dir.path().join("model/ckpt/epoch1.bin")).unwrap(),
            b"e1"
        );
    }

    #[test]
    fn test_download_missing_run_returns_zero() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        let copied = ArtifactMirror::new(&store).download_run("ghost", dir.path());
        assert_eq!(copied, 0);
    }

    #[test]
    fn test_upload_preserves_relative_paths() {
        let (store, _) = store_with_artifact_tree();
        let exp = store.create_experiment("dest").unwrap();
        let dest_run = store.create_run(exp.experiment_id(), "alice").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("root.txt"), b"r").unwrap();
        std::fs::create_dir_all(dir.path().join("model/ckpt")).unwrap();
        std::fs::write(dir.path().join("model/weights.bin"), b"w").unwrap();
        std::fs::write(dir.path().join("model/ckpt/epoch1.bin"), b"e").unwrap();

        let uploaded = ArtifactMirror::new(&store).upload_run(dir.path(), dest_run.run_id());
        assert_eq!(uploaded, 3);
        assert_eq!(store.get_artifact(dest_run.run_id(), "root.txt").unwrap(), b"r");
        assert_eq!(
            store.get_artifact(dest_run.run_id(), "model/weights.bin").unwrap(),
            b"w"
        );
        assert_eq!(
            store
                .get_artifact(dest_run.run_id(), "model/ckpt/epoch1.bin")
                .unwrap(),
            b"e"
        );
    }

    #[test]
    fn test_upload_to_missing_run_skips_files() {
        let store = MemoryStore::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("root.txt"), b"r").unwrap();

        // The per-file failure policy applies: nothing uploaded, no panic.
        let uploaded = ArtifactMirror::new(&store).upload_run(dir.path(), "ghost");
        assert_eq!(uploaded, 0);
    }
}
