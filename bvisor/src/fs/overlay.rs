//! Host-side directory tree that materialises CoW copies and private `/tmp`
//! (spec §3 "OverlayRoot", §6 "Overlay layout").

use std::fs;
use std::path::{Path, PathBuf};

use bvisor_shared::{BvisorError, BvisorResult};

const UID_HEX_DIGITS: usize = 16;
/// Fixed uid used by test builds so overlay paths are deterministic
/// (spec §5 "fixed (`testtest…`) in test builds").
const TEST_UID: &str = "testtest00000000";

#[derive(Debug)]
pub struct OverlayRoot {
    root: PathBuf,
}

impl OverlayRoot {
    /// Create a fresh overlay under `parent`, materialising `cow/` and
    /// `tmp/` immediately.
    pub fn create(parent: &Path) -> BvisorResult<Self> {
        let uid = random_uid();
        Self::create_with_uid(parent, &uid)
    }

    pub fn create_for_test(parent: &Path) -> BvisorResult<Self> {
        Self::create_with_uid(parent, TEST_UID)
    }

    fn create_with_uid(parent: &Path, uid: &str) -> BvisorResult<Self> {
        let root = parent.join(uid);
        fs::create_dir_all(root.join("cow"))
            .map_err(|e| BvisorError::Overlay(format!("creating cow/: {e}")))?;
        fs::create_dir_all(root.join("tmp"))
            .map_err(|e| BvisorError::Overlay(format!("creating tmp/: {e}")))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The overlay path that mirrors `guest_path` under `cow/`.
    pub fn cow_path(&self, guest_path: &str) -> PathBuf {
        self.root.join("cow").join(guest_path.trim_start_matches('/'))
    }

    /// The overlay path that serves `guest_path` (which must start with
    /// `/tmp/`) under `tmp/`.
    pub fn tmp_path(&self, guest_path: &str) -> PathBuf {
        let remainder = guest_path.trim_start_matches("/tmp").trim_start_matches('/');
        self.root.join("tmp").join(remainder)
    }

    /// Remove the entire overlay tree (spec §5 "destroyed at supervisor
    /// stop"). Best-effort: logged, not fatal, since there is nothing left
    /// to recover into on shutdown.
    pub fn destroy(self) {
        if let Err(e) = fs::remove_dir_all(&self.root) {
            tracing::warn!(root = %self.root.display(), error = %e, "failed to remove overlay root");
        }
    }
}

fn random_uid() -> String {
    let bytes: [u8; UID_HEX_DIGITS / 2] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_materialises_both_subtrees() {
        let tmp = TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(tmp.path()).unwrap();
        assert!(overlay.root().join("cow").is_dir());
        assert!(overlay.root().join("tmp").is_dir());
    }

    #[test]
    fn test_uid_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(tmp.path()).unwrap();
        assert_eq!(overlay.root().file_name().unwrap(), TEST_UID);
    }

    #[test]
    fn cow_path_strips_leading_slash() {
        let tmp = TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(tmp.path()).unwrap();
        let p = overlay.cow_path("/etc/passwd");
        assert_eq!(p, overlay.root().join("cow/etc/passwd"));
    }

    #[test]
    fn tmp_path_strips_tmp_prefix() {
        let tmp = TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(tmp.path()).unwrap();
        let p = overlay.tmp_path("/tmp/foo/bar");
        assert_eq!(p, overlay.root().join("tmp/foo/bar"));
    }

    #[test]
    fn destroy_removes_the_tree() {
        let tmp = TempDir::new().unwrap();
        let overlay = OverlayRoot::create_for_test(tmp.path()).unwrap();
        let root = overlay.root().to_path_buf();
        overlay.destroy();
        assert!(!root.exists());
    }
}
