//! Temporary storage locations for use in integration tests.
//!
//! ```
//! use visibility_test::fixtures::TestDir;
//!
//! let dir = TestDir::new();
//! let backend = dir.local_fs();
//! let ledger = dir.path("ledger.tsv");
//! // run the harness against `backend`, writing results next to it...
//! ```

use std::path::PathBuf;

use tempfile::TempDir;
use visibility_service::LocalFs;

/// A temporary directory holding a filesystem backend and harness output files.
///
/// The directory and everything in it is deleted when the fixture is dropped.
#[derive(Debug)]
pub struct TestDir {
    tempdir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        let tempdir = tempfile::tempdir().unwrap();
        std::fs::create_dir(tempdir.path().join("storage")).unwrap();
        Self { tempdir }
    }

    /// Returns a filesystem backend rooted in the `storage` subdirectory.
    pub fn local_fs(&self) -> LocalFs {
        LocalFs::new(&self.storage_path())
    }

    /// Returns the root of the filesystem backend.
    pub fn storage_path(&self) -> PathBuf {
        self.tempdir.path().join("storage")
    }

    /// Returns the path of an output file next to the storage directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.tempdir.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
