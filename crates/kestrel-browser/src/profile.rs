use crate::Result;
use std::path::Path;
use tempfile::TempDir;

/// A throwaway Chrome user-data directory, deleted on drop.
///
/// Every browser Kestrel starts gets its own, so concurrent launches never
/// contend for the same profile lock.
pub struct ProfileManager {
    dir: TempDir,
}

impl ProfileManager {
    pub fn temporary() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("kestrel-profile-").tempdir()?;
        tracing::debug!("Created temporary Chrome profile at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
