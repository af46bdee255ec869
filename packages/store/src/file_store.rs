//! # Filesystem-backed session storage
//!
//! [`FileStorage`] is a [`SessionStorage`] implementation that keeps each key
//! in its own file. It is used by native front ends to retain the signed-in
//! session across restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── user            # JSON identity
//! └── access_token    # raw bearer token
//! ```
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a crash
//! mid-write leaves either the old value or the new one.
//!
//! ## Platform data directories
//!
//! Front ends pick the base with `dirs::data_dir()`:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS | `~/Library/Application Support/quill/` |
//! | Linux | `~/.local/share/quill/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\quill\` |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::session::SessionStorage;

/// Filesystem-backed SessionStorage.
#[derive(Clone, Debug)]
pub struct FileStorage {
    base: PathBuf,
}

impl FileStorage {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.base)?;
        let path = self.key_path(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
