//! Store configuration.

use std::path::PathBuf;

/// Configuration for a [`NotebookStore`].
///
/// The store is an explicit service value: construct one at startup and
/// inject it where needed. There is no global instance.
///
/// [`NotebookStore`]: crate::store::NotebookStore
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory that relative notebook paths and upload targets resolve
    /// against. Also the default working directory for opened documents.
    pub root_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
        }
    }
}

/// Default root directory for notebook files.
pub fn default_root_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("notebooks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_root_dir_ends_with_notebooks() {
        let config = StoreConfig::default();
        assert!(config.root_dir.ends_with("notebooks"));
    }
}
