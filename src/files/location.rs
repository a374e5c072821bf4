use crate::error::{GatewayError, Result};
use std::path::{Component, Path, PathBuf};

/// An absolute base directory shared by static files and cache entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLocation {
    base: PathBuf,
}

impl FolderLocation {
    /// Relative paths are anchored at the process working directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(GatewayError::Config("folder location is empty".to_string()));
        }
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let base = absolute
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        Ok(Self { base })
    }

    pub fn path(&self) -> &Path {
        &self.base
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.base.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_path_is_kept() {
        let loc = FolderLocation::new("/var/www/./public").unwrap();
        assert_eq!(loc.path(), Path::new("/var/www/public"));
    }

    #[test]
    fn relative_path_is_anchored() {
        let loc = FolderLocation::new("./cache").unwrap();
        assert!(loc.path().is_absolute());
        assert!(loc.path().ends_with("cache"));
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            FolderLocation::new(""),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn join_appends() {
        let loc = FolderLocation::new("/srv").unwrap();
        assert_eq!(loc.join("a/b.txt"), PathBuf::from("/srv/a/b.txt"));
    }
}
