//! Animation asset discovery
//!
//! Enumerates the animation files of one directory and maps them onto the
//! public paths the player loads them from.

use crate::utils::config::AssetsConfig;
use crate::utils::error::{AnimloopError, IntoAnimloopError, Result};
use log::{debug, warn};
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Ordered, immutable list of asset paths
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetList {
    paths: Rc<[String]>,
}

impl AssetList {
    /// Create a list from anything yielding paths
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Join each file name onto a public URL prefix
    pub fn with_prefix<I, S>(prefix: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefix = prefix.trim_end_matches('/');
        Self::new(names.into_iter().map(|name| format!("{}/{}", prefix, name.as_ref())))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.paths.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.paths
    }

    /// Pretty-printed JSON array of the paths
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self.as_slice())?)
    }
}

impl Index<usize> for AssetList {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.paths[index]
    }
}

impl From<Vec<String>> for AssetList {
    fn from(paths: Vec<String>) -> Self {
        Self { paths: paths.into() }
    }
}

/// Lists animation files in a directory
#[derive(Debug, Clone)]
pub struct AssetLister {
    directory: PathBuf,
    url_prefix: String,
    extension: String,
}

impl AssetLister {
    /// Create a lister
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory scanned for files
    /// * `url_prefix` - Public prefix each file name is joined onto
    /// * `extension` - Extension to match, with or without the leading dot
    pub fn new(directory: impl Into<PathBuf>, url_prefix: impl Into<String>, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            url_prefix: url_prefix.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Self {
        Self::new(&config.directory, config.url_prefix.clone(), &config.extension)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Enumerate the matching files, sorted by file name
    ///
    /// A missing directory yields an empty list.
    pub fn list(&self) -> Result<AssetList> {
        if self.extension.is_empty() {
            return Err(AnimloopError::InvalidInput(
                "asset extension must not be empty".to_string(),
            ));
        }

        if !self.directory.is_dir() {
            debug!("Asset directory {} does not exist", self.directory.display());
            return Ok(AssetList::default());
        }

        let entries = std::fs::read_dir(&self.directory)
            .assets_err(&format!("Failed to read {}", self.directory.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.extension.as_str()) {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) if name.starts_with('.') => {}
                Ok(name) => names.push(name),
                Err(raw) => warn!("Skipping non UTF-8 asset name {:?}", raw),
            }
        }

        names.sort();
        debug!("Found {} assets in {}", names.len(), self.directory.display());

        Ok(AssetList::with_prefix(&self.url_prefix, names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"{}").unwrap();
    }

    #[test]
    fn test_lists_sorted_prefixed_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.json");
        touch(dir.path(), "a.json");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.json");
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let lister = AssetLister::new(dir.path(), "/assets/animationen/autoplay/", "json");
        let assets = lister.list().unwrap();

        assert_eq!(
            assets.as_slice(),
            &[
                "/assets/animationen/autoplay/a.json".to_string(),
                "/assets/animationen/autoplay/b.json".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let lister = AssetLister::new(dir.path().join("absent"), "/x", ".json");
        assert_eq!(lister.directory(), dir.path().join("absent"));

        assert!(lister.list().unwrap().is_empty());
    }

    #[test]
    fn test_empty_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let lister = AssetLister::new(dir.path(), "/x", ".");

        assert!(matches!(lister.list(), Err(AnimloopError::InvalidInput(_))));
    }

    #[test]
    fn test_with_prefix_trims_trailing_slashes() {
        let assets = AssetList::with_prefix("/assets/autoplay//", ["a.json", "b.json"]);
        assert_eq!(
            assets.as_slice(),
            &["/assets/autoplay/a.json".to_string(), "/assets/autoplay/b.json".to_string()]
        );

        let rooted = AssetList::with_prefix("", vec!["c.json".to_string()]);
        assert_eq!(rooted.get(0), Some("/c.json"));
    }

    #[test]
    fn test_to_json() {
        let assets = AssetList::new(["/a.json"]);
        let parsed: Vec<String> = serde_json::from_str(&assets.to_json().unwrap()).unwrap();

        assert_eq!(parsed, vec!["/a.json".to_string()]);
        assert_eq!(AssetList::default().to_json().unwrap(), "[]");
    }

    #[test]
    fn test_asset_list_accessors() {
        let assets = AssetList::new(["/a.json", "/b.json"]);

        assert_eq!(assets.len(), 2);
        assert_eq!(assets.get(1), Some("/b.json"));
        assert_eq!(assets.get(2), None);
        assert_eq!(&assets[0], "/a.json");
        assert_eq!(assets.iter().collect::<Vec<_>>(), vec!["/a.json", "/b.json"]);
    }
}
