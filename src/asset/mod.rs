//! Embedded asset store
//!
//! An immutable path → file map built once at startup from the compiled-in
//! front-end bundle. Lookups never touch the disk and hold no handles; a
//! returned [`Asset`] is a cheap clone of shared bytes.

mod embedded;

use std::collections::HashMap;

use hyper::body::Bytes;
use rust_embed::RustEmbed;
use thiserror::Error;

use crate::http::{cache, mime};

pub use embedded::WebAssets;

/// Path of the single-page-app entry point inside the store
pub const FALLBACK_DOCUMENT: &str = "index.html";

/// Subdirectory of the embedded tree that maps to web-root `/`
pub const DIST_PREFIX: &str = "dist";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("invalid subtree prefix '{0}'")]
    InvalidPrefix(String),
    #[error("embedded subtree '{0}' contains no files")]
    EmptySubtree(String),
}

/// A readable leaf file of the store
#[derive(Debug, Clone)]
pub struct Asset {
    data: Bytes,
    content_type: Option<&'static str>,
    etag: String,
}

impl Asset {
    pub fn new(path: &str, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            content_type: mime::content_type_for_path(path),
            etag: cache::generate_etag(&data),
            data,
        }
    }

    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Inferred from the extension, `None` when unknown
    pub const fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }
}

/// Read-only file tree keyed by relative `/`-separated path (no leading slash)
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    files: HashMap<String, Asset>,
}

impl AssetStore {
    /// Mount the `prefix` subtree of an embedded folder as the store root
    pub fn mount<E: RustEmbed>(prefix: &str) -> Result<Self, AssetError> {
        let prefix = validate_prefix(prefix)?;
        let dir = format!("{prefix}/");

        let files = E::iter().filter_map(|name| {
            let relative = name.strip_prefix(dir.as_str())?.to_string();
            let file = E::get(&name)?;
            Some((relative, file.data.into_owned()))
        });
        let store = Self::from_files(files);

        if store.is_empty() {
            return Err(AssetError::EmptySubtree(prefix.to_string()));
        }
        Ok(store)
    }

    /// Build a store from `(relative path, contents)` pairs
    pub fn from_files<P, D>(files: impl IntoIterator<Item = (P, D)>) -> Self
    where
        P: Into<String>,
        D: Into<Bytes>,
    {
        let files = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                let asset = Asset::new(&path, data);
                (path, asset)
            })
            .collect();
        Self { files }
    }

    /// Resolve a relative path to a leaf file
    ///
    /// Directories are not entries, so they resolve to `None` like any
    /// missing path.
    pub fn get(&self, path: &str) -> Option<&Asset> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn validate_prefix(prefix: &str) -> Result<&str, AssetError> {
    let trimmed = prefix.trim_end_matches('/');
    let invalid = trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(AssetError::InvalidPrefix(prefix.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> AssetStore {
        AssetStore::from_files([
            ("index.html", &b"<!doctype html><div id=app></div>"[..]),
            ("assets/app.js", &b"console.log(1)"[..]),
            ("assets/blob.bin", &b"\x00\x01\x02"[..]),
        ])
    }

    #[test]
    fn test_lookup_leaf_files() {
        let store = sample_store();
        let js = store.get("assets/app.js").unwrap();
        assert_eq!(js.data(), Bytes::from_static(b"console.log(1)"));
        assert_eq!(js.len(), 14);
        assert_eq!(js.content_type(), Some("text/javascript; charset=utf-8"));
        assert_eq!(store.get("assets/blob.bin").unwrap().content_type(), None);
    }

    #[test]
    fn test_directories_are_absent() {
        let store = sample_store();
        assert!(store.get("assets").is_none());
        assert!(store.get("assets/").is_none());
        assert!(store.get("").is_none());
        assert!(store.get("/index.html").is_none());
    }

    #[test]
    fn test_validate_prefix() {
        assert_eq!(validate_prefix("dist"), Ok("dist"));
        assert_eq!(validate_prefix("dist/"), Ok("dist"));
        assert_eq!(validate_prefix("web/dist"), Ok("web/dist"));
        for bad in ["", "/", "/dist", "../dist", "web//dist", "./dist"] {
            assert_eq!(
                validate_prefix(bad),
                Err(AssetError::InvalidPrefix(bad.to_string())),
                "prefix {bad:?}"
            );
        }
    }

    #[test]
    fn test_mount_embedded_bundle() {
        let store = AssetStore::mount::<WebAssets>(DIST_PREFIX).unwrap();
        let index = store.get(FALLBACK_DOCUMENT).unwrap();
        assert_eq!(index.content_type(), Some("text/html; charset=utf-8"));
        assert!(!index.is_empty());
        // Files outside the mounted subtree are not reachable
        assert!(store.get("dist/index.html").is_none());
    }

    #[test]
    fn test_mount_missing_subtree() {
        assert_eq!(
            AssetStore::mount::<WebAssets>("nope").unwrap_err(),
            AssetError::EmptySubtree("nope".to_string())
        );
        assert!(matches!(
            AssetStore::mount::<WebAssets>("../web"),
            Err(AssetError::InvalidPrefix(_))
        ));
    }
}
