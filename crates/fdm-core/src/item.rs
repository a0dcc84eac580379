//! The download item handle: what is being fetched and where it lands.
//!
//! Owned by the caller and shared with operators via `Arc`; operators treat
//! it as read-only and never mutate caller-owned item state.

use std::path::{Path, PathBuf};
use url::Url;

/// Source URL plus destination path for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    url: Url,
    destination: PathBuf,
}

impl DownloadItem {
    pub fn new(url: Url, destination: impl Into<PathBuf>) -> Self {
        Self {
            url,
            destination: destination.into(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}
