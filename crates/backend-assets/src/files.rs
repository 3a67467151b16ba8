//! File records exchanged with the backend and the upload widget

use serde::{Deserialize, Serialize};

use crate::error::{AssetError, Result};

/// Which of the server's file areas a file lives in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Input,
    #[default]
    Output,
    Temp,
}

/// One file produced by the backend, as it appears in a result payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryOutputEntry {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default)]
    pub kind: FileKind,
}

impl GalleryOutputEntry {
    pub fn new(filename: impl Into<String>, subfolder: impl Into<String>, kind: FileKind) -> Self {
        Self {
            filename: filename.into(),
            subfolder: subfolder.into(),
            kind,
        }
    }
}

/// The `{"images": [...]}` payload of a result-producing node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryOutput {
    #[serde(default)]
    pub images: Vec<GalleryOutputEntry>,
}

/// Either a ready URL or a backend file entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileRef {
    Url(String),
    Entry(GalleryOutputEntry),
}

/// A file as held by the upload widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_name: Option<String>,
    /// False when `data` is inline content or a URL rather than a server file
    pub is_file: bool,
    pub data: String,
}

impl UploaderFile {
    /// The backend entry for a server-side file; inline data is rejected
    pub fn to_entry(&self, kind: FileKind) -> Result<GalleryOutputEntry> {
        if !self.is_file {
            return Err(AssetError::NotAFile(self.name.clone()));
        }
        Ok(GalleryOutputEntry::new(&self.name, "", kind))
    }
}
