//! URLs of the backend's file endpoints

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::files::{FileKind, FileRef, GalleryOutput, GalleryOutputEntry, UploaderFile};

/// Address the backend listens on when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8188";

const VIEW_PATH: &str = "/view";
const UPLOAD_IMAGE_PATH: &str = "/upload/image";

/// Base address of the backend server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoint {
    base_url: String,
}

impl Default for BackendEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BackendEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/view` URL for a backend file
    pub fn view_url(&self, entry: &GalleryOutputEntry) -> Result<String> {
        let query = serde_urlencoded::to_string(entry)?;
        Ok(format!("{}{}?{}", self.base_url, VIEW_PATH, query))
    }

    /// `/view` URL for a file name
    pub fn file_view_url(&self, filename: &str, subfolder: &str, kind: FileKind) -> Result<String> {
        self.view_url(&GalleryOutputEntry::new(filename, subfolder, kind))
    }

    pub fn upload_image_url(&self) -> String {
        format!("{}{}", self.base_url, UPLOAD_IMAGE_PATH)
    }

    /// URL for a file reference; ready URLs pass through unchanged
    pub fn file_ref_url(&self, file: &FileRef) -> Result<String> {
        match file {
            FileRef::Url(url) => Ok(url.clone()),
            FileRef::Entry(entry) => self.view_url(entry),
        }
    }

    /// Uploader records pointing at each image of a result payload
    pub fn gallery_to_uploader_files(&self, output: &GalleryOutput) -> Result<Vec<UploaderFile>> {
        output
            .images
            .iter()
            .map(|entry| {
                Ok(UploaderFile {
                    name: entry.filename.clone(),
                    orig_name: Some(entry.filename.clone()),
                    is_file: false,
                    data: self.view_url(entry)?,
                })
            })
            .collect()
    }

    /// `/view` URL for a file the upload widget holds, by name
    pub fn uploader_file_url(&self, file: &UploaderFile, kind: FileKind) -> Result<String> {
        self.file_view_url(&file.name, "", kind)
    }
}
