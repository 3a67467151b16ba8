//! HTTP client for moving files between backend areas

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::endpoint::BackendEndpoint;
use crate::error::{AssetError, Result};
use crate::files::{FileKind, GalleryOutputEntry};

/// Form field the upload endpoint reads the image from
const IMAGE_FIELD: &str = "image";

/// Reply of the image upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Name the server stored the file under
    pub name: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "input_kind")]
    pub kind: FileKind,
}

fn input_kind() -> FileKind {
    FileKind::Input
}

impl UploadResponse {
    /// The entry for the uploaded file
    pub fn entry(&self) -> GalleryOutputEntry {
        GalleryOutputEntry::new(&self.name, &self.subfolder, self.kind)
    }
}

/// Talks to the backend's file endpoints
#[derive(Debug, Clone)]
pub struct AssetClient {
    http_client: reqwest::Client,
    endpoint: BackendEndpoint,
}

impl AssetClient {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Fetch a file from the backend
    pub async fn fetch(&self, entry: &GalleryOutputEntry) -> Result<Vec<u8>> {
        let url = self.endpoint.view_url(entry)?;
        log::debug!("Fetching {}", url);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AssetError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Copy a backend file into the input area so it can feed another node.
    ///
    /// Downloads the file from `/view` and posts it back to `/upload/image`.
    pub async fn upload_image(&self, entry: &GalleryOutputEntry) -> Result<UploadResponse> {
        let bytes = self.fetch(entry).await?;
        let form = Form::new().part(IMAGE_FIELD, Part::bytes(bytes).file_name(entry.filename.clone()));

        let url = self.endpoint.upload_image_url();
        let response = self.http_client.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            return Err(AssetError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        log::info!("Uploaded {} as {}", entry.filename, uploaded.name);
        Ok(uploaded)
    }
}

impl Default for AssetClient {
    fn default() -> Self {
        Self::new(BackendEndpoint::default())
    }
}
