//! Backend Assets - helpers for the backend's file endpoints
//!
//! Builds `/view` and `/upload/image` URLs, converts between result
//! payloads and the upload widget's file records, and re-uploads produced
//! images so they can be used as inputs. The editor core never calls into
//! this crate; hosts use it next to the editor.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod files;

pub use client::{AssetClient, UploadResponse};
pub use endpoint::{BackendEndpoint, DEFAULT_BASE_URL};
pub use error::{AssetError, Result};
pub use files::{FileKind, FileRef, GalleryOutput, GalleryOutputEntry, UploaderFile};
