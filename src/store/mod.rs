//! External collaborators: template storage, record storage and blob upload.
//!
//! The generator and the editor only see these traits. [`MemoryStore`] keeps
//! everything in process (tests, previews); [`DirStore`] persists JSON files
//! and uploads under a root directory.

mod dir;
mod memory;

pub use dir::DirStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::binding::Record;
use crate::error::CardsmithError;
use crate::template::{Element, Template, TemplateBundle};

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// The template with both element sets, or `None` if it does not exist.
    async fn get_template(&self, id: &str) -> Result<Option<TemplateBundle>, CardsmithError>;

    /// Create or update the template row; its elements are untouched.
    async fn upsert_template(&self, template: &Template) -> Result<(), CardsmithError>;

    /// Replace the full element set of a template.
    async fn replace_elements(&self, template_id: &str, elements: &[Element]) -> Result<(), CardsmithError>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, namespace: &str, id: &str) -> Result<Option<Record>, CardsmithError>;

    /// Set one top-level field of an existing record.
    async fn update_field(
        &self,
        namespace: &str,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<(), CardsmithError>;
}

#[async_trait]
pub trait BlobUpload: Send + Sync {
    /// Store `bytes` and return their public URL.
    async fn upload(&self, bytes: Vec<u8>, folder: &str, file_name: &str) -> Result<String, CardsmithError>;
}

/// Accept images and PDF documents, reject anything else.
///
/// Returns the content type used for the stored object.
pub fn validate_payload(bytes: &[u8], file_name: &str) -> Result<String, CardsmithError> {
    if bytes.starts_with(b"%PDF") {
        return Ok("application/pdf".to_string());
    }
    if let Ok(format) = image::guess_format(bytes) {
        return Ok(format.to_mime_type().to_string());
    }
    let guessed = mime_guess::from_path(file_name).first_or_octet_stream();
    Err(CardsmithError::Upload(format!(
        "Unsupported payload for {} ({}): only images and PDF documents are accepted",
        file_name, guessed
    )))
}

/// Reject empty or path-like segments so uploads stay inside their folder.
pub(crate) fn check_segment(kind: &str, value: &str) -> Result<(), CardsmithError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(CardsmithError::Store(format!("Invalid {}: {:?}", kind, value)));
    }
    Ok(())
}
