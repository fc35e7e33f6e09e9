//! # Error Types
//!
//! This module defines error types used throughout the cardsmith library.
//!
//! Binding misses are never errors: an unresolvable field renders as an empty
//! string (or its fallback). Asset load failures are errors at the loader
//! boundary but are absorbed by the compositor, which skips the element.

use std::fmt;

use thiserror::Error;

/// A step of the generation pipeline, attached to fatal errors so callers can
/// tell which stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStep {
    FetchRecord,
    FetchTemplate,
    Encode,
    Upload,
    Persist,
}

impl GenerationStep {
    pub fn name(self) -> &'static str {
        match self {
            GenerationStep::FetchRecord => "fetch_record",
            GenerationStep::FetchTemplate => "fetch_template",
            GenerationStep::Encode => "encode",
            GenerationStep::Upload => "upload",
            GenerationStep::Persist => "persist",
        }
    }
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for cardsmith operations
#[derive(Debug, Error)]
pub enum CardsmithError {
    /// A record or template is missing. Fatal for generation.
    #[error("{what} not found")]
    NotFound { step: GenerationStep, what: String },

    /// The backing store failed while fetching a record or template.
    #[error("Fetch failed at {step}: {reason}")]
    Fetch { step: GenerationStep, reason: String },

    /// A single image asset could not be fetched or decoded.
    #[error("Failed to load asset {url}: {reason}")]
    AssetLoad { url: String, reason: String },

    /// Blob upload rejected or failed.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// The generated URL could not be written back to the record.
    #[error("Persist failed: {0}")]
    Persist(String),

    /// QR payload has no non-empty field to encode.
    #[error("QR payload is empty")]
    EmptyQrPayload,

    /// QR matrix generation failed (data too long, zero size).
    #[error("QR error: {0}")]
    Qr(String),

    /// Editor operation referenced an element id that does not exist.
    #[error("Unknown element: {0}")]
    UnknownElement(String),

    /// Editor operation that does not apply to the element (QR spec on text).
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// Image encoding or decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Backing store failure other than a missing entry.
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration or font file.
    #[error("Config error: {0}")]
    Config(String),

    /// Server bind/serve failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CardsmithError {
    pub fn not_found(step: GenerationStep, what: impl Into<String>) -> Self {
        CardsmithError::NotFound {
            step,
            what: what.into(),
        }
    }

    /// Attribute a store failure to a fetch step. A `NotFound` or `Fetch`
    /// keeps the step it already carries.
    pub fn at_fetch(self, step: GenerationStep) -> Self {
        match self {
            CardsmithError::NotFound { .. } | CardsmithError::Fetch { .. } => self,
            other => CardsmithError::Fetch {
                step,
                reason: other.to_string(),
            },
        }
    }

    /// The generation step this error belongs to, when it has one.
    pub fn step(&self) -> Option<GenerationStep> {
        match self {
            CardsmithError::NotFound { step, .. } | CardsmithError::Fetch { step, .. } => Some(*step),
            CardsmithError::Upload(_) => Some(GenerationStep::Upload),
            CardsmithError::Persist(_) => Some(GenerationStep::Persist),
            CardsmithError::Image(_) => Some(GenerationStep::Encode),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_and_step() {
        let err = CardsmithError::not_found(GenerationStep::FetchTemplate, "template tpl-1");
        assert_eq!(err.to_string(), "template tpl-1 not found");
        assert_eq!(err.step(), Some(GenerationStep::FetchTemplate));
    }

    #[test]
    fn test_upload_and_persist_steps() {
        assert_eq!(
            CardsmithError::Upload("boom".into()).step(),
            Some(GenerationStep::Upload)
        );
        assert_eq!(
            CardsmithError::Persist("boom".into()).step(),
            Some(GenerationStep::Persist)
        );
        assert_eq!(CardsmithError::EmptyQrPayload.step(), None);
    }

    #[test]
    fn test_at_fetch_attributes_store_failures() {
        let err = CardsmithError::Store("db down".into()).at_fetch(GenerationStep::FetchRecord);
        assert_eq!(err.step(), Some(GenerationStep::FetchRecord));
        assert_eq!(err.to_string(), "Fetch failed at fetch_record: Store error: db down");

        let missing = CardsmithError::not_found(GenerationStep::FetchTemplate, "template x")
            .at_fetch(GenerationStep::FetchRecord);
        assert_eq!(missing.step(), Some(GenerationStep::FetchTemplate));
    }
}
