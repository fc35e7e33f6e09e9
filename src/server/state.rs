//! Server state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::generate::Generator;
use crate::store::TemplateStore;

/// Application state shared across handlers.
pub struct AppState {
    pub generator: Generator,
    pub templates: Arc<dyn TemplateStore>,
    /// Served under `/uploads` when set.
    pub uploads_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(generator: Generator, templates: Arc<dyn TemplateStore>) -> Self {
        Self {
            generator,
            templates,
            uploads_dir: None,
        }
    }

    pub fn with_uploads_dir(mut self, dir: PathBuf) -> Self {
        self.uploads_dir = Some(dir);
        self
    }
}
