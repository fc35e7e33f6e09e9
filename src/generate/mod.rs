//! # Generation Orchestrator
//!
//! End-to-end production of a personalized ID card or certificate:
//!
//! 1. fetch the target record and its linked record, concurrently with the template
//! 2. build the data context
//! 3. render onto a surface sized by the background
//! 4. encode as JPEG (off the async runtime)
//! 5. upload, then write the public URL onto the target record
//!
//! Failures of steps 1, 2, 5 abort the run and carry the failing
//! [`GenerationStep`]. A failed upload persists nothing.

pub mod encode;

use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::binding::{DataContext, Record, resolve::scalar_to_string};
use crate::config::GenerationConfig;
use crate::error::{CardsmithError, GenerationStep};
use crate::observe::{Observer, TracingObserver, span};
use crate::render::assets::AssetLoader;
use crate::render::font::FontBook;
use crate::render::{RenderReport, Renderer, Surface};
use crate::store::{BlobUpload, RecordStore, TemplateStore};
use crate::template::{TemplateBundle, TemplateType};

pub use encode::{downscale_dimensions, encode_jpeg, encode_png};

/// Where a secondary upload's URL is written once it succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistTarget {
    pub namespace: String,
    pub record_id: String,
    pub field: String,
}

/// Result of one record in a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub record_id: String,
    pub result: Result<String, CardsmithError>,
}

#[derive(Clone)]
pub struct Generator {
    templates: Arc<dyn TemplateStore>,
    records: Arc<dyn RecordStore>,
    uploads: Arc<dyn BlobUpload>,
    assets: Arc<dyn AssetLoader>,
    fonts: Arc<FontBook>,
    observer: Arc<dyn Observer>,
    config: GenerationConfig,
}

impl Generator {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        records: Arc<dyn RecordStore>,
        uploads: Arc<dyn BlobUpload>,
        assets: Arc<dyn AssetLoader>,
    ) -> Self {
        Self {
            templates,
            records,
            uploads,
            assets,
            fonts: Arc::new(FontBook::new()),
            observer: Arc::new(TracingObserver),
            config: GenerationConfig::default(),
        }
    }

    /// One backend serving all three store roles.
    pub fn from_store<S>(store: Arc<S>, assets: Arc<dyn AssetLoader>) -> Self
    where
        S: TemplateStore + RecordStore + BlobUpload + 'static,
    {
        Self::new(store.clone(), store.clone(), store, assets)
    }

    pub fn with_fonts(mut self, fonts: Arc<FontBook>) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn templates(&self) -> &Arc<dyn TemplateStore> {
        &self.templates
    }

    /// Generate, upload and persist one output. Returns the public URL.
    pub async fn generate(
        &self,
        template_type: TemplateType,
        template_id: &str,
        record_id: &str,
    ) -> Result<String, CardsmithError> {
        let _total = span(self.observer.as_ref(), "generate");
        tracing::info!(
            template = template_id,
            record = record_id,
            kind = template_type.name(),
            "Generating"
        );

        let (context, bundle) = {
            let _s = span(self.observer.as_ref(), "generate.fetch");
            tokio::try_join!(
                self.fetch_context(record_id),
                self.fetch_template(template_type, template_id)
            )?
        };

        let (surface, _) = self.render(&bundle, &context).await;

        let bytes = {
            let _s = span(self.observer.as_ref(), "generate.encode");
            let image = surface.into_image();
            let quality = self.config.jpeg_quality;
            let max_dim = self.config.max_dimension;
            tokio::task::spawn_blocking(move || encode_jpeg(&image, quality, max_dim))
                .await
                .map_err(|e| CardsmithError::Image(format!("Encode task failed: {}", e)))??
        };

        let url = {
            let _s = span(self.observer.as_ref(), "generate.upload");
            let file_name = format!("{}-{}.jpg", record_id, Utc::now().format("%Y%m%d%H%M%S%3f"));
            self.uploads
                .upload(bytes, self.config.folder_for(template_type), &file_name)
                .await
                .map_err(|e| match e {
                    CardsmithError::Upload(_) => e,
                    other => CardsmithError::Upload(other.to_string()),
                })?
        };

        {
            let _s = span(self.observer.as_ref(), "generate.persist");
            self.records
                .update_field(
                    &self.config.target_namespace,
                    record_id,
                    template_type.url_field(),
                    &url,
                )
                .await
                .map_err(|e| CardsmithError::Persist(e.to_string()))?;
        }

        tracing::info!(record = record_id, url = %url, "Generated");
        Ok(url)
    }

    /// Generate for several records one after another. A failing record does
    /// not stop the batch.
    pub async fn generate_batch(
        &self,
        template_type: TemplateType,
        template_id: &str,
        record_ids: &[String],
    ) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(record_ids.len());
        for record_id in record_ids {
            let result = self.generate(template_type, template_id, record_id).await;
            if let Err(e) = &result {
                self.observer
                    .warn(&format!("Batch item {} failed: {}", record_id, e));
            }
            items.push(BatchItem {
                record_id: record_id.clone(),
                result,
            });
        }
        items
    }

    /// Fire-and-forget upload (a portfolio document, say). The outcome is
    /// logged; on success the URL is written to `persist` by a separate update.
    ///
    /// The handle may be dropped; awaiting it yields the URL when everything
    /// succeeded.
    pub fn spawn_secondary_upload(
        &self,
        bytes: Vec<u8>,
        folder: String,
        file_name: String,
        persist: Option<PersistTarget>,
    ) -> JoinHandle<Option<String>> {
        let uploads = self.uploads.clone();
        let records = self.records.clone();
        let observer = self.observer.clone();

        tokio::spawn(async move {
            let url = match uploads.upload(bytes, &folder, &file_name).await {
                Ok(url) => url,
                Err(e) => {
                    observer.warn(&format!("Secondary upload {}/{} failed: {}", folder, file_name, e));
                    return None;
                }
            };
            observer.info(&format!("Secondary upload stored at {}", url));

            if let Some(target) = persist
                && let Err(e) = records
                    .update_field(&target.namespace, &target.record_id, &target.field, &url)
                    .await
            {
                observer.warn(&format!(
                    "Secondary upload URL not saved on {} {}: {}",
                    target.namespace, target.record_id, e
                ));
                return None;
            }
            Some(url)
        })
    }

    /// Render a bundle against a context without uploading anything.
    pub async fn render(&self, bundle: &TemplateBundle, context: &DataContext) -> (Surface, RenderReport) {
        let _s = span(self.observer.as_ref(), "generate.render");
        let surface = Surface::new(self.config.default_width, self.config.default_height);
        Renderer::new(self.assets.as_ref(), &self.fonts, self.observer.as_ref())
            .qr_level(self.config.qr_error_level)
            .render_bundle(surface, bundle, context)
            .await
    }

    /// Render a bundle to PNG bytes, for previews.
    pub async fn render_preview(
        &self,
        bundle: &TemplateBundle,
        context: &DataContext,
    ) -> Result<Vec<u8>, CardsmithError> {
        let (surface, _) = self.render(bundle, context).await;
        let image = surface.into_image();
        tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| CardsmithError::Image(format!("Encode task failed: {}", e)))?
    }

    /// Target record merged over its linked record.
    pub async fn fetch_context(&self, record_id: &str) -> Result<DataContext, CardsmithError> {
        let cfg = &self.config;
        let target = self
            .records
            .get_record(&cfg.target_namespace, record_id)
            .await
            .map_err(|e| e.at_fetch(GenerationStep::FetchRecord))?
            .ok_or_else(|| {
                CardsmithError::not_found(
                    GenerationStep::FetchRecord,
                    format!("{} {}", cfg.target_namespace, record_id),
                )
            })?;

        let linked_id = target
            .get(&cfg.link_field)
            .and_then(scalar_to_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                CardsmithError::not_found(
                    GenerationStep::FetchRecord,
                    format!("{} of {} {}", cfg.link_field, cfg.target_namespace, record_id),
                )
            })?;
        let linked: Record = self
            .records
            .get_record(&cfg.linked_namespace, &linked_id)
            .await
            .map_err(|e| e.at_fetch(GenerationStep::FetchRecord))?
            .ok_or_else(|| {
                CardsmithError::not_found(
                    GenerationStep::FetchRecord,
                    format!("{} {}", cfg.linked_namespace, linked_id),
                )
            })?;

        Ok(DataContext::new()
            .with_namespace(cfg.linked_namespace.clone(), linked)
            .with_namespace(cfg.target_namespace.clone(), target))
    }

    /// The template with its elements. A template of another type counts as missing.
    pub async fn fetch_template(
        &self,
        template_type: TemplateType,
        template_id: &str,
    ) -> Result<TemplateBundle, CardsmithError> {
        let bundle = self
            .templates
            .get_template(template_id)
            .await
            .map_err(|e| e.at_fetch(GenerationStep::FetchTemplate))?;
        match bundle {
            Some(bundle) if bundle.template.template_type == template_type => Ok(bundle),
            _ => Err(CardsmithError::not_found(
                GenerationStep::FetchTemplate,
                format!("{} template {}", template_type.name(), template_id),
            )),
        }
    }
}
