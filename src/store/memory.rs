use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{BlobUpload, RecordStore, TemplateStore, check_segment, validate_payload};
use crate::binding::Record;
use crate::error::CardsmithError;
use crate::template::{Element, Template, TemplateBundle};

const MEMORY_BASE_URL: &str = "memory://uploads";

/// One stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub url: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// In-process implementation of every store trait.
///
/// Uploads and record updates can be made to fail on demand to exercise the
/// generator's error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    templates: RwLock<HashMap<String, TemplateBundle>>,
    records: RwLock<HashMap<(String, String), Record>>,
    uploads: RwLock<Vec<StoredBlob>>,
    fail_uploads: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, bundle: TemplateBundle) -> Self {
        self.templates
            .get_mut()
            .insert(bundle.template.id.clone(), bundle);
        self
    }

    pub fn with_record(mut self, namespace: &str, id: &str, record: Record) -> Self {
        self.records
            .get_mut()
            .insert((namespace.to_string(), id.to_string()), record);
        self
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub async fn uploads(&self) -> Vec<StoredBlob> {
        self.uploads.read().await.clone()
    }

    pub async fn record(&self, namespace: &str, id: &str) -> Option<Record> {
        self.records
            .read()
            .await
            .get(&(namespace.to_string(), id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get_template(&self, id: &str) -> Result<Option<TemplateBundle>, CardsmithError> {
        Ok(self.templates.read().await.get(id).cloned())
    }

    async fn upsert_template(&self, template: &Template) -> Result<(), CardsmithError> {
        let mut templates = self.templates.write().await;
        match templates.get_mut(&template.id) {
            Some(bundle) => bundle.template = template.clone(),
            None => {
                templates.insert(template.id.clone(), TemplateBundle::new(template.clone()));
            }
        }
        Ok(())
    }

    async fn replace_elements(&self, template_id: &str, elements: &[Element]) -> Result<(), CardsmithError> {
        let mut templates = self.templates.write().await;
        let Some(bundle) = templates.get_mut(template_id) else {
            return Err(CardsmithError::Store(format!(
                "template {} does not exist",
                template_id
            )));
        };
        *bundle = TemplateBundle::from_elements(bundle.template.clone(), elements.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, namespace: &str, id: &str) -> Result<Option<Record>, CardsmithError> {
        Ok(self.record(namespace, id).await)
    }

    async fn update_field(
        &self,
        namespace: &str,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<(), CardsmithError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(CardsmithError::Store("record store unavailable".into()));
        }
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&(namespace.to_string(), id.to_string())) else {
            return Err(CardsmithError::Store(format!("{} {} does not exist", namespace, id)));
        };
        record.insert(field.to_string(), value.into());
        Ok(())
    }
}

#[async_trait]
impl BlobUpload for MemoryStore {
    async fn upload(&self, bytes: Vec<u8>, folder: &str, file_name: &str) -> Result<String, CardsmithError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(CardsmithError::Upload("blob storage unavailable".into()));
        }
        check_segment("folder", folder)?;
        check_segment("file name", file_name)?;
        let content_type = validate_payload(&bytes, file_name)?;
        let url = format!("{}/{}/{}", MEMORY_BASE_URL, folder, file_name);
        self.uploads.write().await.push(StoredBlob {
            url: url.clone(),
            content_type,
            bytes,
        });
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::template::{TemplateType, TextElement};
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_keeps_elements_and_replace_swaps_them() {
        let store = MemoryStore::new();
        let template = Template::new("tpl", "Card", TemplateType::IdCard);
        store.upsert_template(&template).await.unwrap();

        let text = Element::Text(TextElement::new("t1", Rect::new(0.0, 0.0, 10.0, 10.0)));
        store.replace_elements("tpl", &[text]).await.unwrap();

        let renamed = Template {
            name: "Renamed".into(),
            ..template
        };
        store.upsert_template(&renamed).await.unwrap();

        let bundle = store.get_template("tpl").await.unwrap().unwrap();
        assert_eq!(bundle.template.name, "Renamed");
        assert_eq!(bundle.text_elements.len(), 1);

        store.replace_elements("tpl", &[]).await.unwrap();
        let bundle = store.get_template("tpl").await.unwrap().unwrap();
        assert!(bundle.text_elements.is_empty());
    }

    #[tokio::test]
    async fn test_replace_elements_of_missing_template() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.replace_elements("nope", &[]).await,
            Err(CardsmithError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_update_field() {
        let store = MemoryStore::new().with_record(
            "artist",
            "a1",
            json!({"full_name": "Ann"}).as_object().cloned().unwrap(),
        );
        store
            .update_field("artist", "a1", "id_card_url", "https://x/y.jpg")
            .await
            .unwrap();
        let record = store.record("artist", "a1").await.unwrap();
        assert_eq!(record["id_card_url"], json!("https://x/y.jpg"));

        assert!(store.update_field("artist", "zz", "f", "v").await.is_err());
        store.fail_updates(true);
        assert!(store.update_field("artist", "a1", "f", "v").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_validation_and_failure_switch() {
        let store = MemoryStore::new();
        let url = store
            .upload(b"%PDF-1.4".to_vec(), "portfolios", "a1.pdf")
            .await
            .unwrap();
        assert_eq!(url, "memory://uploads/portfolios/a1.pdf");
        assert!(store.upload(b"plain".to_vec(), "x", "a.txt").await.is_err());

        store.fail_uploads(true);
        assert!(matches!(
            store.upload(b"%PDF".to_vec(), "x", "b.pdf").await,
            Err(CardsmithError::Upload(_))
        ));
        assert_eq!(store.uploads().await.len(), 1);
    }
}
