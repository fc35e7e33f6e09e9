use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{BlobUpload, RecordStore, TemplateStore, check_segment, validate_payload};
use crate::binding::Record;
use crate::error::CardsmithError;
use crate::template::{Element, Template, TemplateBundle};

/// JSON files under a root directory.
///
/// ```text
/// <root>/templates/<id>.json           TemplateBundle
/// <root>/records/<namespace>/<id>.json Record
/// <root>/uploads/<folder>/<file>       uploaded bytes
/// ```
///
/// Upload URLs are `<public_base_url>/<folder>/<file>`.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    public_base_url: String,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    fn template_path(&self, id: &str) -> Result<PathBuf, CardsmithError> {
        check_segment("template id", id)?;
        Ok(self.root.join("templates").join(format!("{}.json", id)))
    }

    fn record_path(&self, namespace: &str, id: &str) -> Result<PathBuf, CardsmithError> {
        check_segment("namespace", namespace)?;
        check_segment("record id", id)?;
        Ok(self
            .root
            .join("records")
            .join(namespace)
            .join(format!("{}.json", id)))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, CardsmithError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CardsmithError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[async_trait]
impl TemplateStore for DirStore {
    async fn get_template(&self, id: &str) -> Result<Option<TemplateBundle>, CardsmithError> {
        read_json(&self.template_path(id)?).await
    }

    async fn upsert_template(&self, template: &Template) -> Result<(), CardsmithError> {
        let path = self.template_path(&template.id)?;
        let bundle = match read_json::<TemplateBundle>(&path).await? {
            Some(mut existing) => {
                existing.template = template.clone();
                existing
            }
            None => TemplateBundle::new(template.clone()),
        };
        write_json(&path, &bundle).await
    }

    async fn replace_elements(&self, template_id: &str, elements: &[Element]) -> Result<(), CardsmithError> {
        let path = self.template_path(template_id)?;
        let Some(existing) = read_json::<TemplateBundle>(&path).await? else {
            return Err(CardsmithError::Store(format!(
                "template {} does not exist",
                template_id
            )));
        };
        let bundle = TemplateBundle::from_elements(existing.template, elements.iter().cloned());
        write_json(&path, &bundle).await
    }
}

#[async_trait]
impl RecordStore for DirStore {
    async fn get_record(&self, namespace: &str, id: &str) -> Result<Option<Record>, CardsmithError> {
        read_json(&self.record_path(namespace, id)?).await
    }

    async fn update_field(
        &self,
        namespace: &str,
        id: &str,
        field: &str,
        value: &str,
    ) -> Result<(), CardsmithError> {
        let path = self.record_path(namespace, id)?;
        let Some(mut record) = read_json::<Record>(&path).await? else {
            return Err(CardsmithError::Store(format!("{} {} does not exist", namespace, id)));
        };
        record.insert(field.to_string(), value.into());
        write_json(&path, &record).await
    }
}

#[async_trait]
impl BlobUpload for DirStore {
    async fn upload(&self, bytes: Vec<u8>, folder: &str, file_name: &str) -> Result<String, CardsmithError> {
        check_segment("folder", folder)?;
        check_segment("file name", file_name)?;
        validate_payload(&bytes, file_name)?;

        let dir = self.uploads_dir().join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CardsmithError::Upload(format!("{}: {}", dir.display(), e)))?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| CardsmithError::Upload(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored upload");
        Ok(format!("{}/{}/{}", self.public_base_url, folder, file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::template::{ImageElement, TemplateType, TextElement};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_template_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path(), "https://cdn.example/u/");

        assert!(store.get_template("tpl").await.unwrap().is_none());

        let template = Template::new("tpl", "Certificate", TemplateType::Certificate).background("bg.png");
        store.upsert_template(&template).await.unwrap();
        let elements = vec![
            Element::Image(ImageElement::new("i1", Rect::new(0.0, 0.0, 50.0, 50.0))),
            Element::Text(TextElement::new("t1", Rect::new(10.0, 10.0, 100.0, 30.0))),
        ];
        store.replace_elements("tpl", &elements).await.unwrap();

        let bundle = store.get_template("tpl").await.unwrap().unwrap();
        assert_eq!(bundle.template, template);
        assert_eq!(bundle.elements(), elements);
        assert!(dir.path().join("templates/tpl.json").exists());
    }

    #[tokio::test]
    async fn test_records_and_field_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path(), "https://cdn.example/u");
        let path = dir.path().join("records/artist/a1.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"full_name": "Ann Lee"}"#).unwrap();

        store
            .update_field("artist", "a1", "certificate_url", "https://cdn.example/u/c.jpg")
            .await
            .unwrap();
        let record = store.get_record("artist", "a1").await.unwrap().unwrap();
        assert_eq!(record["full_name"], json!("Ann Lee"));
        assert_eq!(record["certificate_url"], json!("https://cdn.example/u/c.jpg"));

        assert!(store.get_record("artist", "nobody").await.unwrap().is_none());
        assert!(store.update_field("artist", "nobody", "f", "v").await.is_err());
        assert!(store.get_record("../secrets", "a1").await.is_err());
    }

    #[tokio::test]
    async fn test_upload_writes_file_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path(), "https://cdn.example/u/");
        let url = store
            .upload(b"%PDF-1.5 body".to_vec(), "portfolios", "a1.pdf")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/u/portfolios/a1.pdf");
        let stored = std::fs::read(dir.path().join("uploads/portfolios/a1.pdf")).unwrap();
        assert_eq!(stored, b"%PDF-1.5 body");

        assert!(store.upload(b"text".to_vec(), "x", "a.txt").await.is_err());
    }
}
