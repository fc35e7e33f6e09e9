//! # Generation Tests
//!
//! End-to-end runs of the generation pipeline against the in-memory store:
//! fetch, render, encode, upload and persist, plus the failure paths.

use async_trait::async_trait;
use cardsmith::binding::{BindingConfig, BindingEntry, DataContext, Record, Transform};
use cardsmith::error::{CardsmithError, GenerationStep};
use cardsmith::generate::Generator;
use cardsmith::geometry::Rect;
use cardsmith::observe::RecordingObserver;
use cardsmith::qr::QrPayloadSpec;
use cardsmith::render::assets::{AssetLoader, PreloadedAssets};
use cardsmith::render::compositor::ImageOutcome;
use cardsmith::store::MemoryStore;
use cardsmith::template::{ImageElement, Template, TemplateBundle, TemplateType, TextElement};
use image::{DynamicImage, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::{Arc, Mutex};

// ============================================================================
// HELPERS
// ============================================================================

fn record(v: serde_json::Value) -> Record {
    v.as_object().cloned().unwrap()
}

/// Records every URL it is asked for, then delegates.
struct SpyLoader {
    inner: PreloadedAssets,
    requested: Mutex<Vec<String>>,
}

impl SpyLoader {
    fn new(inner: PreloadedAssets) -> Self {
        Self {
            inner,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetLoader for SpyLoader {
    async fn load(&self, url: &str) -> Result<DynamicImage, CardsmithError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.inner.load(url).await
    }
}

fn card_template(background: Option<&str>) -> TemplateBundle {
    let mut template = Template::new("artist-card", "Artist ID", TemplateType::IdCard);
    template.background_image_ref = background.map(str::to_string);
    let mut bundle = TemplateBundle::new(template);

    let mut name = TextElement::new("name", Rect::new(40.0, 300.0, 500.0, 60.0));
    name.binding_config = Some(BindingConfig::Entries(vec![
        BindingEntry::new("profile", "full_name")
            .fallback("Unknown")
            .transform(Transform::Uppercase),
        BindingEntry::new("artist", "specialty"),
    ]));
    bundle.text_elements.push(name);

    let mut qr = ImageElement::new("qr", Rect::new(800.0, 400.0, 180.0, 180.0));
    qr.image_url = "https://cdn.example/never-loaded.png".into();
    qr.qr_payload_spec = Some(QrPayloadSpec::contact());
    bundle.image_elements.push(qr);

    let mut avatar = ImageElement::new("avatar", Rect::new(40.0, 40.0, 200.0, 200.0));
    avatar.binding_config = Some(BindingConfig::Entries(vec![BindingEntry::new("artist", "avatar_url")]));
    bundle.image_elements.push(avatar);

    bundle
}

fn seeded_store(bundle: TemplateBundle) -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_template(bundle)
            .with_record(
                "artist",
                "a1",
                record(json!({
                    "user_id": "u1",
                    "specialty": "Nail art",
                    "avatar_url": "https://cdn.example/avatar.png",
                    "whatsapp_number": "+351 900 000 000"
                })),
            )
            .with_record(
                "profile",
                "u1",
                record(json!({"full_name": "Ann Lee", "city": "Lisbon"})),
            ),
    )
}

fn assets() -> PreloadedAssets {
    PreloadedAssets::new()
        .with(
            "https://cdn.example/bg.png",
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(800, 500, Rgba([250, 240, 230, 255]))),
        )
        .with(
            "https://cdn.example/avatar.png",
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([90, 60, 40, 255]))),
        )
}

// ============================================================================
// SUCCESS PATH
// ============================================================================

#[tokio::test]
async fn test_generate_uploads_and_persists_url() {
    let store = seeded_store(card_template(None));
    let generator = Generator::from_store(store.clone(), Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));

    let url = generator
        .generate(TemplateType::IdCard, "artist-card", "a1")
        .await
        .unwrap();

    assert!(url.starts_with("memory://uploads/id-cards/a1-"));
    assert!(url.ends_with(".jpg"));

    let rec = store.record("artist", "a1").await.unwrap();
    assert_eq!(rec["id_card_url"], json!(url));

    let uploads = store.uploads().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].content_type, "image/jpeg");
    let decoded = image::load_from_memory(&uploads[0].bytes).unwrap();
    // No background: default canvas
    assert_eq!((decoded.width(), decoded.height()), (1011, 638));
}

#[tokio::test]
async fn test_background_sets_output_size() {
    let store = seeded_store(card_template(Some("https://cdn.example/bg.png")));
    let generator = Generator::from_store(store.clone(), Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));

    generator
        .generate(TemplateType::IdCard, "artist-card", "a1")
        .await
        .unwrap();

    let uploads = store.uploads().await;
    let decoded = image::load_from_memory(&uploads[0].bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 500));
}

#[tokio::test]
async fn test_certificate_writes_certificate_field() {
    let mut bundle = card_template(None);
    bundle.template.template_type = TemplateType::Certificate;
    let store = seeded_store(bundle);
    let generator = Generator::from_store(store.clone(), Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));

    let url = generator
        .generate(TemplateType::Certificate, "artist-card", "a1")
        .await
        .unwrap();
    assert!(url.contains("/certificates/"));
    let rec = store.record("artist", "a1").await.unwrap();
    assert_eq!(rec["certificate_url"], json!(url));
    assert!(rec.get("id_card_url").is_none());
}

// ============================================================================
// RENDER CONTENT
// ============================================================================

#[tokio::test]
async fn test_qr_element_never_loads_its_url() {
    let store = seeded_store(card_template(None));
    let spy = Arc::new(SpyLoader::new(assets()));
    let generator = Generator::from_store(store.clone(), spy.clone())
        .with_observer(Arc::new(RecordingObserver::new()));

    let ctx = generator.fetch_context("a1").await.unwrap();
    let bundle = generator
        .fetch_template(TemplateType::IdCard, "artist-card")
        .await
        .unwrap();
    let (_, report) = generator.render(&bundle, &ctx).await;

    assert_eq!(
        report.images,
        vec![
            ImageOutcome::Qr {
                id: "qr".into(),
                payload: "{Name:Ann Lee, Number:+351 900 000 000, City:Lisbon}".into(),
            },
            ImageOutcome::Drawn {
                id: "avatar".into(),
                url: "https://cdn.example/avatar.png".into(),
            },
        ]
    );
    assert_eq!(spy.requested(), vec!["https://cdn.example/avatar.png".to_string()]);
}

#[tokio::test]
async fn test_bound_text_with_fallback() {
    let store = seeded_store(card_template(None));
    let generator = Generator::from_store(store, Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));
    let bundle = generator
        .fetch_template(TemplateType::IdCard, "artist-card")
        .await
        .unwrap();

    let ctx = generator.fetch_context("a1").await.unwrap();
    let (_, report) = generator.render(&bundle, &ctx).await;
    assert_eq!(report.text_for("name"), Some("ANN LEE\nNail art"));

    // No full_name anywhere: the fallback is used, then transformed
    let ctx = DataContext::from_records(record(json!({"city": "Porto"})), Record::new());
    let (_, report) = generator.render(&bundle, &ctx).await;
    assert_eq!(report.text_for("name"), Some("UNKNOWN"));
}

#[tokio::test]
async fn test_missing_asset_is_skipped_with_warning() {
    let store = seeded_store(card_template(None));
    let obs = Arc::new(RecordingObserver::new());
    // Avatar not available
    let generator = Generator::from_store(store.clone(), Arc::new(PreloadedAssets::new()))
        .with_observer(obs.clone());

    let url = generator
        .generate(TemplateType::IdCard, "artist-card", "a1")
        .await
        .unwrap();
    assert!(!url.is_empty());
    let warnings = obs.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("avatar"));
}

// ============================================================================
// FAILURE PATHS
// ============================================================================

#[tokio::test]
async fn test_upload_failure_persists_nothing() {
    let store = seeded_store(card_template(None));
    store.fail_uploads(true);
    let generator = Generator::from_store(store.clone(), Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));

    let err = generator
        .generate(TemplateType::IdCard, "artist-card", "a1")
        .await
        .unwrap_err();
    assert!(matches!(err, CardsmithError::Upload(_)));
    assert_eq!(err.step(), Some(GenerationStep::Upload));

    let rec = store.record("artist", "a1").await.unwrap();
    assert!(rec.get("id_card_url").is_none());
}

#[tokio::test]
async fn test_persist_failure() {
    let store = seeded_store(card_template(None));
    store.fail_updates(true);
    let generator = Generator::from_store(store.clone(), Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));

    let err = generator
        .generate(TemplateType::IdCard, "artist-card", "a1")
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(GenerationStep::Persist));
    // The upload itself went through
    assert_eq!(store.uploads().await.len(), 1);
}

#[tokio::test]
async fn test_missing_inputs_are_not_found() {
    let store = seeded_store(card_template(None));
    let generator = Generator::from_store(store.clone(), Arc::new(assets()))
        .with_observer(Arc::new(RecordingObserver::new()));

    let err = generator
        .generate(TemplateType::IdCard, "artist-card", "nobody")
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(GenerationStep::FetchRecord));

    let err = generator
        .generate(TemplateType::IdCard, "no-such-template", "a1")
        .await
        .unwrap_err();
    assert_eq!(err.step(), Some(GenerationStep::FetchTemplate));
    assert_eq!(err.to_string(), "id_card template no-such-template not found");

    let err = generator
        .generate(TemplateType::Certificate, "artist-card", "a1")
        .await
        .unwrap_err();
    assert!(matches!(err, CardsmithError::NotFound { .. }));

    assert!(store.uploads().await.is_empty());
}
