//! Asset loading: fetches and decodes the images a template references.
//!
//! Loaders are injected into the compositor so the rendering core has no HTTP
//! knowledge. [`HttpAssetLoader`] is the production loader; [`PreloadedAssets`]
//! serves already-decoded images first and only delegates misses.

use async_trait::async_trait;
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::AssetConfig;
use crate::error::CardsmithError;

#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<DynamicImage, CardsmithError>;
}

fn asset_error(url: &str, reason: impl Into<String>) -> CardsmithError {
    CardsmithError::AssetLoad {
        url: url.to_string(),
        reason: reason.into(),
    }
}

struct CachedAsset {
    image: DynamicImage,
    last_accessed: Instant,
}

/// Downloads `http(s)://` URLs and reads `file://` URLs or plain paths
/// below a configured local root.
///
/// Decoded images are cached by URL so a background shared by a batch of
/// renders is fetched once. The cache holds at most `cache_capacity` images
/// and drops any not used for `cache_ttl_secs`.
#[derive(Clone)]
pub struct HttpAssetLoader {
    http_client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedAsset>>>,
    capacity: usize,
    ttl: Duration,
    local_root: Option<PathBuf>,
}

impl HttpAssetLoader {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            capacity: 0,
            ttl: Duration::ZERO,
            local_root: None,
        }
        .with_config(&AssetConfig::default())
    }

    pub fn with_default_client() -> Result<Self, CardsmithError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cardsmith/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CardsmithError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self::new(client))
    }

    pub fn with_config(mut self, config: &AssetConfig) -> Self {
        self.capacity = config.cache_capacity;
        self.ttl = Duration::from_secs(config.cache_ttl_secs);
        self.local_root = config.local_root.clone();
        self
    }

    /// Allow local files below `root`.
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(root.into());
        self
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_cached(&self, url: &str) -> bool {
        self.cache.read().await.contains_key(url)
    }

    async fn cached(&self, url: &str) -> Option<DynamicImage> {
        let now = Instant::now();
        let mut cache = self.cache.write().await;
        let entry = cache.get_mut(url)?;
        if now.duration_since(entry.last_accessed) < self.ttl {
            entry.last_accessed = now;
            return Some(entry.image.clone());
        }
        cache.remove(url);
        None
    }

    async fn remember(&self, url: &str, image: DynamicImage) {
        if self.capacity == 0 {
            return;
        }
        let now = Instant::now();
        let mut cache = self.cache.write().await;
        cache.retain(|_, v| now.duration_since(v.last_accessed) < self.ttl);
        while cache.len() >= self.capacity && !cache.contains_key(url) {
            let Some(oldest) = cache
                .iter()
                .min_by_key(|(_, v)| v.last_accessed)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            cache.remove(&oldest);
        }
        cache.insert(
            url.to_string(),
            CachedAsset {
                image,
                last_accessed: now,
            },
        );
    }

    /// Resolve a local URL to a file below the local root.
    async fn local_path(&self, url: &str) -> Result<PathBuf, CardsmithError> {
        let Some(root) = &self.local_root else {
            return Err(asset_error(url, "local files are disabled"));
        };
        let raw = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| asset_error(url, format!("asset root unavailable: {}", e)))?;
        let path = tokio::fs::canonicalize(root.join(raw))
            .await
            .map_err(|e| asset_error(url, e.to_string()))?;
        if !path.starts_with(&root) {
            return Err(asset_error(url, "outside the asset root"));
        }
        Ok(path)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CardsmithError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .http_client
                .get(url)
                .send()
                .await
                .map_err(|e| asset_error(url, e.to_string()))?;
            if !response.status().is_success() {
                return Err(asset_error(url, format!("HTTP {}", response.status())));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| asset_error(url, format!("Failed to read body: {}", e)))?;
            return Ok(bytes.to_vec());
        }

        let path = self.local_path(url).await?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| asset_error(url, e.to_string()))
    }
}

#[async_trait]
impl AssetLoader for HttpAssetLoader {
    async fn load(&self, url: &str) -> Result<DynamicImage, CardsmithError> {
        if url.trim().is_empty() {
            return Err(asset_error(url, "empty URL"));
        }
        if let Some(image) = self.cached(url).await {
            return Ok(image);
        }

        let bytes = self.fetch_bytes(url).await?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| asset_error(url, format!("Failed to decode image: {}", e)))?;

        self.remember(url, image.clone()).await;
        Ok(image)
    }
}

/// Already-decoded images keyed by URL, with an optional loader for misses.
#[derive(Clone, Default)]
pub struct PreloadedAssets {
    images: HashMap<String, DynamicImage>,
    fallback: Option<Arc<dyn AssetLoader>>,
}

impl PreloadedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(fallback: Arc<dyn AssetLoader>) -> Self {
        Self {
            images: HashMap::new(),
            fallback: Some(fallback),
        }
    }

    pub fn insert(&mut self, url: impl Into<String>, image: DynamicImage) {
        self.images.insert(url.into(), image);
    }

    pub fn with(mut self, url: impl Into<String>, image: DynamicImage) -> Self {
        self.insert(url, image);
        self
    }

    pub fn contains(&self, url: &str) -> bool {
        self.images.contains_key(url)
    }
}

#[async_trait]
impl AssetLoader for PreloadedAssets {
    async fn load(&self, url: &str) -> Result<DynamicImage, CardsmithError> {
        if let Some(image) = self.images.get(url) {
            return Ok(image.clone());
        }
        match &self.fallback {
            Some(loader) => loader.load(url).await,
            None => Err(asset_error(url, "not preloaded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn tiny() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255])))
    }

    #[tokio::test]
    async fn test_preloaded_hit_and_miss() {
        let assets = PreloadedAssets::new().with("bg.png", tiny());
        assert_eq!(assets.load("bg.png").await.unwrap().width(), 3);
        let err = assets.load("other.png").await.unwrap_err();
        assert!(matches!(err, CardsmithError::AssetLoad { .. }));
    }

    #[tokio::test]
    async fn test_preloaded_delegates_misses() {
        let inner: Arc<dyn AssetLoader> = Arc::new(PreloadedAssets::new().with("deep.png", tiny()));
        let assets = PreloadedAssets::with_fallback(inner);
        assert!(assets.load("deep.png").await.is_ok());
    }

    fn loader_in(root: &Path, capacity: usize, ttl_secs: u64) -> HttpAssetLoader {
        HttpAssetLoader::with_default_client().unwrap().with_config(&AssetConfig {
            cache_capacity: capacity,
            cache_ttl_secs: ttl_secs,
            local_root: Some(root.to_path_buf()),
        })
    }

    fn save(path: &Path, color: [u8; 4]) {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba(color)))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[tokio::test]
    async fn test_file_loader_reads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        tiny().save_with_format(&path, ImageFormat::Png).unwrap();

        let loader = loader_in(dir.path(), 8, 600);
        let url = format!("file://{}", path.display());
        let img = loader.load(&url).await.unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(loader.cached_len().await, 1);

        // Plain paths work too, absolute or relative to the root
        assert!(loader.load(&path.display().to_string()).await.is_ok());
        assert!(loader.load("logo.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_local_files_refused_without_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        tiny().save_with_format(&path, ImageFormat::Png).unwrap();

        let loader = HttpAssetLoader::with_default_client().unwrap();
        let err = loader.load(&path.display().to_string()).await.unwrap_err();
        assert!(err.to_string().contains("local files are disabled"), "{}", err);
    }

    #[tokio::test]
    async fn test_local_files_confined_to_root() {
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.png");
        tiny().save_with_format(&secret, ImageFormat::Png).unwrap();

        let root = tempfile::tempdir().unwrap();
        let loader = loader_in(root.path(), 8, 600);
        let err = loader.load(&secret.display().to_string()).await.unwrap_err();
        assert!(err.to_string().contains("outside the asset root"), "{}", err);

        let escape = format!("../{}/secret.png", outside.path().file_name().unwrap().to_string_lossy());
        assert!(matches!(
            loader.load(&escape).await,
            Err(CardsmithError::AssetLoad { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_evicts_least_recently_used() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            save(&dir.path().join(name), [0, 0, 0, 255]);
        }
        let loader = loader_in(dir.path(), 2, 600);

        loader.load("a.png").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        loader.load("b.png").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touch a so b becomes the oldest
        loader.load("a.png").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        loader.load("c.png").await.unwrap();

        assert_eq!(loader.cached_len().await, 2);
        assert!(loader.is_cached("a.png").await);
        assert!(!loader.is_cached("b.png").await);
        assert!(loader.is_cached("c.png").await);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        save(&path, [255, 0, 0, 255]);

        // Zero TTL: nothing outlives its own load
        let loader = loader_in(dir.path(), 8, 0);
        let first = loader.load("avatar.png").await.unwrap().to_rgba8();
        assert_eq!(first.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));

        save(&path, [0, 0, 255, 255]);
        let second = loader.load("avatar.png").await.unwrap().to_rgba8();
        assert_eq!(second.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[tokio::test]
    async fn test_file_loader_errors() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_in(dir.path(), 8, 600);
        assert!(matches!(
            loader.load("").await,
            Err(CardsmithError::AssetLoad { .. })
        ));
        assert!(matches!(
            loader.load("/definitely/not/here.png").await,
            Err(CardsmithError::AssetLoad { .. })
        ));

        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            loader.load(&path.display().to_string()).await,
            Err(CardsmithError::AssetLoad { .. })
        ));
    }
}
