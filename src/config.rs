//! Configuration.
//!
//! Everything has a default; a JSON file can override any subset:
//!
//! ```json
//! {
//!   "generation": { "jpeg_quality": 90, "max_dimension": 1600 },
//!   "fonts": [{ "family": "playfair", "path": "fonts/Playfair.ttf" }],
//!   "assets": { "cache_capacity": 32, "local_root": "assets" },
//!   "server": { "listen_addr": "127.0.0.1:8080" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::binding::{ARTIST, PROFILE};
use crate::error::CardsmithError;
use crate::qr::QrErrorLevel;
use crate::template::TemplateType;

/// Generation pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    /// Longest output side; larger renders are downscaled before upload.
    pub max_dimension: Option<u32>,
    /// Surface size when the template has no loadable background.
    pub default_width: u32,
    pub default_height: u32,
    pub qr_error_level: QrErrorLevel,
    /// Namespace of the record a generation targets (and receives the URL).
    pub target_namespace: String,
    /// Namespace of the linked secondary record.
    pub linked_namespace: String,
    /// Field on the target record holding the linked record's id.
    pub link_field: String,
    pub id_card_folder: String,
    pub certificate_folder: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            max_dimension: Some(2000),
            // CR80 card at 300 DPI
            default_width: 1011,
            default_height: 638,
            qr_error_level: QrErrorLevel::M,
            target_namespace: ARTIST.to_string(),
            linked_namespace: PROFILE.to_string(),
            link_field: "user_id".to_string(),
            id_card_folder: "id-cards".to_string(),
            certificate_folder: "certificates".to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn folder_for(&self, template_type: TemplateType) -> &str {
        match template_type {
            TemplateType::IdCard => &self.id_card_folder,
            TemplateType::Certificate => &self.certificate_folder,
        }
    }
}

/// Asset loader limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Decoded images kept at most; the least recently used goes first.
    pub cache_capacity: usize,
    /// Seconds an image stays cached after its last use.
    pub cache_ttl_secs: u64,
    /// Directory `file://` URLs and plain paths may be read from. Unset
    /// means local files are refused.
    pub local_root: Option<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 64,
            cache_ttl_secs: 600,
            local_root: None,
        }
    }
}

/// A TrueType font registered under a family name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSource {
    pub family: String,
    pub path: PathBuf,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Root of the directory store (templates, records, uploads).
    pub data_dir: PathBuf,
    /// Prefix for public URLs of uploaded files.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("data"),
            public_base_url: "http://127.0.0.1:8080/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub fonts: Vec<FontSource>,
    pub assets: AssetConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from a JSON file. Relative font paths and the asset root resolve
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, CardsmithError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CardsmithError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config: AppConfig = serde_json::from_str(&raw).map_err(|e| {
            CardsmithError::Config(format!("Invalid config {}: {}", path.display(), e))
        })?;

        if let Some(base) = path.parent() {
            for font in &mut config.fonts {
                if font.path.is_relative() {
                    font.path = base.join(&font.path);
                }
            }
            if let Some(root) = &mut config.assets.local_root
                && root.is_relative()
            {
                *root = base.join(&*root);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CardsmithError> {
        let g = &self.generation;
        if g.jpeg_quality == 0 || g.jpeg_quality > 100 {
            return Err(CardsmithError::Config(format!(
                "jpeg_quality must be 1..=100, got {}",
                g.jpeg_quality
            )));
        }
        if g.default_width == 0 || g.default_height == 0 {
            return Err(CardsmithError::Config(
                "default canvas size must be positive".to_string(),
            ));
        }
        if g.max_dimension == Some(0) {
            return Err(CardsmithError::Config(
                "max_dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        AppConfig::default().validate().unwrap();
        let g = GenerationConfig::default();
        assert_eq!(g.folder_for(TemplateType::IdCard), "id-cards");
        assert_eq!(g.qr_error_level, QrErrorLevel::M);
        assert!(AppConfig::default().assets.local_root.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cardsmith.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"generation": {{"jpeg_quality": 70}}, "fonts": [{{"family": "serif", "path": "fonts/Serif.ttf"}}], "assets": {{"local_root": "assets"}}}}"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.generation.jpeg_quality, 70);
        assert_eq!(config.generation.default_width, 1011);
        assert_eq!(config.fonts[0].path, dir.path().join("fonts/Serif.ttf"));
        assert_eq!(config.assets.local_root, Some(dir.path().join("assets")));
        assert_eq!(config.assets.cache_capacity, 64);
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let mut config = AppConfig::default();
        config.generation.jpeg_quality = 0;
        assert!(matches!(config.validate(), Err(CardsmithError::Config(_))));
    }
}
