//! # Cardsmith - Template Composition & Data-Binding Renderer
//!
//! Cardsmith turns admin-authored layouts (a background plus positioned text
//! and image elements, each optionally bound to record data) into
//! personalized raster images such as artist ID cards and certificates.
//!
//! - **Binding**: `{{namespace.field}}` templates and entry lists resolved
//!   against profile/artist records
//! - **Rendering**: background, image and QR layers, wrapped and aligned text
//! - **Editor**: selection, drag/resize/pan/zoom and property edits
//! - **Generation**: fetch, render, JPEG-encode, upload and persist
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use cardsmith::{
//!     generate::Generator,
//!     render::assets::HttpAssetLoader,
//!     store::DirStore,
//!     template::TemplateType,
//! };
//!
//! # async fn example() -> Result<(), cardsmith::CardsmithError> {
//! let store = Arc::new(DirStore::new("data", "https://cdn.example.com/uploads"));
//! let assets = Arc::new(HttpAssetLoader::with_default_client()?);
//! let generator = Generator::from_store(store, assets);
//!
//! let url = generator
//!     .generate(TemplateType::IdCard, "artist-card", "artist-42")
//!     .await?;
//! println!("ID card at {}", url);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`binding`] | Data context and binding resolution |
//! | [`qr`] | Contact QR payloads |
//! | [`template`] | Template and element model |
//! | [`render`] | Surface, text layout, compositing |
//! | [`editor`] | Interactive editing session |
//! | [`generate`] | End-to-end generation |
//! | [`store`] | Template/record stores and blob upload |
//! | [`server`] | HTTP API |

pub mod binding;
pub mod config;
pub mod editor;
pub mod error;
pub mod generate;
pub mod geometry;
pub mod observe;
pub mod qr;
pub mod render;
pub mod server;
pub mod store;
pub mod template;

// Re-exports for convenience
pub use binding::{BindingConfig, DataContext};
pub use error::CardsmithError;
pub use generate::Generator;
pub use template::{Element, Template, TemplateBundle, TemplateType};
