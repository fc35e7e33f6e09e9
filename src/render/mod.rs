//! # Rendering Module
//!
//! Turns a template plus a data context into a raster surface.
//!
//! ## Modules
//!
//! - [`surface`]: RGBA drawing surface with source-over blending
//! - [`color`]: CSS-style color parsing
//! - [`font`]: TrueType and bitmap faces
//! - [`text`]: Word wrap, alignment and text drawing
//! - [`assets`]: Image loading (HTTP, files, preloaded)
//! - [`compositor`]: Background and image layers, QR substitution
//! - [`orchestrator`]: Layer ordering for a whole template
//!
//! ## Usage Example
//!
//! ```no_run
//! use cardsmith::binding::DataContext;
//! use cardsmith::observe::TracingObserver;
//! use cardsmith::render::{assets::PreloadedAssets, font::FontBook, orchestrator::Renderer, surface::Surface};
//! use cardsmith::template::{Template, TemplateType};
//!
//! # async fn example() {
//! let assets = PreloadedAssets::new();
//! let fonts = FontBook::new();
//! let renderer = Renderer::new(&assets, &fonts, &TracingObserver);
//! let template = Template::new("t1", "Artist card", TemplateType::IdCard);
//!
//! let surface = renderer
//!     .render(Surface::new(1011, 638), &template, &[], &[], &DataContext::new())
//!     .await;
//! assert_eq!(surface.dimensions(), (1011, 638));
//! # }
//! ```

pub mod assets;
pub mod color;
pub mod compositor;
pub mod font;
pub mod orchestrator;
pub mod surface;
pub mod text;

pub use orchestrator::{RenderReport, Renderer};
pub use surface::Surface;
