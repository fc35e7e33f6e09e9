//! # HTTP Server for Template Editing and Generation
//!
//! Exposes the template store to the designer, a PNG preview endpoint and
//! the generation pipeline.
//!
//! ## Usage
//!
//! ```bash
//! cardsmith serve --listen 0.0.0.0:8080 --data-dir ./data
//! ```
//!
//! | Method | Path | |
//! |--------|------|-|
//! | GET  | `/api/templates/:id` | template with elements |
//! | PUT  | `/api/templates/:id` | save template and elements |
//! | POST | `/api/templates/:id/preview` | PNG render, nothing uploaded |
//! | POST | `/api/fields` | bindable fields for a context |
//! | POST | `/api/generate` | render, upload, persist |
//! | POST | `/api/generate/batch` | the same for several records |
//! | GET  | `/uploads/*path` | uploaded files (directory store) |

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::CardsmithError;
use crate::generate::Generator;
use crate::observe::TracingObserver;
use crate::render::assets::HttpAssetLoader;
use crate::render::font::FontBook;
use crate::store::DirStore;

/// Build the router. Exposed separately from [`serve`] so it can be driven
/// without a socket.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/templates/:id",
            get(handlers::templates::get).put(handlers::templates::put),
        )
        .route(
            "/api/templates/:id/preview",
            post(handlers::templates::preview),
        )
        .route("/api/fields", post(handlers::templates::fields))
        .route("/api/generate", post(handlers::generate::generate))
        .route("/api/generate/batch", post(handlers::generate::batch))
        .route("/uploads/*path", get(handlers::uploads::serve))
        // Templates may inline previews of large backgrounds
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server backed by a directory store.
pub async fn serve(config: AppConfig) -> Result<(), CardsmithError> {
    let server = &config.server;
    let store = Arc::new(DirStore::new(&server.data_dir, &server.public_base_url));
    let fonts = Arc::new(FontBook::from_sources(&config.fonts)?);
    let assets = Arc::new(HttpAssetLoader::with_default_client()?.with_config(&config.assets));

    let generator = Generator::from_store(store.clone(), assets)
        .with_fonts(fonts)
        .with_observer(Arc::new(TracingObserver))
        .with_config(config.generation.clone());
    let state = AppState::new(generator, store.clone())
        .with_uploads_dir(store.uploads_dir());
    let app = router(Arc::new(state));

    tracing::info!(
        listen = %server.listen_addr,
        data_dir = %server.data_dir.display(),
        "Cardsmith HTTP server starting"
    );

    let listener = tokio::net::TcpListener::bind(&server.listen_addr)
        .await
        .map_err(|e| {
            CardsmithError::Transport(format!("Failed to bind to {}: {}", server.listen_addr, e))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| CardsmithError::Transport(format!("Server error: {}", e)))?;

    Ok(())
}
