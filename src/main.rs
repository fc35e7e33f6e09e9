//! # Cardsmith CLI
//!
//! Command-line interface for rendering and generating ID cards and certificates.
//!
//! ## Usage
//!
//! ```bash
//! # Render a template file against inline records to PNG
//! cardsmith render --template card.json --records records.json --out card.png
//!
//! # Generate for a stored record, upload and persist the URL
//! cardsmith generate --type id_card --template tpl-1 --record a1
//!
//! # Serve the HTTP API
//! cardsmith --config cardsmith.json serve --listen 0.0.0.0:8080
//! ```
//!
//! Log verbosity follows `CARDSMITH_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cardsmith::{
    CardsmithError,
    binding::{DataContext, Record},
    config::AppConfig,
    generate::{Generator, encode_jpeg, encode_png},
    observe::TracingObserver,
    render::{Renderer, Surface, assets::HttpAssetLoader, font::FontBook},
    server,
    store::DirStore,
    template::{TemplateBundle, TemplateType},
};

/// Cardsmith - template composition and data-binding renderer
#[derive(Parser, Debug)]
#[command(name = "cardsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory store root (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template file to an image without uploading
    Render {
        /// Template bundle JSON (template, text_elements, image_elements)
        #[arg(long, value_name = "FILE")]
        template: PathBuf,

        /// Records JSON: an object keyed by namespace
        #[arg(long, value_name = "FILE")]
        records: Option<PathBuf>,

        /// Output file; `.jpg`/`.jpeg` encodes JPEG, anything else PNG
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Generate for a stored record, upload and persist the URL
    Generate {
        /// Template type (id_card or certificate)
        #[arg(long = "type", value_name = "TYPE")]
        template_type: String,

        /// Template id
        #[arg(long)]
        template: String,

        /// Target record ids
        #[arg(long = "record", required = true)]
        records: Vec<String>,
    },

    /// Start the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,

        /// Prefix for public URLs of uploaded files
        #[arg(long)]
        public_url: Option<String>,
    },
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CARDSMITH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), CardsmithError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.server.data_dir = dir;
    }

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Render {
            template,
            records,
            out,
        } => runtime.block_on(render(&config, template, records, out)),
        Commands::Generate {
            template_type,
            template,
            records,
        } => {
            let template_type = TemplateType::parse(&template_type).ok_or_else(|| {
                CardsmithError::Config(format!(
                    "Unknown template type '{}' (expected id_card or certificate)",
                    template_type
                ))
            })?;
            runtime.block_on(generate(&config, template_type, &template, &records))
        }
        Commands::Serve { listen, public_url } => {
            if let Some(listen) = listen {
                config.server.listen_addr = listen;
            }
            if let Some(url) = public_url {
                config.server.public_base_url = url;
            }
            runtime.block_on(server::serve(config))
        }
    }
}

async fn render(
    config: &AppConfig,
    template: PathBuf,
    records: Option<PathBuf>,
    out: PathBuf,
) -> Result<(), CardsmithError> {
    let bundle: TemplateBundle = serde_json::from_slice(&std::fs::read(&template)?)?;
    let records: BTreeMap<String, Record> = match records {
        Some(path) => serde_json::from_slice(&std::fs::read(&path)?)?,
        None => BTreeMap::new(),
    };

    let g = &config.generation;
    let mut context = DataContext::new();
    for ns in [&g.linked_namespace, &g.target_namespace] {
        if let Some(record) = records.get(ns.as_str()) {
            context = context.with_namespace(ns.clone(), record.clone());
        }
    }

    // Local images referenced by the template resolve next to it unless a root is configured
    let mut asset_config = config.assets.clone();
    if asset_config.local_root.is_none() {
        let dir = template
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        asset_config.local_root = Some(dir.to_path_buf());
    }
    let assets = HttpAssetLoader::with_default_client()?.with_config(&asset_config);
    let fonts = FontBook::from_sources(&config.fonts)?;
    let renderer = Renderer::new(&assets, &fonts, &TracingObserver).qr_level(g.qr_error_level);
    let (surface, report) = renderer
        .render_bundle(Surface::new(g.default_width, g.default_height), &bundle, &context)
        .await;

    let is_jpeg = out
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    let bytes = if is_jpeg {
        encode_jpeg(surface.image(), g.jpeg_quality, g.max_dimension)?
    } else {
        encode_png(surface.image())?
    };
    std::fs::write(&out, bytes)?;

    println!(
        "Rendered {} ({}x{}, {} images, {} text) to {}",
        bundle.template.name,
        surface.width(),
        surface.height(),
        report.images.len(),
        report.texts.len(),
        out.display()
    );
    Ok(())
}

async fn generate(
    config: &AppConfig,
    template_type: TemplateType,
    template_id: &str,
    records: &[String],
) -> Result<(), CardsmithError> {
    let store = Arc::new(DirStore::new(
        &config.server.data_dir,
        &config.server.public_base_url,
    ));
    let assets = HttpAssetLoader::with_default_client()?.with_config(&config.assets);
    let generator = Generator::from_store(store, Arc::new(assets))
        .with_fonts(Arc::new(FontBook::from_sources(&config.fonts)?))
        .with_config(config.generation.clone());

    let mut failed = 0;
    for item in generator
        .generate_batch(template_type, template_id, records)
        .await
    {
        match item.result {
            Ok(url) => println!("{}: {}", item.record_id, url),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", item.record_id, e);
            }
        }
    }
    if failed > 0 {
        return Err(CardsmithError::Config(format!(
            "{} of {} generations failed",
            failed,
            records.len()
        )));
    }
    Ok(())
}
