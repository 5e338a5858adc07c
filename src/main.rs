use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui;

use drugnet::graph_utils::payload::NetworkPayload;
use drugnet::gui::frontend::ExplorerApp;
use drugnet::persistence::settings::ExplorerConfig;
use drugnet::remote::endpoints::RemoteEndpoints;
use drugnet::remote::offline::OfflineFixture;
use drugnet::remote::OfflineService;

#[derive(Parser, Debug)]
#[command(name = "Drugnet", version, about = "Interactive drug-repurposing network explorer")]
struct Args {
    /// Explorer config (JSON, or RON by extension). Defaults to the per-user config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Offline backend fixture answering mapping, task and overlay requests
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Network to load on start (JSON with `nodes` and `edges`)
    #[arg(long)]
    network: Option<PathBuf>,
    /// Backend base URL used for task and result links
    #[arg(long)]
    backend: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ExplorerConfig::load_from(path)?,
        None => ExplorerConfig::load()?,
    };
    let service = match &args.fixture {
        Some(path) => OfflineService::load_from(path)?,
        None => OfflineService::new(OfflineFixture::default()),
    };
    let endpoints = args.backend.as_deref().map(RemoteEndpoints::new).transpose()?;
    let network: Option<NetworkPayload> = match &args.network {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Some(serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?)
        }
        None => None,
    };

    let title = config.title.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title.clone())
            .with_inner_size([1300.0, 710.0])
            // Provide sensible bounds so the UI stays usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            let mut app = ExplorerApp::new(config, service, endpoints);
            if let Some(payload) = &network {
                app = app.with_network(payload);
            }
            Ok(Box::new(app) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| anyhow::anyhow!("gui failed: {e}"))
}
