use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use sitewright::app::{self, AppState};
use sitewright::imagegen::{FalClient, ImageBackend};
use sitewright::llm::GenerativeBackend;
use sitewright::openrouter::OpenRouterClient;
use sitewright::pipeline::Pipeline;
use sitewright::store::{LocalFsProjectStore, ProjectStore};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    addr: SocketAddr,

    /// Directory for project data and rendered websites.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    // Credentials may live in a local .env; absence is fine.
    let _ = dotenvy::dotenv();

    sitewright::logging::init().context("init logging")?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting sitewright");

    let store: Arc<dyn ProjectStore> = Arc::new(LocalFsProjectStore::new(&args.data_dir));
    let backend: Arc<dyn GenerativeBackend> =
        Arc::new(OpenRouterClient::from_env().context("configure generative backend")?);
    let images = FalClient::from_env().context("configure image backend")?;
    if !images.enabled() {
        tracing::info!("FAL_KEY is not set; image generation is disabled");
    }
    let images: Arc<dyn ImageBackend> = Arc::new(images);

    let pipeline = Arc::new(Pipeline::new(Arc::clone(&store), backend, images));
    let state = AppState { store, pipeline };

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app::router(state)).await?;
    Ok(())
}
