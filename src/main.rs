use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use voicedrop::{
    AppState, Config, DeliveryPipeline, FileMicrophone, HttpMessagingClient, Recorder,
    StaticAddress,
};

#[derive(Debug, Parser)]
#[command(name = "voicedrop", about = "Voice memo capture and CRM delivery service")]
struct Args {
    /// Config file (without extension), plus VOICEDROP_* env overrides
    #[arg(long, default_value = "config/voicedrop")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    info!("{} starting", cfg.service.name);

    let microphone = Arc::new(FileMicrophone::from_config(&cfg.capture));
    let api = Arc::new(HttpMessagingClient::new(&cfg.messaging)?);
    let address = Arc::new(StaticAddress::new(cfg.capture.conversation_path.clone()));
    let delivery = DeliveryPipeline::new(api, address);
    let recorder = Arc::new(Recorder::new(microphone, delivery));

    let app = voicedrop::create_router(AppState::new(recorder));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("control surface listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
