//! Warpdeploy CLI entry point.

use warpdeploy::api::{ApiState, start_http_server};
use warpdeploy::chain::{ChainReader, JsonRpcChain};
use warpdeploy::config::Config;
use warpdeploy::dedup::SeenEvents;
use warpdeploy::deploy::RelayDeployer;
use warpdeploy::feed::{FeedClient, NeynarClient};
use warpdeploy::intake::IntakeManager;
use warpdeploy::intake::poller::{FeedPoller, PollSettings};
use warpdeploy::intake::webhook::WebhookAdapter;
use warpdeploy::ledger::DeploymentLedger;
use warpdeploy::orchestrator::{Orchestrator, OrchestratorSettings};
use warpdeploy::pipeline::{Pipeline, PipelineSettings};
use warpdeploy::storage::{HttpImageFetcher, PinataClient, StorageUploader};

use anyhow::Context as _;
use clap::Parser;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "warpdeploy")]
#[command(about = "Deploys tokens for anyone who mentions the bot on the feed")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?,
        None => Config::load().context("failed to load configuration")?,
    };

    let telemetry = warpdeploy::telemetry::init_tracing(cli.debug, &config.telemetry);
    tracing::info!(
        handle = config.bot_handle(),
        wallet = %config.bot.wallet_address,
        mode = config.intake.mode.as_str(),
        otlp = telemetry.otlp_enabled(),
        "starting warpdeploy"
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!("warpdeploy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let secrets = &config.secrets;

    let feed: Arc<dyn FeedClient> = Arc::new(NeynarClient::new(
        http.clone(),
        config.feed.api_base_url.clone(),
        secrets.neynar_api_key.clone(),
        secrets.signer_uuid.clone(),
    ));
    let uploader = StorageUploader::new(
        Arc::new(HttpImageFetcher::new(
            http.clone(),
            config.storage.fetch_timeout(),
            config.storage.max_image_bytes,
        )),
        Arc::new(PinataClient::new(
            http.clone(),
            config.storage.pin_api_url.clone(),
            secrets.pinata_api_key.clone(),
            secrets.pinata_api_secret.clone(),
        )),
    );
    let deployer = Arc::new(RelayDeployer::new(
        http.clone(),
        &config.deployer.relay_url,
        secrets.deployer_api_key.clone(),
    ));
    let chain: Arc<dyn ChainReader> = Arc::new(JsonRpcChain::new(http, config.chain.rpc_url.clone()));

    let orchestrator = Orchestrator::new(
        deployer,
        uploader,
        feed.clone(),
        DeploymentLedger::new(),
        OrchestratorSettings {
            token_admin: config.bot.wallet_address.clone(),
            handle: config.bot_handle().to_string(),
            network: config.bot.network.clone(),
            links: config.links.clone(),
            confirmation_timeout: config.deployer.confirmation_timeout(),
        },
    );
    let seen = SeenEvents::from_config(&config.dedup);
    let pipeline = Pipeline::new(
        orchestrator,
        seen.clone(),
        feed.clone(),
        chain,
        PipelineSettings {
            handle: config.bot_handle().to_string(),
            wallet: config.bot.wallet_address.clone(),
            network: config.bot.network.clone(),
            image_host_markers: config.storage.image_host_markers.clone(),
            links: config.links.clone(),
        },
    );

    let mut intake = IntakeManager::new();
    let mut webhook_ingress = None;
    if config.intake.mode.webhook_enabled() {
        let adapter = WebhookAdapter::new();
        webhook_ingress = Some(adapter.ingress(seen));
        intake.register(adapter);
    }
    if config.intake.mode.polling_enabled() {
        intake.register(FeedPoller::new(feed, PollSettings::from(&config.intake)));
    }
    let events = intake.start().await.context("failed to start intake")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let state = Arc::new(ApiState::new(
        pipeline.clone(),
        webhook_ingress,
        config.intake.mode,
    ));
    let server = start_http_server(config.server.bind, state, shutdown_rx)
        .await
        .with_context(|| format!("failed to bind HTTP server on {}", config.server.bind))?;

    let consumer = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.run(events).await }
    });

    tracing::info!(adapters = ?intake.adapter_names(), "warpdeploy started");

    tokio::select! {
        _ = consumer => {
            tracing::info!("intake ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    tracing::info!("shutting down...");
    intake.shutdown().await;
    let _ = shutdown_tx.send(true);
    if let Err(error) = server.await {
        tracing::warn!(%error, "HTTP server task failed");
    }

    tracing::info!("warpdeploy stopped");
    telemetry.shutdown();
    Ok(())
}
