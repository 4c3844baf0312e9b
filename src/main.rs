// ABOUTME: Main entry point for the commonbot Slack bridge
// ABOUTME: Initializes logging and config, resolves the bot identity, and serves Socket Mode

use anyhow::{Context, Result};
use clap::Parser;
use commonbot::{
    config::{Config, LoggingConfig},
    platform::{SlackAdapter, SlackApiClient, SlackPlatform},
    ChatContextData, Listener, Matcher, OutboundMessage, OutboundSender, Route,
};
use commonbot_core::PlatformClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser)]
#[command(name = "commonbot")]
#[command(about = "Slack event normalization and dispatch bridge", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file to load instead of searching the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(
    logging: &LoggingConfig,
    json: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = logging.log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, &logging.file_prefix);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(console)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

/// Replies "pong" when someone writes `@<bot> ping`.
fn echo_listener(sender: OutboundSender) -> Listener {
    let ping = Matcher::new(|ctx: &ChatContextData| {
        ctx.message_text()
            .is_some_and(|t| ctx.bot().is_mentioned_in(t) && t.contains("ping"))
    })
    .handler(move |ctx: Arc<ChatContextData>| {
        let sender = sender.clone();
        async move {
            let report = sender
                .send(&ctx, vec![OutboundMessage::plain_text("pong")])
                .await;
            if report.failed > 0 {
                anyhow::bail!("failed to deliver pong to {}", ctx.channel_id());
            }
            Ok(())
        }
    });

    Listener::new("echo").matcher(ping)
}

/// Logs every interactive event until a plugin installs its own route.
fn logging_route() -> Route {
    Route::new("log-events", |ctx: Arc<ChatContextData>| async move {
        if let Some(event) = ctx.event() {
            tracing::info!(
                plugin_id = %event.plugin_id,
                action_id = %event.action.id,
                action_type = ?event.action.action_type,
                user_id = %ctx.user_id(),
                channel_id = %ctx.channel_id(),
                "Interactive event received"
            );
        }
        Ok(())
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _log_guard = init_logging(&config.logging, cli.json_logs)?;

    tracing::info!("Starting commonbot");

    let slack = config.require_slack()?;

    tracing::info!(
        platform = %config.platform.platform_type,
        log_dir = %config.logging.log_dir().display(),
        allowed_users = slack.allowed_users.len(),
        allowed_channels = slack.allowed_channels.len(),
        "Configuration loaded"
    );

    let api = Arc::new(SlackApiClient::new(&slack.bot_token)?);
    let bot = api.bot_identity().await?;
    let http_client = api.http_client();
    let client: Arc<dyn PlatformClient> = api;

    let adapter = SlackAdapter::new(&config, Arc::clone(&client), bot)?
        .with_listener(echo_listener(OutboundSender::new(Arc::clone(&client))));
    adapter.router().set_active(logging_route());

    let platform = SlackPlatform::new(http_client, &slack.app_token, Arc::new(adapter));

    tokio::select! {
        result = platform.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}
