//! callwatchd - FastAGI to Slack call notification bridge daemon.

use std::sync::Arc;

use callwatch::config::Config;
use callwatch::handler::Bridge;
use callwatch::listener::Listener;
use callwatch::notify::SlackNotifier;
use callwatch::{http, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "callwatch.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    let token = config.slack.token.clone().ok_or_else(|| {
        anyhow::anyhow!("no Slack token configured: set SLACK_TOKEN or [slack].token")
    })?;

    info!(
        listen = %config.general.listen,
        channel = %config.slack.channel,
        "Starting callwatch"
    );

    // Health/metrics endpoint is optional.
    // Convention: health_port = 0 disables it (used by tests).
    if config.general.health_port == 0 {
        info!("Health endpoint disabled");
    } else {
        metrics::init();
        let port = config.general.health_port;
        tokio::spawn(async move {
            http::run_http_server(port).await;
        });
        info!(port, "Health HTTP server started");
    }

    let notifier = Arc::new(SlackNotifier::new(&config.slack, &token));
    let bridge = Arc::new(Bridge::new(notifier, config.slack.channel.clone()));

    let listener = Listener::bind(config.general.listen, bridge).await?;
    listener.run().await
}
