use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use ddgo::config::Config;
use ddgo::error::ConfigError;
use ddgo::logging;
use ddgo::notify::{Notifier, RateLimiter};
use ddgo::server::{self, AppState};
use ddgo::transport::{MockTransport, RobotWebhookTransport, WebhookTransport};
use ddgo::version::print_version;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Command-line arguments for the relay
///
/// Every robot and rate-limit flag can also be supplied through the
/// environment, and overrides the value from the configuration file.
#[derive(Parser, Debug, Default)]
#[command(
    name = "ddgo",
    about = "Relay HTTP requests to a chat robot webhook under a rate limit",
    disable_version_flag = true
)]
struct Cli {
    /// Address to listen on for HTTP server
    #[arg(short, long, env = "ADDR", value_name = "ADDR", help = "Addr to listen on for HTTP server [default: 0.0.0.0:80]")]
    addr: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file path (TOML format)")]
    config: Option<PathBuf>,

    #[arg(short = 't', long = "robot-token", env = "ROBOT_TOKEN", help = "Robot access token")]
    robot_token: Option<String>,

    #[arg(short = 's', long = "robot-secret", env = "ROBOT_SECRET", help = "Robot secret")]
    robot_secret: Option<String>,

    #[arg(
        short = 'm',
        long = "robot-at-mobiles",
        env = "ROBOT_AT_MOBILES",
        value_delimiter = ',',
        help = "Mobiles mentioned on every message"
    )]
    robot_at_mobiles: Vec<String>,

    /// Accepts `1`/`0`, `yes`/`no` and `on`/`off` as well as `true`/`false`
    #[arg(
        short = 'e',
        long = "robot-at-all",
        env = "ROBOT_AT_ALL",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        help = "Mention everyone on every message"
    )]
    robot_at_all: bool,

    #[arg(long = "robot-webhook-url", env = "ROBOT_WEBHOOK_URL", help = "Robot webhook endpoint")]
    robot_webhook_url: Option<String>,

    #[arg(long = "rate-window-secs", env = "RATE_WINDOW_SECS", help = "Rate limit window in seconds [default: 60]")]
    rate_window_secs: Option<u64>,

    #[arg(long = "rate-max-calls", env = "RATE_MAX_CALLS", help = "Webhook calls allowed per window [default: 20]")]
    rate_max_calls: Option<usize>,

    /// Log messages instead of calling the webhook
    #[arg(long, help = "Log messages instead of calling the webhook")]
    dry_run: bool,

    /// Append log output to this file as well as stderr
    #[arg(long = "log-file", env = "LOG_FILE", value_name = "FILE", help = "Also append logs to this file")]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, help = "Enable verbose logging output (debug level)")]
    verbose: bool,

    #[arg(short = 'v', long = "version", help = "Show version info")]
    version: bool,
}

impl Cli {
    /// Load the configuration file, if any, and apply command-line overrides
    ///
    /// A missing or unreadable file falls back to defaults; a file that
    /// exists but does not parse is an error.
    fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Config::from_file(path) {
                    Ok(config) => config,
                    Err(ConfigError::ReadError(e)) => {
                        warn!("Configuration file not readable ({}), using defaults", e);
                        Config::default()
                    }
                    Err(e) => return Err(e),
                }
            }
            None => Config::default(),
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(addr) = &self.addr {
            config.server.addr = addr.clone();
        }
        if let Some(token) = &self.robot_token {
            config.robot.token = token.clone();
        }
        if let Some(secret) = &self.robot_secret {
            config.robot.secret = secret.clone();
        }
        if !self.robot_at_mobiles.is_empty() {
            config.robot.at_mobiles = self.robot_at_mobiles.clone();
        }
        if self.robot_at_all {
            config.robot.at_all = true;
        }
        if let Some(url) = &self.robot_webhook_url {
            config.robot.webhook_url = url.clone();
        }
        if let Some(window) = self.rate_window_secs {
            config.rate_limit.window_seconds = window;
        }
        if let Some(max_calls) = self.rate_max_calls {
            config.rate_limit.max_calls = max_calls;
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    let addr = config.socket_addr()?;

    let transport: Arc<dyn WebhookTransport> = if cli.dry_run {
        warn!("Dry run: messages will be logged, not sent");
        Arc::new(MockTransport::success())
    } else {
        Arc::new(
            RobotWebhookTransport::new(&config.robot.webhook_url, config.request_timeout())
                .context("Failed to create webhook transport")?,
        )
    };

    let limiter = RateLimiter::new(config.window(), config.rate_limit.max_calls);
    info!(
        "Rate limit: {} webhook calls per {}s",
        limiter.max_calls(),
        config.rate_limit.window_seconds
    );

    let notifier = Notifier::new(limiter, transport, config.notifier_defaults());
    let app = server::router(Arc::new(AppState { notifier }));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting HTTP server on http://{}", addr);

    axum::serve(listener, app).await.context("Server closed unexpectedly")?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        print_version();
        return;
    }

    if let Err(e) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Failed to open log file: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
