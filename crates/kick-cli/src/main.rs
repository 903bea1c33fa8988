mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use kick_api::state::{AdminCredentials, AppState};
use kick_core::settings::parse_channel_lines;
use kick_core::{
    ChannelStatus, HttpLoader, NotificationDispatcher, Notifier, NotifyError, Snapshot, Tracker,
    TrackerConfig, TrackerSettings, UpdateScheduler, WebhookConfig, WebhookNotifier,
};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        VERSION
    } else {
        // Called once; lives for the program's lifetime.
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// Kick live tracker: poll channels, publish a dashboard, announce go-lives.
#[derive(Parser)]
#[command(name = "kick-tracker", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the tracker with the HTTP API server.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the JSON settings file. Overrides config file.
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Track channels from the command line (no API server).
    Watch {
        /// Channels as `username` or `username|Display Name`.
        #[arg(required = true)]
        channels: Vec<String>,

        /// Refresh interval in milliseconds (minimum 3000).
        #[arg(long, default_value_t = 10_000)]
        refresh_interval: u64,

        /// Optional webhook URL to announce go-lives to.
        #[arg(long)]
        webhook_url: Option<String>,

        /// Log every failed lookup.
        #[arg(long, default_value_t = false)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            config,
            settings,
        } => {
            run_serve(listen, config, settings).await;
        }
        Commands::Watch {
            channels,
            refresh_interval,
            webhook_url,
            debug,
        } => {
            fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .init();
            run_watch(channels, refresh_interval, webhook_url, debug).await;
        }
    }
}

async fn run_serve(
    listen_override: Option<SocketAddr>,
    config_path: Option<PathBuf>,
    settings_override: Option<PathBuf>,
) {
    let mut app_config = if let Some(ref path) = config_path {
        match config::AppConfig::load(path) {
            Ok(c) => {
                init_tracing(&c.server.log_format);
                tracing::info!(path = %path.display(), "Loaded config file");
                c
            }
            Err(e) => {
                init_tracing("pretty");
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        }
    } else {
        init_tracing("pretty");
        config::AppConfig::default()
    };

    app_config.apply_env(|key| std::env::var(key).ok());
    if let Err(e) = app_config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let listen = listen_override.unwrap_or(app_config.server.listen);
    let settings_path = settings_override.unwrap_or_else(|| app_config.tracker.settings_path.clone());

    let settings = match TrackerSettings::load(&settings_path) {
        Ok(s) => {
            tracing::info!(
                path = %settings_path.display(),
                channels = s.channels().len(),
                refresh_ms = s.refresh_interval,
                "Loaded tracker settings"
            );
            s
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load tracker settings");
            std::process::exit(1);
        }
    };

    let tracker_config = app_config.tracker.to_tracker_config();
    let shared_client = match HttpLoader::build_client(tracker_config.request_timeout) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let loader = Arc::new(HttpLoader::from_config_with_client(
        &tracker_config,
        shared_client.clone(),
    ));
    let dispatcher =
        NotificationDispatcher::from_webhooks(app_config.webhook.clone(), shared_client);
    if dispatcher.is_enabled() {
        tracing::info!(count = app_config.webhook.len(), "Webhook notifications enabled");
    } else {
        tracing::warn!("No webhook configured, go-live notifications are disabled");
    }

    let tracker = Arc::new(Tracker::new(settings, tracker_config, loader, dispatcher));
    let scheduler = Arc::new(UpdateScheduler::new(tracker));

    let mut state = AppState::new(Arc::clone(&scheduler)).with_settings_path(&settings_path);
    match app_config.admin.password {
        Some(ref password) => {
            state = state.with_admin(AdminCredentials::new(&app_config.admin.username, password));
        }
        None => tracing::warn!("No admin password configured, admin routes are disabled"),
    }

    let period = scheduler.start().await;
    tracing::info!(period_ms = period.as_millis() as u64, "Tracker started");

    tracing::info!(%listen, "Starting Kick tracker API server");
    if let Err(e) = kick_api::serve_with_state(listen, state, kick_api::shutdown_signal()).await {
        tracing::error!(error = %e, "Server failed");
        scheduler.stop().await;
        std::process::exit(1);
    }

    tracing::info!("Shutdown signal received, stopping tracker...");
    scheduler.stop().await;
    tracing::info!("Shutdown complete");
}

/// Prints each go-live above the status panel.
struct ConsoleNotifier {
    multi: MultiProgress,
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn target(&self) -> &str {
        "console"
    }

    async fn notify(&self, channel: &ChannelStatus) -> Result<(), NotifyError> {
        let ts = chrono::Local::now().format("%H:%M:%S");
        let viewers = channel
            .viewer_count
            .map(|v| format!("{v} viewers"))
            .unwrap_or_default();
        self.multi
            .println(format!(
                "  {}  {} {:<20} {}  {}",
                style(ts).dim(),
                style("LIVE").green().bold(),
                style(&channel.display_name).bold(),
                channel.title.as_deref().unwrap_or(""),
                style(viewers).dim()
            ))
            .ok();
        Ok(())
    }
}

async fn run_watch(
    channels: Vec<String>,
    refresh_interval: u64,
    webhook_url: Option<String>,
    debug: bool,
) {
    let settings = TrackerSettings::new(parse_channel_lines(&channels.join("\n")))
        .with_refresh_interval(refresh_interval)
        .with_debug(debug);
    if let Err(e) = settings.validate() {
        eprintln!("{} {}", style("error:").red().bold(), e);
        std::process::exit(2);
    }

    let config = TrackerConfig::default();
    let client = match HttpLoader::build_client(config.request_timeout) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    let multi = MultiProgress::new();
    let msg_style = ProgressStyle::with_template("{wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let mut sinks: Vec<Arc<dyn Notifier>> = vec![Arc::new(ConsoleNotifier {
        multi: multi.clone(),
    })];
    if let Some(ref url) = webhook_url {
        sinks.push(Arc::new(WebhookNotifier::new(
            WebhookConfig::new(url.clone()),
            client.clone(),
        )));
    }

    let period_ms = settings.effective_interval().as_millis();
    let channel_count = settings.channels().len();

    let loader = Arc::new(HttpLoader::from_config_with_client(&config, client));
    let tracker = Arc::new(Tracker::new(
        settings,
        config,
        loader,
        NotificationDispatcher::new(sinks),
    ));
    let scheduler = UpdateScheduler::new(Arc::clone(&tracker));

    multi
        .println(format!(
            "{} {}",
            style("kick-tracker").bold(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
    multi
        .println(format!("  {} {}", style("channels:").dim(), channel_count))
        .ok();
    multi
        .println(format!("  {} {}ms", style("refresh: ").dim(), period_ms))
        .ok();
    if let Some(ref wh) = webhook_url {
        multi
            .println(format!("  {} {}", style("webhook: ").dim(), wh))
            .ok();
    }
    multi.println("").ok();
    multi
        .println(format!("{}", style("Press Ctrl+C to stop").dim()))
        .ok();
    multi.println("").ok();

    let status_bar = multi.add(ProgressBar::new_spinner().with_style(msg_style));
    status_bar.set_message(format!(
        "{}\n  {}",
        format_separator(0),
        style("Waiting for first update...").dim()
    ));

    scheduler.start().await;

    let mut last_version = 0u64;
    let shutdown = kick_api::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(250)) => {}
            _ = &mut shutdown => {
                status_bar.finish_and_clear();
                multi.println(format!("\n{}", style("Tracker stopped.").dim())).ok();
                scheduler.stop().await;
                return;
            }
        }

        let snapshot = tracker.snapshot();
        if snapshot.version() == last_version {
            continue;
        }
        last_version = snapshot.version();
        status_bar.set_message(render_panel(&snapshot));
    }
}

fn render_panel(snapshot: &Snapshot) -> String {
    let mut lines = vec![format_separator(snapshot.version())];
    lines.push(format!(
        "  {} live of {}  {}",
        style(snapshot.live_count()).green().bold(),
        snapshot.total_count(),
        style(snapshot.generated_at().with_timezone(&chrono::Local).format("%H:%M:%S")).dim()
    ));

    for c in snapshot.channels() {
        let badge = if c.fetch_failed {
            style("ERR ").red().bold()
        } else if c.is_live {
            style("LIVE").green().bold()
        } else {
            style("off ").dim()
        };
        let viewers = c
            .viewer_count
            .filter(|_| c.is_live)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let title = if c.is_live {
            c.title.as_deref().unwrap_or("")
        } else {
            ""
        };
        lines.push(format!(
            "  {} {:<24} {:>7}  {}",
            badge,
            c.display_name,
            viewers,
            style(title).dim()
        ));
    }

    lines.join("\n")
}

fn format_separator(cycle: u64) -> String {
    let label = if cycle == 0 {
        String::new()
    } else {
        format!(" update {} ", cycle)
    };
    let width = 54usize.saturating_sub(label.len());
    format!(
        "{}{}{}",
        style("──").dim(),
        style(label).dim().bold(),
        style("─".repeat(width)).dim()
    )
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
