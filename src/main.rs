use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use social_notifications::config::{AppConfig, CliConfig, FileConfig};
use social_notifications::notifications::badge_label;
use social_notifications::surfaces::{NotificationLine, NotificationsPage};
use social_notifications::toast::{Toast, ToastKind};
use social_notifications::{
    Collaborators, HttpNotificationsClient, NotificationCenter, NotificationSession,
    NotificationSnapshot, ToastBus, WsPushChannel,
};

/// How many entries are printed on every change.
const PRINTED_ENTRIES: usize = 5;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override flags.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Backend root URL (e.g. http://localhost:8000).
    #[clap(long)]
    pub api_url: Option<String>,

    /// WebSocket URL of the push channel. Derived from --api-url if omitted.
    #[clap(long)]
    pub ws_url: Option<String>,

    /// Bearer token of the logged-in user.
    #[clap(long)]
    pub token: Option<String>,

    /// Id of the logged-in user.
    #[clap(long)]
    pub user_id: Option<i64>,

    /// Number of notifications fetched by the bell dropdown.
    #[clap(long)]
    pub bell_limit: Option<usize>,

    /// Number of notifications fetched by the notifications page.
    #[clap(long)]
    pub page_limit: Option<usize>,

    /// Timeout in seconds for REST requests.
    #[clap(long)]
    pub timeout_sec: Option<u64>,

    /// Mark everything read right after loading.
    #[clap(long)]
    pub mark_all_read: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            api_url: self.api_url.clone(),
            ws_url: self.ws_url.clone(),
            auth_token: self.token.clone(),
            user_id: self.user_id,
            bell_fetch_limit: self.bell_limit,
            page_fetch_limit: self.page_limit,
            request_timeout_sec: self.timeout_sec,
        }
    }
}

fn print_snapshot(snapshot: &NotificationSnapshot) {
    let badge = badge_label(snapshot.unread_count).unwrap_or_else(|| "-".to_string());
    println!("[{}] {} notifications", badge, snapshot.notifications.len());

    let now = Utc::now();
    for notification in snapshot.notifications.iter().take(PRINTED_ENTRIES) {
        let line = NotificationLine::new(notification, now);
        let marker = if line.unread { "*" } else { " " };
        println!("{} {} {} ({})", marker, line.icon, line.message, line.age);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Using backend at {}", config.api_url);
    info!("Push channel at {}", config.ws_url);

    let http = Arc::new(
        HttpNotificationsClient::new(
            config.api_url.clone(),
            config.auth_token.clone(),
            config.request_timeout_sec,
        )
        .context("Failed to create HTTP client")?,
    );
    let push = Arc::new(WsPushChannel::new(
        config.ws_url.clone(),
        config.auth_token.clone(),
    ));
    let collaborators = Collaborators {
        fetcher: http.clone(),
        push,
        receipts: http,
    };

    let toasts = ToastBus::new();
    let _toast_printer = toasts.subscribe(Arc::new(|toast: &Toast| match toast.kind {
        ToastKind::Error => eprintln!("! {}", toast.message),
        _ => println!("> {}", toast.message),
    }));

    let center = Arc::new(NotificationCenter::new());
    let mut session = NotificationSession::start(
        center.clone(),
        collaborators,
        toasts.clone(),
        config.session_settings(),
        config.user_id,
    )
    .await
    .context("Failed to start notification session")?;

    let mut page = NotificationsPage::new();
    if let Err(e) = page.open(&session).await {
        warn!("Initial load failed, waiting for pushes: {}", e);
    }
    // Only takes effect when the page load above failed
    if let Err(e) = session.sync_unread_count().await {
        warn!("Could not sync unread count: {}", e);
    }

    if cli_args.mark_all_read {
        if let Some(remote) = page.mark_all_read(&session) {
            let _ = remote.await;
            toasts.success("All notifications marked as read");
        }
    }

    let mut updates = center.subscribe();
    print_snapshot(&updates.borrow_and_update());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, ending session");
                break;
            }
            _ = session.push_closed() => {
                error!("Push channel closed, ending session");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
        }
    }

    session.end();
    Ok(())
}
