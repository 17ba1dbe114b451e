mod action;
mod app;
mod app_state;
mod callback;
mod component;
mod components;
mod scroll_trigger;
mod theme;
mod widgets;

use timemachine_proto::client::BackendClient;
use timemachine_proto::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_path = timemachine_proto::platform::log_path();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("timemachine log: {}", log_path.display());

    tracing::info!("timemachine starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config unreadable ({:#}), using defaults", e);
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };
    tracing::info!("backend at {}", config.backend.base_url);

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let client = BackendClient::new(&config.backend)?;
    app::App::new(config, client).run().await?;

    Ok(())
}
