//! plandash - terminal product-planning dashboard.
//!
//! Runs the Gantt timeline TUI by default; `proxy` starts the image lookup
//! proxy, `export` and `import` work on the saved planning without a UI.

mod api;
mod app;
mod config;
mod dashboard;
mod holidays;
mod layout;
mod models;
mod proxy;
mod sheet;
mod store;
mod theme;
mod timeline;
mod ui;

use std::io::{self, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use api::{ApiCommand, ApiMessage, ProxyClient};
use app::App;
use config::Config;
use dashboard::Dashboard;
use store::PlanningStore;

/// Input poll timeout, roughly 30 redraws per second
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// How often the worker re-checks the proxy
const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

const LOG_FILE: &str = "plandash.log";

#[derive(Debug, Parser)]
#[command(name = "plandash", version, about = "Product planning dashboard with a Gantt timeline")]
struct Cli {
    /// Config file (defaults to <config dir>/plandash/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the saved planning
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Image proxy used by the dashboard
    #[arg(long)]
    proxy_url: Option<String>,

    /// Group the timeline by brand on start
    #[arg(long)]
    group_by_brand: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the image lookup proxy
    Proxy {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write the saved planning as CSV
    Export {
        /// Output file (defaults to product_planning.csv in the data dir)
        path: Option<PathBuf>,
    },
    /// Append the products of a sheet (CSV or workbook) to the saved planning
    Import { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().ok();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(url) = cli.proxy_url {
        config.proxy_url = url;
    }
    if cli.group_by_brand {
        config.group_by_brand = true;
    }

    match cli.command {
        Some(Command::Proxy { port }) => {
            init_stderr_logging();
            if let Some(port) = port {
                config.proxy.port = port;
            }
            proxy::run(&config.proxy).await
        }
        Some(Command::Export { path }) => {
            init_stderr_logging();
            let store = PlanningStore::new(config.data_dir());
            let dashboard = load_dashboard(&store)?;
            let path = path.unwrap_or_else(|| store.dir().join(app::EXPORT_FILE));
            sheet::export_to_path(&dashboard.products, &path)?;
            println!("Exported {} products to {}", dashboard.products.len(), path.display());
            Ok(())
        }
        Some(Command::Import { path }) => {
            init_stderr_logging();
            let store = PlanningStore::new(config.data_dir());
            let mut dashboard = load_dashboard(&store)?;
            let stamp = chrono::Utc::now().timestamp_millis();
            let products = sheet::import_from_path(&path, stamp)?;
            let count = dashboard.import(products);
            store.save(&dashboard.products, &dashboard.retailers)?;
            println!("Imported {} products from {}", count, path.display());
            Ok(())
        }
        None => {
            let data_dir = config.data_dir();
            let _guard = init_file_logging(&data_dir)?;
            run_tui(config).await
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

/// The TUI owns the terminal, so logs go to a file in the data dir
fn init_file_logging(dir: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn load_dashboard(store: &PlanningStore) -> Result<Dashboard> {
    let saved = store
        .load()
        .with_context(|| format!("Failed to load planning from {}", store.dir().display()))?;
    Ok(Dashboard::from_saved(saved))
}

/// Run the TUI application
async fn run_tui(config: Config) -> Result<()> {
    let store = PlanningStore::new(config.data_dir());
    let dashboard = load_dashboard(&store)?;
    let mut app = App::new(&config, dashboard, store);

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let (api_tx, mut api_rx) = mpsc::channel::<ApiMessage>(32);
    let (cmd_tx, cmd_rx) = mpsc::channel::<ApiCommand>(32);

    let client = ProxyClient::new(config.proxy_url.clone())?;
    let api_task = tokio::spawn(run_api_worker(client, api_tx, cmd_rx));

    info!(proxy = %config.proxy_url, "dashboard started");

    let result = run_event_loop(&mut terminal, &mut app, &mut api_rx, &cmd_tx).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    api_task.abort();

    if app.dirty {
        app.save().context("Failed to save planning on exit")?;
    }

    result
}

async fn lookup_image(client: ProxyClient, tx: mpsc::Sender<ApiMessage>, product_id: String, item_number: String) {
    let message = match client.product_image(&item_number).await {
        Ok(Some(url)) => ApiMessage::ImageFound { product_id, url },
        Ok(None) => ApiMessage::ImageNotFound { product_id },
        Err(e) => {
            warn!(%item_number, error = %e, "image lookup failed");
            ApiMessage::Error(format!("Lookup for {} failed: {}", item_number, e))
        }
    };
    tx.send(message).await.ok();
}

/// Background worker serving image lookups over the proxy
async fn run_api_worker(
    client: ProxyClient,
    tx: mpsc::Sender<ApiMessage>,
    mut rx: mpsc::Receiver<ApiCommand>,
) {
    let mut health = tokio::time::interval(HEALTH_INTERVAL);

    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                match cmd {
                    ApiCommand::LookupImage { product_id, item_number } => {
                        // Lookups run side by side, answers arrive in any order
                        tokio::spawn(lookup_image(client.clone(), tx.clone(), product_id, item_number));
                    }
                    ApiCommand::CheckConnection => {
                        let connected = client.health_check().await.unwrap_or(false);
                        tx.send(ApiMessage::ConnectionStatus(connected)).await.ok();
                    }
                    ApiCommand::Shutdown => {
                        break;
                    }
                }
            }
            _ = health.tick() => {
                let connected = client.health_check().await.unwrap_or(false);
                tx.send(ApiMessage::ConnectionStatus(connected)).await.ok();
            }
            else => break,
        }
    }
}

/// Run the main event loop
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    api_rx: &mut mpsc::Receiver<ApiMessage>,
    cmd_tx: &mpsc::Sender<ApiCommand>,
) -> Result<()> {
    loop {
        app.tick();

        terminal.draw(|frame| ui::render(frame, app))?;

        while let Ok(msg) = api_rx.try_recv() {
            app.handle_api_message(msg);
        }

        if event::poll(FRAME_DURATION)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(cmd) = app.handle_key(key) {
                        if cmd_tx.send(cmd).await.is_err() {
                            error!("api worker is gone");
                        }
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::FocusLost => app.timeline.pointer_left(),
                // Resize: the next draw recomputes the plot
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
