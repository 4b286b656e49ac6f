// src/main.rs
use std::error::Error;
use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CEvent, KeyEvent, KeyEventKind};
use crossterm::{execute, terminal::{EnterAlternateScreen, LeaveAlternateScreen}};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter, prelude::*, Registry};

mod api;
mod app;
mod config;
mod form;
mod i18n;
mod model;
mod query;
mod ui;

use api::{SettingsClient, bootstrap, delete_secret, fetch_secrets, save_secret};
use app::{App, Command};
use config::Config;
use model::AppEvent;
use query::SECRETS_QUERY_KEY;
use ui::draw_ui;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::load();

    // initialize tracing to file only when --debug is passed
    if config.debug {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let fmt_layer = fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_target(false);
        Registry::default().with(filter).with(fmt_layer).init();
        info!("Tracing initialized to {} (debug)", config.log_file);
    }

    info!("Starting settings TUI against {}", config.api_url);

    let client = Arc::new(SettingsClient::new(&config.api_url, config.api_key.clone())?);
    let mut app = App::new(config.integrations_url());

    // Terminal setup
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    crossterm::terminal::enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Channel for background tasks -> UI
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    tokio::spawn(bootstrap(client.clone(), tx.clone()));

    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        // Refetch whenever the secrets entry is missing or invalidated
        if app.secrets.begin_fetch(SECRETS_QUERY_KEY) {
            debug!("Dispatching secrets fetch");
            tokio::spawn(fetch_secrets(client.clone(), tx.clone()));
        }

        if last_tick.elapsed() >= tick_rate {
            if app.is_busy() {
                app.throbber_state.calc_next();
            }
            terminal.draw(|f| draw_ui(f, &mut app)).ok();
            last_tick = Instant::now();
        }

        // Drain background events
        while let Ok(ev) = rx.try_recv() {
            match ev {
                AppEvent::ConfigLoaded(config) => {
                    debug!("ConfigLoaded: {:?}", config.app_mode);
                    app.config = Some(config);
                }
                AppEvent::ProvidersLoaded(providers) => {
                    debug!("ProvidersLoaded: {} provider(s)", providers.len());
                    app.providers = providers;
                }
                AppEvent::SecretsLoaded(secrets) => {
                    debug!("SecretsLoaded ({} items)", secrets.len());
                    app.on_secrets_loaded(secrets);
                }
                AppEvent::SecretsFetchFailed(e) => {
                    warn!("Secrets fetch failed: {}", e);
                    app.secrets.fetch_failed(SECRETS_QUERY_KEY);
                    app.message = Some(format!("Failed to load secrets: {}", e));
                }
                AppEvent::DeleteSettled { name, result } => {
                    app.on_delete_settled(&name, &result);
                    match result {
                        Ok(()) => app.message = Some(format!("Deleted '{}'", name)),
                        Err(e) => {
                            warn!("Delete of '{}' failed: {}", name, e);
                            app.message = Some(format!("Failed to delete '{}': {}", name, e));
                        }
                    }
                }
                AppEvent::SecretSaved(name) => {
                    info!("Secret '{}' saved", name);
                    app.on_secret_saved(&name);
                }
                AppEvent::SecretSaveFailed(e) => {
                    warn!("Secret save failed: {}", e);
                    app.on_secret_save_failed(e);
                }
                AppEvent::Message(msg) => {
                    warn!("Background message: {}", msg);
                    app.message = Some(msg);
                }
            }
        }

        // Input handling
        if event::poll(Duration::from_millis(20))? {
            if let CEvent::Key(KeyEvent { code, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(code) {
                    Some(Command::Quit) => break,
                    Some(Command::DeleteSecret(name)) => {
                        tokio::spawn(delete_secret(client.clone(), tx.clone(), name));
                    }
                    Some(Command::SaveSecret(req)) => {
                        tokio::spawn(save_secret(client.clone(), tx.clone(), req));
                    }
                    None => {}
                }
            }
        }
    }

    // Cleanup
    crossterm::terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("Exiting settings TUI");
    Ok(())
}
