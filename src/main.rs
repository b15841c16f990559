mod api;
mod app;
mod config;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::ApiClient;
use app::{App, Popup};
use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "capboard")]
#[command(version = "0.1.0")]
#[command(about = "A terminal-friendly capability board for consulting practices")]
struct Args {
    /// Print the capability list as JSON (for scripts)
    #[arg(short, long)]
    list: bool,

    /// Register an email against a capability, then exit
    #[arg(long, value_name = "CAPABILITY")]
    register: Option<String>,

    /// Unregister an email from a capability, then exit
    #[arg(long, value_name = "CAPABILITY")]
    unregister: Option<String>,

    /// Email address for --register / --unregister
    #[arg(short, long)]
    email: Option<String>,

    /// Override the configured server URL
    #[arg(short, long)]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(server) = args.server {
        config.server_url = server;
    }

    // Handle CLI-only commands
    if args.list {
        return print_capabilities(&config).await;
    }

    if let Some(capability) = args.register {
        let email = require_email(args.email.as_deref())?;
        return register_once(&config, &capability, email).await;
    }

    if let Some(capability) = args.unregister {
        let email = require_email(args.email.as_deref())?;
        return unregister_once(&config, &capability, email).await;
    }

    // Run TUI
    run_tui(config).await
}

fn require_email(email: Option<&str>) -> Result<&str> {
    email.ok_or_else(|| anyhow::anyhow!("--email is required for this command"))
}

async fn print_capabilities(config: &AppConfig) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;
    let capabilities = client.fetch_capabilities().await?;
    println!("{}", serde_json::to_string(&capabilities)?);
    Ok(())
}

async fn register_once(config: &AppConfig, capability: &str, email: &str) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;
    let message = client.register(capability, email).await?;
    println!("{}", message);
    if config.notifications {
        notify("capboard", &message)?;
    }
    Ok(())
}

async fn unregister_once(config: &AppConfig, capability: &str, email: &str) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;
    let message = client.unregister(capability, email).await?;
    println!("{}", message);
    if config.notifications {
        notify("capboard", &message)?;
    }
    Ok(())
}

async fn run_tui(config: AppConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state and fetch the board before the first draw
    let mut app = App::new(config)?;
    app.load_capabilities().await?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') if app.popup == Popup::None => return Ok(()),
                    KeyCode::Char('c')
                        if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                    {
                        return Ok(())
                    }
                    _ => {
                        // Handle key and catch any errors to prevent crashes
                        if let Err(e) = app.handle_key(key).await {
                            app.set_message(format!("Error: {}", e), app::MessageKind::Error);
                        }
                    }
                },
                Event::Mouse(mouse) => {
                    if matches!(mouse.kind, MouseEventKind::Down(_)) {
                        let size = terminal.size()?;
                        app.handle_click(
                            mouse.column,
                            mouse.row,
                            Rect::new(0, 0, size.width, size.height),
                        );
                    }
                }
                _ => {}
            }
        }

        // Expire the transient banner
        app.tick();
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("address-book-new")
        .show()?;
    Ok(())
}
