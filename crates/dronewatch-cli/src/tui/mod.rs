//! dronewatch TUI
//!
//! Terminal dashboard for the detection backend.
//!
//! ## Layout
//!
//! - Header: backend address and poll settings
//! - Status line: outcome of the last command and the current error
//! - Left: latest result and threshold settings
//! - Right: recent events
//!
//! ## Commands
//!
//! - s / x: start / stop the worker
//! - r: refresh now
//! - t: type a threshold draft, + / - to nudge it, a to apply
//! - p / l: poll interval / events limit
//! - ?: help, q: quit
//!
//! Backend commands run on spawned tasks; the loop only redraws when the
//! engine publishes a new snapshot or a key was handled.

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dronewatch_core::{
    ActionDispatcher, Config, HttpRemoteClient, Monitor, Snapshot, SyncEngine,
};

use app::{App, InputAction, InputKind, InputMode, PendingCommand};

/// Threshold step for + / -
const NUDGE_STEP: f64 = 0.01;

/// How long quitting waits for an in-flight refresh
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Poll config changes for the monitor task
enum PollCommand {
    Interval(Duration),
    EventsLimit(u32),
    Shutdown,
}

/// Handles to a monitor running on its own task
struct MonitorHandle {
    engine: SyncEngine<HttpRemoteClient>,
    dispatcher: ActionDispatcher<HttpRemoteClient>,
    snapshot_rx: watch::Receiver<Snapshot>,
    command_tx: mpsc::Sender<PollCommand>,
    task: JoinHandle<()>,
}

/// Run the TUI application
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if DRONEWATCH_LOG is set)
    init_tui_logging(&config);

    let monitor = Monitor::new(
        HttpRemoteClient::new(&config.api_url),
        config.engine_settings(),
    );
    let handle = spawn_monitor(monitor);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(config.api_url.clone(), handle.snapshot_rx.borrow().clone());

    // Run app
    let result = run_app(&mut terminal, &mut app, &handle).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    shutdown_monitor(handle).await;
    result
}

/// Move the monitor onto its own task so reconfiguring never blocks drawing
fn spawn_monitor(mut monitor: Monitor<HttpRemoteClient>) -> MonitorHandle {
    let (command_tx, mut command_rx) = mpsc::channel(16);
    let engine = monitor.engine().clone();
    let dispatcher = monitor.dispatcher();
    let snapshot_rx = monitor.subscribe();

    let task = tokio::spawn(async move {
        monitor.start_polling().await;

        while let Some(command) = command_rx.recv().await {
            match command {
                PollCommand::Interval(interval) => monitor.set_poll_interval(interval).await,
                PollCommand::EventsLimit(limit) => monitor.set_events_limit(limit).await,
                PollCommand::Shutdown => break,
            }
        }

        monitor.shutdown().await;
    });

    MonitorHandle {
        engine,
        dispatcher,
        snapshot_rx,
        command_tx,
        task,
    }
}

async fn shutdown_monitor(handle: MonitorHandle) {
    let _ = handle.command_tx.send(PollCommand::Shutdown).await;
    if tokio::time::timeout(SHUTDOWN_GRACE, handle.task)
        .await
        .is_err()
    {
        warn!("Monitor did not stop within {:?}", SHUTDOWN_GRACE);
    }
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    handle: &MonitorHandle,
) -> Result<()> {
    let mut snapshot_rx = handle.snapshot_rx.clone();
    let mut needs_draw = true;

    loop {
        // Check for status message timeout
        if app.status_message.is_some() {
            app.check_status_timeout();
            needs_draw |= app.status_message.is_none();
        }

        if needs_draw {
            terminal.draw(|frame| ui::draw(frame, app))?;
            needs_draw = false;
        }

        tokio::select! {
            biased;

            // New engine state
            changed = snapshot_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshot_rx.borrow_and_update().clone();
                app.update_snapshot(snapshot);
                needs_draw = true;
            }

            // Poll for terminal events
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                // Check for terminal events (non-blocking)
                if event::poll(Duration::from_millis(0))? {
                    match event::read()? {
                        Event::Key(key) => {
                            // Only handle key press events (not release)
                            if key.kind != KeyEventKind::Press {
                                continue;
                            }
                            needs_draw = true;

                            // If help is showing, any key dismisses it
                            if app.show_help {
                                app.show_help = false;
                                continue;
                            }

                            match app.input_mode {
                                InputMode::Normal => {
                                    handle_normal_mode(app, handle, key.code, key.modifiers).await
                                }
                                InputMode::Input => {
                                    handle_input_mode(app, handle, key.code, key.modifiers).await
                                }
                            }
                        }
                        Event::Resize(_, _) => needs_draw = true,
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
async fn handle_normal_mode(
    app: &mut App,
    handle: &MonitorHandle,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    match code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Worker
        KeyCode::Char('s') => spawn_command(app, handle, PendingCommand::Start),
        KeyCode::Char('x') => spawn_command(app, handle, PendingCommand::Stop),
        KeyCode::Char('r') => spawn_command(app, handle, PendingCommand::Refresh),

        // Threshold
        KeyCode::Char('t') => app.enter_input_mode(InputKind::Threshold),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            handle.engine.nudge_threshold(NUDGE_STEP).await;
        }
        KeyCode::Char('-') => {
            handle.engine.nudge_threshold(-NUDGE_STEP).await;
        }
        KeyCode::Char('a') => spawn_command(app, handle, PendingCommand::Apply),

        // Poll settings
        KeyCode::Char('p') => app.enter_input_mode(InputKind::PollInterval),
        KeyCode::Char('l') => app.enter_input_mode(InputKind::EventsLimit),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle key events while typing a value
async fn handle_input_mode(
    app: &mut App,
    handle: &MonitorHandle,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    match code {
        // Cancel
        KeyCode::Esc => app.exit_input_mode(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_input_mode();
        }

        KeyCode::Enter => match app.submit_input() {
            Some(InputAction::EditThreshold(value)) => {
                handle.engine.edit_threshold(value).await;
            }
            Some(InputAction::SetPollInterval(interval)) => {
                send_poll_command(app, handle, PollCommand::Interval(interval)).await;
            }
            Some(InputAction::SetEventsLimit(limit)) => {
                send_poll_command(app, handle, PollCommand::EventsLimit(limit)).await;
            }
            None => {}
        },

        // Text input
        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),

        _ => {}
    }
}

async fn send_poll_command(app: &mut App, handle: &MonitorHandle, command: PollCommand) {
    if handle.command_tx.send(command).await.is_err() {
        app.set_status("Poll scheduler is not running");
    }
}

/// Run a backend command without blocking the draw loop
///
/// Results (and errors) arrive through the snapshot channel.
fn spawn_command(app: &mut App, handle: &MonitorHandle, command: PendingCommand) {
    app.set_status(command.label());
    let dispatcher = handle.dispatcher.clone();

    tokio::spawn(async move {
        let result = match command {
            PendingCommand::Start => dispatcher.start().await.map(|_| ()),
            PendingCommand::Stop => dispatcher.stop().await.map(|_| ()),
            PendingCommand::Apply => dispatcher.apply_threshold().await.map(|_| ()),
            PendingCommand::Refresh => dispatcher.refresh().await,
        };
        if let Err(e) = result {
            info!("{:?} failed: {}", command, e);
        }
    });
}

/// Initialize file-based logging for TUI mode
///
/// Only logs if DRONEWATCH_LOG is set; never writes to the terminal.
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("DRONEWATCH_LOG") else {
        return;
    };

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "dronewatch_core={},dronewatch={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
