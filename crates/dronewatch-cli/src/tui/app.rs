//! Application state and logic

use std::time::{Duration, Instant};

use dronewatch_core::models::{MAX_EVENTS_LIMIT, MIN_POLL_INTERVAL};
use dronewatch_core::Snapshot;

/// How long a local status message stays visible
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal key-command mode
    Normal,
    /// Typing a value on the bottom line
    Input,
}

/// What the input line is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Threshold draft
    Threshold,
    /// Poll interval in milliseconds
    PollInterval,
    /// Events per refresh
    EventsLimit,
}

impl InputKind {
    /// Prompt shown before the input text
    pub fn prompt(&self) -> &'static str {
        match self {
            InputKind::Threshold => "threshold: ",
            InputKind::PollInterval => "poll interval (ms): ",
            InputKind::EventsLimit => "events limit: ",
        }
    }
}

/// Result of submitting the input line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputAction {
    /// Replace the threshold draft (may be NaN; rejected on apply)
    EditThreshold(f64),
    SetPollInterval(Duration),
    SetEventsLimit(u32),
}

/// Command running in the background, shown until the snapshot reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommand {
    Start,
    Stop,
    Apply,
    Refresh,
}

impl PendingCommand {
    pub fn label(&self) -> &'static str {
        match self {
            PendingCommand::Start => "Starting worker...",
            PendingCommand::Stop => "Stopping worker...",
            PendingCommand::Apply => "Applying threshold...",
            PendingCommand::Refresh => "Refreshing...",
        }
    }
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// What the input line edits
    pub input_kind: Option<InputKind>,
    /// Input buffer
    pub input: String,
    /// Cursor position in input (chars)
    pub input_cursor: usize,
    /// Backend address shown in the header
    pub api_url: String,
    /// Latest published engine state
    pub snapshot: Snapshot,
    /// Local message (input errors, pending commands)
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Whether help overlay is visible
    pub show_help: bool,
}

impl App {
    pub fn new(api_url: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            input_kind: None,
            input: String::new(),
            input_cursor: 0,
            api_url: api_url.into(),
            snapshot,
            status_message: None,
            status_message_time: None,
            show_help: false,
        }
    }

    /// Replace the snapshot; a command result supersedes a pending message
    pub fn update_snapshot(&mut self, snapshot: Snapshot) {
        if snapshot.status != self.snapshot.status || snapshot.error != self.snapshot.error {
            self.status_message = None;
            self.status_message_time = None;
        }
        self.snapshot = snapshot;
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Open the input line, pre-filled with the current value
    pub fn enter_input_mode(&mut self, kind: InputKind) {
        self.input_mode = InputMode::Input;
        self.input_kind = Some(kind);
        self.input = match kind {
            InputKind::Threshold if self.snapshot.draft.is_finite() => {
                format!("{:.3}", self.snapshot.draft)
            }
            InputKind::Threshold => String::new(),
            InputKind::PollInterval => self.snapshot.poll.interval().as_millis().to_string(),
            InputKind::EventsLimit => self.snapshot.poll.events_limit().to_string(),
        };
        self.input_cursor = self.input.chars().count();
    }

    /// Exit input mode
    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_kind = None;
        self.input.clear();
        self.input_cursor = 0;
    }

    /// Parse the input line and leave input mode
    ///
    /// Invalid input sets a status message and yields nothing.
    pub fn submit_input(&mut self) -> Option<InputAction> {
        let kind = self.input_kind?;
        let result = parse_input(kind, &self.input);
        self.exit_input_mode();

        match result {
            Ok(action) => Some(action),
            Err(message) => {
                self.set_status(message);
                None
            }
        }
    }

    /// Insert character at cursor
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.input_cursor);
        self.input.insert(at, c);
        self.input_cursor += 1;
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let at = self.byte_index(self.input_cursor);
            self.input.remove(at);
        }
    }

    /// Move cursor left
    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    /// Move cursor right
    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

/// Interpret input for the given field
pub fn parse_input(kind: InputKind, text: &str) -> Result<InputAction, String> {
    let text = text.trim();
    match kind {
        // Unparseable text becomes NaN so apply reports it
        InputKind::Threshold => Ok(InputAction::EditThreshold(
            text.parse::<f64>().unwrap_or(f64::NAN),
        )),
        InputKind::PollInterval => {
            let ms: u64 = text
                .parse()
                .map_err(|_| format!("Poll interval must be whole milliseconds (got '{}')", text))?;
            let interval = Duration::from_millis(ms);
            if interval < MIN_POLL_INTERVAL {
                return Err(format!(
                    "Poll interval must be at least {} ms",
                    MIN_POLL_INTERVAL.as_millis()
                ));
            }
            Ok(InputAction::SetPollInterval(interval))
        }
        InputKind::EventsLimit => match text.parse::<u32>() {
            Ok(limit) if (1..=MAX_EVENTS_LIMIT).contains(&limit) => {
                Ok(InputAction::SetEventsLimit(limit))
            }
            _ => Err(format!(
                "Events limit must be between 1 and {} (got '{}')",
                MAX_EVENTS_LIMIT, text
            )),
        },
    }
}
