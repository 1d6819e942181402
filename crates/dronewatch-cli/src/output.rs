//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use dronewatch_core::view::{self, LatestView, MISSING};
use dronewatch_core::{EventRecord, LatestResult, LogTail, Snapshot};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the latest detection result
    pub fn print_latest(&self, latest: &LatestResult) {
        let projected = view::project(Some(latest), None, &[]);

        match self.format {
            OutputFormat::Human => match &projected.latest {
                LatestView::Empty { reason } => println!("{}", reason.message()),
                LatestView::Populated(panel) => {
                    println!("Detection:  {}", panel.detection);
                    println!("Label:      {}", panel.label);
                    println!("Class:      {}", panel.predicted_class);
                    println!("Confidence: {}", panel.confidence);
                    println!("Threshold:  {}", panel.threshold);
                    println!("Latency:    {}", panel.latency);
                    println!("Input:      {}", panel.input_shape);
                    println!("Time:       {}", panel.timestamp);
                }
            },
            OutputFormat::Json => print_json(latest, true),
            OutputFormat::Quiet => println!("{}", detection_word(&projected.latest)),
        }
    }

    /// Print recent events, newest first
    pub fn print_events(&self, events: &[EventRecord]) {
        match self.format {
            OutputFormat::Human => {
                if events.is_empty() {
                    println!("No events yet.");
                    return;
                }
                let projected = view::project(None, None, events);
                for row in &projected.events {
                    println!(
                        "{:<19}  {:<20}  {:>5}  {:>9}",
                        row.timestamp,
                        truncate(&row.label, 20),
                        row.confidence,
                        row.latency
                    );
                }
                println!("\n{} event(s)", events.len());
            }
            OutputFormat::Json => print_json(&events, true),
            OutputFormat::Quiet => {
                for event in events {
                    println!("{}", event.label.as_deref().unwrap_or(MISSING));
                }
            }
        }
    }

    /// Print the backend's log tail
    pub fn print_logs(&self, logs: &LogTail) {
        match self.format {
            OutputFormat::Human => {
                if let Some(ref file) = logs.file {
                    println!("── {} ──", file);
                }
                if logs.lines.is_empty() {
                    println!("(log is empty)");
                }
                for line in &logs.lines {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => print_json(logs, true),
            OutputFormat::Quiet => {
                for line in &logs.lines {
                    println!("{}", line);
                }
            }
        }
    }

    /// Print one published snapshot as a single line
    pub fn print_snapshot(&self, snapshot: &Snapshot) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", summary_line(snapshot));
                if let Some(ref error) = snapshot.error {
                    eprintln!("⚠ {}", error);
                }
            }
            OutputFormat::Json => print_json(&snapshot_json(snapshot), false),
            OutputFormat::Quiet => println!("{}", detection_word(&snapshot.view.latest)),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// One-line human summary of a snapshot
pub fn summary_line(snapshot: &Snapshot) -> String {
    let latest = match &snapshot.view.latest {
        LatestView::Empty { reason } => reason.message().to_string(),
        LatestView::Populated(panel) => format!(
            "{} {} conf={} thr={} lat={}",
            panel.detection, panel.label, panel.confidence, panel.threshold, panel.latency
        ),
    };

    let mut line = format!("{} | events={}", latest, snapshot.view.events.len());
    if let Some(first) = snapshot.view.events.first() {
        line.push_str(&format!(" last={} @ {}", first.label, first.timestamp));
    }
    line
}

fn snapshot_json(snapshot: &Snapshot) -> serde_json::Value {
    serde_json::json!({
        "latest": snapshot.view.latest,
        "events": snapshot.view.events,
        "draft_threshold": snapshot.draft,
        "confirmed_threshold": snapshot.confirmed,
        "poll_interval_ms": snapshot.poll.interval().as_millis() as u64,
        "events_limit": snapshot.poll.events_limit(),
        "status": snapshot.status,
        "error": snapshot.error,
    })
}

fn detection_word(latest: &LatestView) -> &'static str {
    match latest {
        LatestView::Empty { reason } => reason.as_str(),
        LatestView::Populated(panel) => panel.detection.as_str(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match encoded {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON: {}", e),
    }
}

/// Truncate a string to max chars, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dronewatch_core::{EngineSettings, PollConfig, ViewModel};

    fn snapshot(view: ViewModel) -> Snapshot {
        Snapshot {
            view,
            draft: 0.5,
            confirmed: None,
            poll: PollConfig::default(),
            status: None,
            error: None,
        }
    }

    fn detection() -> LatestResult {
        LatestResult {
            label: Some("DJI".into()),
            confidence: Some(0.91),
            detected: true,
            latency_ms: Some(12.5),
            threshold: Some(0.85),
            ..LatestResult::default()
        }
    }

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_format_predicates() {
        let json = Output::new(OutputFormat::from_flags(true, false));
        assert!(json.is_json());
        assert!(!json.is_quiet());

        let quiet = Output::new(OutputFormat::from_flags(true, true));
        assert!(quiet.is_quiet());
        assert!(!quiet.is_json());

        let human = Output::new(OutputFormat::Human);
        assert!(!human.is_json() && !human.is_quiet());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("ДронДронДрон", 6), "Дро...");
    }

    #[test]
    fn test_summary_line_empty() {
        let snap = snapshot(ViewModel::default());
        assert_eq!(summary_line(&snap), "No data yet | events=0");

        let snap = snapshot(view::project(Some(&LatestResult::no_data()), None, &[]));
        assert!(summary_line(&snap).starts_with("No data yet (press s to start)"));
    }

    #[test]
    fn test_summary_line_detection() {
        let events = vec![EventRecord {
            timestamp: None,
            label: Some("Taranis".into()),
            confidence: Some(0.7),
            latency_ms: None,
        }];
        let snap = snapshot(view::project(Some(&detection()), None, &events));

        assert_eq!(
            summary_line(&snap),
            "DETECTED DJI conf=0.910 thr=0.850 lat=12.5 ms | events=1 last=Taranis @ -"
        );
    }

    #[test]
    fn test_snapshot_json_shape() {
        let settings = EngineSettings::default();
        let mut snap = snapshot(view::project(Some(&detection()), Some(0.85), &[]));
        snap.poll = settings.poll;
        snap.confirmed = Some(0.85);
        snap.error = Some("worker not running".into());

        let json = snapshot_json(&snap);
        assert_eq!(json["latest"]["state"], "populated");
        assert_eq!(json["latest"]["detection"], "DETECTED");
        assert_eq!(json["confirmed_threshold"], 0.85);
        assert_eq!(json["poll_interval_ms"], 800);
        assert_eq!(json["events_limit"], 20);
        assert_eq!(json["error"], "worker not running");
    }

    #[test]
    fn test_detection_word() {
        assert_eq!(detection_word(&ViewModel::default().latest), "no-data");
        let projected = view::project(Some(&detection()), None, &[]);
        assert_eq!(detection_word(&projected.latest), "DETECTED");
    }
}
