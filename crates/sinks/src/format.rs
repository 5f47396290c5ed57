//! Record formatting
//!
//! Turns a record into the final text written to a destination. The engine
//! calls the formatter after destination snapshotting and before write
//! dispatch; destinations sharing a flag set share the formatted output.
//!
//! # Example Output
//!
//! ```text
//! 07:34:59.161 [8812:3] error     net: connection refused
//! 07:34:59.164 [8812:3] info      http: listener up on :8443
//! ```

use owo_colors::{OwoColorize, Style};

use fanlog_protocol::{Level, LogRecord, OutputFlags, StyleHint};

/// Produces the byte sequence a destination writes for one record
///
/// Implementations must be pure with respect to the record: the same
/// record, flags, and styling must render identically no matter which
/// worker thread formats it.
pub trait RecordFormatter: Send + Sync {
    /// Render one record under the destination's output flags
    ///
    /// `styled` is true only for console destinations that allow color;
    /// file and syslog output always comes through unstyled.
    fn format(&self, record: &LogRecord, flags: OutputFlags, styled: bool) -> String;
}

/// Default plain-text formatter
///
/// Layout: `HH:MM:SS.mmm [pid:tid] level name: message`, with each field
/// suppressible through [`OutputFlags`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormatter;

impl TextFormatter {
    /// Create the default formatter
    pub const fn new() -> Self {
        Self
    }
}

impl RecordFormatter for TextFormatter {
    fn format(&self, record: &LogRecord, flags: OutputFlags, styled: bool) -> String {
        let styled = styled && record.style() != StyleHint::Plain;
        let styles = Styles::new(styled, record);

        let mut line = String::with_capacity(64 + record.message().len());

        if !flags.contains(OutputFlags::NO_TIMESTAMP) {
            let stamp = if flags.contains(OutputFlags::NO_MILLISECONDS) {
                record.timestamp().format("%H:%M:%S").to_string()
            } else {
                record.timestamp().format("%H:%M:%S%.3f").to_string()
            };
            line.push_str(&format!("{} ", stamp.style(styles.timestamp)));
        }

        let show_pid = !flags.contains(OutputFlags::NO_PID);
        let show_tid = !flags.contains(OutputFlags::NO_TID);
        match (show_pid, show_tid) {
            (true, true) => {
                line.push_str(&format!("[{}:{}] ", record.pid(), record.tid()));
            }
            (true, false) => line.push_str(&format!("[{}] ", record.pid())),
            (false, true) => line.push_str(&format!("[{}] ", record.tid())),
            (false, false) => {}
        }

        if !flags.contains(OutputFlags::NO_LEVEL) {
            let level = format!("{:<9}", record.level().as_str());
            line.push_str(&format!("{} ", level.style(styles.level)));
        }

        if !flags.contains(OutputFlags::NO_NAME) && !record.name().is_empty() {
            line.push_str(&format!("{}: ", record.name().style(styles.name)));
        }

        line.push_str(&format!("{}", record.message().style(styles.message)));
        line.push('\n');
        line
    }
}

// =============================================================================
// Color Styles
// =============================================================================

/// Color styles for terminal output
struct Styles {
    timestamp: Style,
    level: Style,
    name: Style,
    message: Style,
}

impl Styles {
    fn new(enabled: bool, record: &LogRecord) -> Self {
        if !enabled {
            return Self {
                timestamp: Style::new(),
                level: Style::new(),
                name: Style::new(),
                message: Style::new(),
            };
        }

        let level = match record.style() {
            StyleHint::Highlight => level_style(record.level(), true).bold(),
            _ => level_style(record.level(), true),
        };
        let message = match record.style() {
            StyleHint::Highlight => Style::new().bold(),
            _ => Style::new(),
        };

        Self {
            timestamp: Style::new().dimmed(),
            level,
            name: Style::new().dimmed(),
            message,
        }
    }
}

/// Get style for a severity level
pub fn level_style(level: Level, enabled: bool) -> Style {
    if !enabled {
        return Style::new();
    }
    match level {
        Level::Emergency | Level::Alert | Level::Critical => Style::new().bright_red(),
        Level::Error => Style::new().red(),
        Level::Warning => Style::new().yellow(),
        Level::Notice => Style::new().bright_white(),
        Level::Info => Style::new(),
        Level::Debug => Style::new().dimmed(),
    }
}
