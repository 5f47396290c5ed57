//! Destination descriptors
//!
//! A [`DestinationSpec`] is everything `register` needs to create a
//! destination: the kind, a level filter, output flags, and a delivery
//! mode. Flags and delivery fall back to per-kind defaults when the
//! caller leaves them unset.

use std::path::PathBuf;

use fanlog_plugin::PluginSink;
use fanlog_protocol::{Level, Levels, OutputFlags};
use fanlog_sinks::{FileOptions, SyslogWriter};

// =============================================================================
// Kind
// =============================================================================

/// What a destination writes to
///
/// Carries the kind-specific state: file destinations their path and open
/// options, syslog and plugin destinations their writer object.
pub enum DestinationKind {
    ConsoleStdout,
    ConsoleStderr,
    File {
        path: PathBuf,
        options: FileOptions,
    },
    Syslog(Box<dyn SyslogWriter>),
    Plugin(Box<dyn PluginSink>),
}

impl DestinationKind {
    /// Short label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::ConsoleStdout => "console-stdout",
            Self::ConsoleStderr => "console-stderr",
            Self::File { .. } => "file",
            Self::Syslog(_) => "syslog",
            Self::Plugin(_) => "plugin",
        }
    }

    /// Delivery mode when the registration does not pick one
    ///
    /// Console writes are cheap and latency-sensitive, so they skip the
    /// queue; everything else is delivered by the workers.
    pub fn default_delivery(&self) -> DeliveryMode {
        match self {
            Self::ConsoleStdout | Self::ConsoleStderr => DeliveryMode::Direct,
            _ => DeliveryMode::Queued,
        }
    }

    /// Output flags when the registration does not pick any
    pub fn default_flags(&self) -> OutputFlags {
        match self {
            // Interactive output stays narrow (no millis, no pid/tid).
            Self::ConsoleStdout | Self::ConsoleStderr => {
                OutputFlags::NO_MILLISECONDS | OutputFlags::NO_PID | OutputFlags::NO_TID
            }
            // Files keep every field.
            Self::File { .. } => OutputFlags::empty(),
            // The syslog binding adds its own envelope.
            Self::Syslog(_) => OutputFlags::MSG_ONLY,
            Self::Plugin(_) => OutputFlags::empty(),
        }
    }

    /// Level filter when the registration does not pick one
    pub fn default_levels(&self) -> Levels {
        match self {
            Self::ConsoleStdout => Levels::below(Level::Error),
            Self::ConsoleStderr => Levels::at_or_above(Level::Error),
            Self::File { .. } => Levels::all(),
            Self::Syslog(_) => Levels::at_or_above(Level::Notice),
            Self::Plugin(sink) => sink.info().levels.unwrap_or_default(),
        }
    }
}

impl std::fmt::Debug for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File { path, .. } => f
                .debug_struct("File")
                .field("path", path)
                .finish_non_exhaustive(),
            Self::Syslog(writer) => f.debug_tuple("Syslog").field(&writer.name()).finish(),
            Self::Plugin(sink) => f.debug_tuple("Plugin").field(&sink.info().name).finish(),
            Self::ConsoleStdout => f.write_str("ConsoleStdout"),
            Self::ConsoleStderr => f.write_str("ConsoleStderr"),
        }
    }
}

// =============================================================================
// Delivery mode
// =============================================================================

/// How records reach a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Written on the producer thread at log time
    Direct,
    /// Written by the worker pool after queueing
    Queued,
}

impl DeliveryMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Queued => "queued",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Spec
// =============================================================================

/// A destination to register
///
/// Built with a kind constructor plus builder methods for the optional
/// pieces. Validation happens in `register`, not here.
///
/// # Example
///
/// ```
/// use fanlog_protocol::{Level, Levels};
/// use fanlog_registry::DestinationSpec;
///
/// let spec = DestinationSpec::file("/var/log/app.log")
///     .with_levels(Levels::at_or_above(Level::Warning));
/// ```
#[derive(Debug)]
pub struct DestinationSpec {
    pub(crate) name: String,
    pub(crate) kind: DestinationKind,
    pub(crate) levels: Option<Levels>,
    pub(crate) flags: Option<OutputFlags>,
    pub(crate) delivery: Option<DeliveryMode>,
}

impl DestinationSpec {
    fn new(name: impl Into<String>, kind: DestinationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            levels: None,
            flags: None,
            delivery: None,
        }
    }

    /// The process standard output stream
    pub fn console_stdout() -> Self {
        Self::new("stdout", DestinationKind::ConsoleStdout)
    }

    /// The process standard error stream
    pub fn console_stderr() -> Self {
        Self::new("stderr", DestinationKind::ConsoleStderr)
    }

    /// An append-mode log file with default rotation
    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(
            name,
            DestinationKind::File {
                path,
                options: FileOptions::appending(),
            },
        )
    }

    /// A log file with explicit open and rotation options
    pub fn file_with_options(path: impl Into<PathBuf>, options: FileOptions) -> Self {
        let mut spec = Self::file(path);
        if let DestinationKind::File { options: slot, .. } = &mut spec.kind {
            *slot = options;
        }
        spec
    }

    /// The host syslog facility, through the given writer
    pub fn syslog(writer: Box<dyn SyslogWriter>) -> Self {
        let name = writer.name().to_string();
        Self::new(name, DestinationKind::Syslog(writer))
    }

    /// An external sink, loaded or in-process
    pub fn plugin(sink: Box<dyn PluginSink>) -> Self {
        let name = sink.info().name.clone();
        Self::new(name, DestinationKind::Plugin(sink))
    }

    /// Override the diagnostic name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the level filter
    #[must_use]
    pub fn with_levels(mut self, levels: Levels) -> Self {
        self.levels = Some(levels);
        self
    }

    /// Set the output flags
    #[must_use]
    pub fn with_flags(mut self, flags: OutputFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Override the kind's default delivery mode
    #[must_use]
    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level filter after defaulting
    pub fn effective_levels(&self) -> Levels {
        self.levels.unwrap_or_else(|| self.kind.default_levels())
    }

    /// Output flags after defaulting
    pub fn effective_flags(&self) -> OutputFlags {
        self.flags.unwrap_or_else(|| self.kind.default_flags())
    }

    /// Delivery mode after defaulting
    pub fn effective_delivery(&self) -> DeliveryMode {
        self.delivery
            .unwrap_or_else(|| self.kind.default_delivery())
    }
}
