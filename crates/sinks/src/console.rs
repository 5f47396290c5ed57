//! Console output
//!
//! Thin writers over the process stdout/stderr handles. Locking the std
//! handle per write keeps concurrent lines whole; ordering across threads
//! is whatever the callers' own serialization provides.

use std::io::Write;

/// Which console handle a destination writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleStream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl ConsoleStream {
    /// Get the string name of this stream
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }

    /// Write one formatted line to the stream
    ///
    /// The text is expected to be newline-terminated; stdout flushes on
    /// newline, stderr is unbuffered.
    pub fn write(self, text: &str) -> std::io::Result<()> {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())
            }
            Self::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(text.as_bytes())
            }
        }
    }
}

impl std::fmt::Display for ConsoleStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
