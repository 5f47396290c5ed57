//! Fanlog - Plugin Subsystem
//!
//! Runtime-loaded sink modules, validated before any of their code runs on
//! the dispatch path.
//!
//! # Overview
//!
//! A plugin is a shared object exporting one entry symbol that returns a
//! fixed capability table. Loading resolves the symbol and checks the
//! table's interface revision and required hooks; a valid module is wrapped
//! as a [`PluginSink`]. The dispatch path treats the result like any other
//! destination; a rejected table means no plugin hook is ever called.
//!
//! In-process sinks can implement [`PluginSink`] directly and skip the
//! loader entirely, which is how embedders and the test suite provide
//! custom destinations.
//!
//! # Writing a Plugin
//!
//! ```rust,ignore
//! use std::os::raw::c_char;
//! use fanlog_plugin::abi::{PluginVTable, PLUGIN_ABI_VERSION};
//!
//! unsafe extern "C" fn write(level: u8, line: *const c_char) -> bool {
//!     // deliver the line somewhere
//!     true
//! }
//!
//! static VTABLE: PluginVTable = PluginVTable {
//!     abi_version: PLUGIN_ABI_VERSION,
//!     name: c"my-sink".as_ptr(),
//!     write: Some(write),
//!     levels: None,
//!     teardown: None,
//! };
//!
//! #[no_mangle]
//! pub extern "C" fn fanlog_plugin_entry() -> *const PluginVTable {
//!     &VTABLE
//! }
//! ```

use fanlog_protocol::{Level, Levels, Result};

/// C ABI: capability table layout and entry symbol
pub mod abi;

/// Module loading and validation
pub mod loader;

pub use loader::LoadedPlugin;

// =============================================================================
// Sink surface
// =============================================================================

/// Identity and declared capabilities of a plugin sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    /// Display name used in diagnostics
    pub name: String,
    /// Levels the plugin asks for; `None` accepts whatever the
    /// registration allows
    pub levels: Option<Levels>,
}

impl PluginInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            levels: None,
        }
    }

    #[must_use]
    pub fn with_levels(mut self, levels: Levels) -> Self {
        self.levels = Some(levels);
        self
    }
}

/// A sink provided by external code
///
/// Implemented by [`LoadedPlugin`] for shared objects and directly by
/// in-process sinks.
pub trait PluginSink: Send + Sync {
    /// Identity and declared capabilities
    fn info(&self) -> PluginInfo;

    /// Deliver one formatted line
    fn write(&self, level: Level, line: &str) -> Result<()>;

    /// Called exactly once when the owning destination is removed, after
    /// its in-flight writes have drained
    fn teardown(&self) {}
}
