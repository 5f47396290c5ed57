//! C ABI shared between the engine and plugin modules

use std::os::raw::c_char;

/// Interface revision this engine speaks
///
/// A module built against a different revision is rejected at load time;
/// its hooks are never called.
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Exported entry symbol every plugin module must define
pub const PLUGIN_ENTRY_SYMBOL: &[u8] = b"fanlog_plugin_entry\0";

/// Required write hook: delivers one formatted, NUL-terminated line at
/// the given level. Returns `false` to report failure.
pub type PluginWriteFn = unsafe extern "C" fn(level: u8, line: *const c_char) -> bool;

/// Optional level mask query, returning [`fanlog_protocol::Levels`] bits
pub type PluginLevelsFn = unsafe extern "C" fn() -> u8;

/// Optional teardown hook, called once before the module is released
pub type PluginTeardownFn = unsafe extern "C" fn();

/// Capability table a plugin's entry point returns
///
/// The table must outlive the module mapping; a static is the usual way.
/// `Option<fn>` is the nullable function pointer: `None` marks an absent
/// optional hook.
#[repr(C)]
pub struct PluginVTable {
    /// Must equal [`PLUGIN_ABI_VERSION`]
    pub abi_version: u32,
    /// Plugin name as NUL-terminated UTF-8; null falls back to the file stem
    pub name: *const c_char,
    /// Write hook; a table without one fails validation
    pub write: Option<PluginWriteFn>,
    /// Level mask query; null accepts whatever the registration allows
    pub levels: Option<PluginLevelsFn>,
    /// Teardown hook; null skips the call
    pub teardown: Option<PluginTeardownFn>,
}

/// Signature of [`PLUGIN_ENTRY_SYMBOL`]
pub type PluginEntryFn = unsafe extern "C" fn() -> *const PluginVTable;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_symbol_is_nul_terminated() {
        assert_eq!(PLUGIN_ENTRY_SYMBOL.last(), Some(&0u8));
    }

    #[test]
    fn test_abi_version() {
        assert_eq!(PLUGIN_ABI_VERSION, 1);
    }

    #[test]
    fn test_optional_hooks_are_pointer_sized() {
        // The C side models an absent hook as a null pointer; the niche
        // optimization must keep Option<fn> the size of the pointer itself.
        assert_eq!(
            std::mem::size_of::<Option<PluginWriteFn>>(),
            std::mem::size_of::<usize>()
        );
        assert_eq!(
            std::mem::size_of::<Option<PluginTeardownFn>>(),
            std::mem::size_of::<usize>()
        );
    }
}
