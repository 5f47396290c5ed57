//! Loading and validation of plugin modules

use std::ffi::{CStr, CString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use libloading::{Library, Symbol};
use tracing::debug;

use fanlog_protocol::{Error, Level, Levels, Result};

use crate::abi::{
    PluginEntryFn, PluginTeardownFn, PluginWriteFn, PLUGIN_ABI_VERSION, PLUGIN_ENTRY_SYMBOL,
};
use crate::{PluginInfo, PluginSink};

/// A plugin module whose capability table passed validation
///
/// Owns the library mapping; the hook pointers below point into it, so the
/// mapping stays alive for as long as any hook can be called. Teardown runs
/// exactly once, either explicitly or on drop.
pub struct LoadedPlugin {
    info: PluginInfo,
    path: PathBuf,
    write_fn: PluginWriteFn,
    teardown_fn: Option<PluginTeardownFn>,
    torn_down: AtomicBool,
    _library: Library,
}

impl LoadedPlugin {
    /// Load a module and validate its capability table
    ///
    /// Fails with `IncompatiblePlugin` when the module cannot be mapped,
    /// lacks the entry symbol, reports a different interface revision, or
    /// omits the write hook. No hook of a rejected module is ever called.
    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path.display().to_string();

        // SAFETY: mapping a module runs its initializers; loading is only
        // requested for modules the host explicitly registers.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            Error::incompatible_plugin(path_str.clone(), format!("cannot load module: {e}"))
        })?;

        let table_ptr = {
            // SAFETY: the symbol is declared with the entry signature; a
            // module exporting something else under this name fails the
            // table validation below before any other hook runs.
            let entry: Symbol<'_, PluginEntryFn> = unsafe { library.get(PLUGIN_ENTRY_SYMBOL) }
                .map_err(|e| {
                    Error::incompatible_plugin(
                        path_str.clone(),
                        format!("entry symbol not found: {e}"),
                    )
                })?;

            // SAFETY: entry takes no arguments and returns a table pointer.
            unsafe { entry() }
        };

        if table_ptr.is_null() {
            return Err(Error::incompatible_plugin(
                path_str,
                "entry returned no capability table",
            ));
        }

        // SAFETY: the pointer is non-null and the table it names must live
        // as long as the mapping, which this struct keeps alive.
        let table = unsafe { &*table_ptr };

        if table.abi_version != PLUGIN_ABI_VERSION {
            return Err(Error::incompatible_plugin(
                path_str,
                format!(
                    "interface revision {} (engine speaks {})",
                    table.abi_version, PLUGIN_ABI_VERSION
                ),
            ));
        }

        let write_fn = table.write.ok_or_else(|| {
            Error::incompatible_plugin(path_str.clone(), "capability table has no write hook")
        })?;

        let name = if table.name.is_null() {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "plugin".to_string())
        } else {
            // SAFETY: a non-null name is NUL-terminated per the table
            // contract; lossy conversion tolerates bad UTF-8.
            unsafe { CStr::from_ptr(table.name) }
                .to_string_lossy()
                .into_owned()
        };

        let levels = match table.levels {
            Some(hook) => {
                // SAFETY: the table passed validation; the hook stays
                // callable while the mapping is alive.
                let bits = unsafe { hook() };
                let set = Levels::from_bits_truncate(bits);
                if set.is_empty() {
                    return Err(Error::incompatible_plugin(
                        path_str,
                        "declares an empty level mask",
                    ));
                }
                Some(set)
            }
            None => None,
        };

        debug!(path = %path_str, name = %name, "loaded plugin module");

        Ok(Self {
            info: PluginInfo { name, levels },
            path: path.to_path_buf(),
            write_fn,
            teardown_fn: table.teardown,
            torn_down: AtomicBool::new(false),
            _library: library,
        })
    }

    /// Path the module was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PluginSink for LoadedPlugin {
    fn info(&self) -> PluginInfo {
        self.info.clone()
    }

    fn write(&self, level: Level, line: &str) -> Result<()> {
        let line = CString::new(line.as_bytes()).map_err(|_| {
            Error::io(
                self.info.name.clone(),
                io::Error::new(io::ErrorKind::InvalidData, "line contains a NUL byte"),
            )
        })?;

        // SAFETY: the hook was validated at load and the mapping is alive
        // while self exists.
        let ok = unsafe { (self.write_fn)(level.as_u8(), line.as_ptr()) };
        if ok {
            Ok(())
        } else {
            Err(Error::io(
                self.info.name.clone(),
                io::Error::other("plugin write hook reported failure"),
            ))
        }
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(hook) = self.teardown_fn {
            debug!(name = %self.info.name, "tearing down plugin");
            // SAFETY: validated hook, live mapping, and the swap above
            // guarantees a single invocation.
            unsafe { hook() };
        }
    }
}

impl Drop for LoadedPlugin {
    fn drop(&mut self) {
        // Covers paths where the owner never tore the plugin down
        // explicitly, such as a failed registration.
        PluginSink::teardown(self);
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.info.name)
            .field("path", &self.path)
            .field("levels", &self.info.levels)
            .finish()
    }
}
