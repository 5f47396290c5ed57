//! Emit macros over [`Engine::log`](crate::Engine::log)
//!
//! Each macro formats its arguments with `format_args!` semantics and
//! stamps the calling module path as the record's subsystem name. The
//! expansion yields the `Result` from [`Engine::log`](crate::Engine::log),
//! so callers can `?` it or discard it with `let _ =`.

/// Log at an explicit level: `emit!(engine, Level::Warning, "{} retries", n)`
#[macro_export]
macro_rules! emit {
    ($engine:expr, $level:expr, $($arg:tt)+) => {
        $engine.log($crate::LogRecord::new(
            $level,
            ::core::module_path!(),
            ::std::format!($($arg)+),
        ))
    };
}

/// Log at [`Level::Debug`](crate::Level::Debug)
#[macro_export]
macro_rules! debug {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Debug, $($arg)+)
    };
}

/// Log at [`Level::Info`](crate::Level::Info)
#[macro_export]
macro_rules! info {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Info, $($arg)+)
    };
}

/// Log at [`Level::Notice`](crate::Level::Notice)
#[macro_export]
macro_rules! notice {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Notice, $($arg)+)
    };
}

/// Log at [`Level::Warning`](crate::Level::Warning)
#[macro_export]
macro_rules! warning {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Warning, $($arg)+)
    };
}

/// Log at [`Level::Error`](crate::Level::Error)
#[macro_export]
macro_rules! error {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Error, $($arg)+)
    };
}

/// Log at [`Level::Critical`](crate::Level::Critical)
#[macro_export]
macro_rules! critical {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Critical, $($arg)+)
    };
}

/// Log at [`Level::Alert`](crate::Level::Alert)
#[macro_export]
macro_rules! alert {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Alert, $($arg)+)
    };
}

/// Log at [`Level::Emergency`](crate::Level::Emergency)
#[macro_export]
macro_rules! emergency {
    ($engine:expr, $($arg:tt)+) => {
        $crate::emit!($engine, $crate::Level::Emergency, $($arg)+)
    };
}
