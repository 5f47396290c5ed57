//! Per-destination output option flags

bitflags::bitflags! {
    /// Formatting switches applied per destination
    ///
    /// Flags suppress individual fields of the rendered line. A destination
    /// with no flags set gets the full line: timestamp with milliseconds,
    /// level, pid/tid, subsystem name, message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OutputFlags: u32 {
        /// Omit the timestamp entirely
        const NO_TIMESTAMP = 1 << 0;
        /// Keep the timestamp but drop the millisecond part
        const NO_MILLISECONDS = 1 << 1;
        /// Reserved; the default formatter does not emit a hostname
        const NO_HOSTNAME = 1 << 2;
        /// Omit the level name
        const NO_LEVEL = 1 << 3;
        /// Omit the subsystem name
        const NO_NAME = 1 << 4;
        /// Omit the process id
        const NO_PID = 1 << 5;
        /// Omit the thread id
        const NO_TID = 1 << 6;
        /// Skip the header line written when a log file is opened or rolled
        const NO_HEADER = 1 << 7;
        /// Disable color styling (console destinations only)
        const NO_COLOR = 1 << 8;

        /// Message body only; every prefix field suppressed
        const MSG_ONLY = Self::NO_TIMESTAMP.bits()
            | Self::NO_MILLISECONDS.bits()
            | Self::NO_HOSTNAME.bits()
            | Self::NO_LEVEL.bits()
            | Self::NO_NAME.bits()
            | Self::NO_PID.bits()
            | Self::NO_TID.bits();
    }
}
