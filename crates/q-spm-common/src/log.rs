// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot and fault trace for the SPM
//!
//! The SPM runs before any clock is configured, so entries are stamped with
//! a monotonically increasing sequence number instead of a timestamp. The
//! trace lives in a fixed ring and survives until the next reset, which is
//! enough for a debugger attached after a fatal halt to read what happened.
//!
//! # Security
//!
//! - Entries are written only by the SPM; no partition can reach the ring
//! - Addresses of secure assets may appear, secrets must not

use core::fmt::{self, Write};
use heapless::String;

/// Maximum trace message length
pub const MAX_LOG_MESSAGE_LEN: usize = 96;

/// Trace ring size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Isolation violations and fatal conditions
    Error = 0,
    /// Conditions that were tolerated but look wrong
    Warn = 1,
    /// Boot milestones
    Info = 2,
    /// Per-partition and per-region detail
    Debug = 3,
}

impl LogLevel {
    /// Get the log level name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    /// Single character tag used in the compact entry form
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trace entry
#[derive(Clone)]
pub struct LogEntry {
    /// Level the entry was recorded at
    pub level: LogLevel,
    /// Position of this entry in the overall trace
    pub seq: u32,
    /// Subsystem that produced the entry
    pub module: &'static str,
    /// Formatted message, truncated to [`MAX_LOG_MESSAGE_LEN`]
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:04} {} [{}] {}",
            self.seq,
            self.level.prefix(),
            self.module,
            self.message
        )
    }
}

/// Writer that fills a bounded string and drops what does not fit.
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Circular trace buffer
pub struct LogBuffer {
    entries: [Option<LogEntry>; LOG_BUFFER_SIZE],
    write_index: usize,
    count: usize,
    next_seq: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Create a new empty trace buffer recording `Info` and above
    #[must_use]
    pub const fn new() -> Self {
        const NONE: Option<LogEntry> = None;
        Self {
            entries: [NONE; LOG_BUFFER_SIZE],
            write_index: 0,
            count: 0,
            next_seq: 0,
            min_level: LogLevel::Info,
        }
    }

    /// Set the minimum log level
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Get the minimum log level
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Check if a log level should be recorded
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    /// Record a formatted message
    pub fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }

        let mut message = String::new();
        let _ = Truncating(&mut message).write_fmt(args);

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        self.entries[self.write_index] = Some(LogEntry {
            level,
            seq,
            module,
            message,
        });
        self.write_index = (self.write_index + 1) % LOG_BUFFER_SIZE;
        if self.count < LOG_BUFFER_SIZE {
            self.count += 1;
        }
    }

    /// Number of entries currently held
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if buffer is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Total entries ever recorded, including overwritten ones
    #[must_use]
    pub const fn recorded(&self) -> u32 {
        self.next_seq
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        if self.count == 0 {
            return None;
        }
        let idx = (self.write_index + LOG_BUFFER_SIZE - 1) % LOG_BUFFER_SIZE;
        self.entries[idx].as_ref()
    }

    /// Check whether any held entry at `level` mentions `needle`
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.iter()
            .any(|e| e.level == level && e.message.as_str().contains(needle))
    }

    /// Iterate over entries (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let start = if self.count < LOG_BUFFER_SIZE {
            0
        } else {
            self.write_index
        };
        (0..self.count).filter_map(move |i| self.entries[(start + i) % LOG_BUFFER_SIZE].as_ref())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Record an error-level trace entry
#[macro_export]
macro_rules! log_error {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Error, $module, format_args!($($arg)*))
    };
}

/// Record a warning trace entry
#[macro_export]
macro_rules! log_warn {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Warn, $module, format_args!($($arg)*))
    };
}

/// Record an informational trace entry
#[macro_export]
macro_rules! log_info {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Info, $module, format_args!($($arg)*))
    };
}

/// Record a debug trace entry
#[macro_export]
macro_rules! log_debug {
    ($buffer:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Debug, $module, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filtering() {
        let mut buf = LogBuffer::new();
        log_debug!(buf, "test", "hidden {}", 1);
        assert!(buf.is_empty());

        buf.set_min_level(LogLevel::Debug);
        log_debug!(buf, "test", "shown {}", 2);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.recorded(), 1);
    }

    #[test]
    fn test_ring_wraps_oldest_first() {
        let mut buf = LogBuffer::new();
        for i in 0..(LOG_BUFFER_SIZE as u32 + 5) {
            log_info!(buf, "ring", "entry {}", i);
        }
        assert_eq!(buf.len(), LOG_BUFFER_SIZE);
        let first = buf.iter().next().map(|e| e.seq);
        assert_eq!(first, Some(5));
        assert_eq!(buf.last().map(|e| e.seq), Some(LOG_BUFFER_SIZE as u32 + 4));
    }

    #[test]
    fn test_long_message_truncated() {
        let mut buf = LogBuffer::new();
        let long = [b'x'; 200];
        let s = core::str::from_utf8(&long).unwrap();
        log_error!(buf, "trunc", "{}", s);
        assert_eq!(buf.last().map(|e| e.message.len()), Some(MAX_LOG_MESSAGE_LEN));
    }

    #[test]
    fn test_contains() {
        let mut buf = LogBuffer::new();
        log_error!(buf, "fault", "MPC fault at {:#x}", 0x5800_7000u32);
        assert!(buf.contains(LogLevel::Error, "MPC fault"));
        assert!(!buf.contains(LogLevel::Info, "MPC fault"));
    }
}
