//! # Diagnostics Sink
//!
//! Textual reporting surface for [`crate::scheduler::Scheduler::print_tasks`].
//! Kept deliberately narrow: one method, one line at a time, so a firmware
//! can back it with a UART, a ring buffer, or nothing at all.

use core::fmt;

/// Destination for one formatted diagnostics line at a time.
pub trait DiagnosticsSink {
    fn write_line(&mut self, line: &str);
}

/// A sink that discards everything. Lets a firmware build with statistics
/// enabled but no live output path.
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    #[inline]
    fn write_line(&mut self, _line: &str) {}
}

/// Fixed-capacity line buffer used to format one diagnostics line without
/// allocation. Mirrors the original firmware's fixed-size format buffer,
/// except overflow here is a silent truncation rather than undefined
/// behavior: `write_str` past capacity returns `Err` and callers simply
/// stop appending, keeping whatever prefix was already written.
pub struct LineBuf<const CAP: usize> {
    buf: [u8; CAP],
    len: usize,
}

impl<const CAP: usize> LineBuf<CAP> {
    pub const fn new() -> Self {
        Self {
            buf: [0u8; CAP],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        // Only ever fed valid UTF-8 through `write_str`/`write_fmt`.
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl<const CAP: usize> fmt::Write for LineBuf<CAP> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let available = CAP - self.len;
        let take = bytes.len().min(available);
        self.buf[self.len..self.len + take].copy_from_slice(&bytes[..take]);
        self.len += take;
        if take < bytes.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}
