// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Support for debug output during boot.
//!
//! Boot code calls `debug!` just like `println!`:
//!
//! ```rust,ignore
//! use kernel::debug;
//!
//! debug!("Protection policy: {:?}", policy);
//! ```
//!
//! Each message is written to the registered [`IoWrite`] sink and terminated
//! with `\r\n`. Until a board registers a sink with [`set_debug_writer`] the
//! output is silently dropped, because memory protection is configured long
//! before any console exists.

use core::fmt::{self, Write};
use core::ptr::addr_of_mut;

/// Raw byte sink for debug output, usually a polled UART.
pub trait IoWrite {
    /// Write `buf` and return the number of bytes accepted.
    fn write(&mut self, buf: &[u8]) -> usize;
}

static mut DEBUG_WRITER: Option<&'static mut dyn IoWrite> = None;

/// Register the sink used by `debug!`.
///
/// ## Safety
///
/// Must only be called from single-threaded boot code, before any other hart
/// or interrupt handler can emit debug output.
pub unsafe fn set_debug_writer(writer: &'static mut dyn IoWrite) {
    *addr_of_mut!(DEBUG_WRITER) = Some(writer);
}

struct WriterAdapter<'a> {
    sink: &'a mut dyn IoWrite,
}

impl Write for WriterAdapter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            let written = self.sink.write(bytes);
            if written == 0 {
                return Err(fmt::Error);
            }
            bytes = &bytes[written..];
        }
        Ok(())
    }
}

/// Write one formatted line to the debug sink, if one is registered.
///
/// Called by the `debug!` macro; prefer the macro.
pub fn debug_println(args: fmt::Arguments) {
    // Safety: the writer is only installed from single-threaded boot code and
    // debug output is never produced concurrently on one hart.
    let writer = unsafe { &mut *addr_of_mut!(DEBUG_WRITER) };
    if let Some(sink) = writer.as_deref_mut() {
        let mut adapter = WriterAdapter { sink };
        let _ = adapter.write_fmt(args);
        let _ = adapter.write_str("\r\n");
    }
}

/// In-kernel `println()` debugging.
#[macro_export]
macro_rules! debug {
    () => ({
        // Allow an empty debug!() to print the location when hit
        $crate::debug!("")
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::debug_println(format_args!("{}", $msg));
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::debug_println(format_args!($fmt, $($arg)+));
    });
}

#[cfg(test)]
mod tests {
    use super::{IoWrite, WriterAdapter};
    use core::fmt::Write;

    struct ByteSink {
        buf: [u8; 64],
        len: usize,
        chunk: usize,
    }

    impl IoWrite for ByteSink {
        fn write(&mut self, buf: &[u8]) -> usize {
            let n = buf.len().min(self.chunk).min(self.buf.len() - self.len);
            self.buf[self.len..self.len + n].copy_from_slice(&buf[..n]);
            self.len += n;
            n
        }
    }

    #[test]
    fn adapter_retries_short_writes() {
        let mut sink = ByteSink {
            buf: [0; 64],
            len: 0,
            chunk: 3,
        };
        {
            let mut adapter = WriterAdapter { sink: &mut sink };
            write!(adapter, "slot {:02}", 7).unwrap();
        }
        assert_eq!(&sink.buf[..sink.len], b"slot 07");
    }

    #[test]
    fn adapter_reports_full_sink() {
        let mut sink = ByteSink {
            buf: [0; 64],
            len: 60,
            chunk: 16,
        };
        let mut adapter = WriterAdapter { sink: &mut sink };
        assert!(adapter.write_str("too long for the rest").is_err());
    }
}
