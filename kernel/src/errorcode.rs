// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Standard error enum for invoking operations

/// Standard errors.
///
/// Boot-time configuration code never hands these to an external caller: a
/// planner returns them so that the entry point can decide to halt, and so
/// that unit tests can observe which check rejected an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// The state requested is already set
    ALREADY = 3,
    /// An invalid parameter was passed
    INVAL = 6,
    /// Parameter passed was too large
    SIZE = 7,
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ErrorCode::ALREADY => "ALREADY",
            ErrorCode::INVAL => "INVAL",
            ErrorCode::SIZE => "SIZE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;

    #[test]
    fn errorcode_names() {
        let mut buf = [0u8; 8];
        for (err, name) in [
            (ErrorCode::ALREADY, "ALREADY"),
            (ErrorCode::INVAL, "INVAL"),
            (ErrorCode::SIZE, "SIZE"),
        ] {
            let mut cursor = Cursor { buf: &mut buf, len: 0 };
            core::fmt::write(&mut cursor, format_args!("{}", err)).unwrap();
            let len = cursor.len;
            assert_eq!(&buf[..len], name.as_bytes());
        }
    }

    struct Cursor<'a> {
        buf: &'a mut [u8],
        len: usize,
    }

    impl core::fmt::Write for Cursor<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let end = self.len + s.len();
            self.buf
                .get_mut(self.len..end)
                .ok_or(core::fmt::Error)?
                .copy_from_slice(s.as_bytes());
            self.len = end;
            Ok(())
        }
    }
}
