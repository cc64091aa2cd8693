// Licensed under the MIT license or the Apache License, Version 2.0, at your option.

/*!
Byte source plumbing (spec.md §4.2).

Interrupted reads are retried transparently; everything else (including a
permanent read failure) is folded into ordinary end-of-stream, since that
is how upstream logic is specified to treat it.
*/

use std::io::{self, Read};

/// Wraps any `Read` so that `ErrorKind::Interrupted` is retried instead of
/// propagated, and any other I/O error reads as a clean EOF.
pub struct RetryingReader<R> {
    inner: R,
}

impl<R: Read> RetryingReader<R> {
    pub fn new(inner: R) -> Self {
        RetryingReader { inner }
    }
}

impl<R: Read> Read for RetryingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return Ok(0),
            }
        }
    }
}

#[cfg(test)]
#[test]
fn test_retries_on_interrupted() {
    use std::io::ErrorKind;

    struct FlakyOnce {
        failed: bool,
        data: &'static [u8],
    }

    impl Read for FlakyOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "eintr"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            Ok(n)
        }
    }

    let mut r = RetryingReader::new(FlakyOnce { failed: false, data: b"abc" });
    let mut buf = [0u8; 8];
    let n = r.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"abc");
}

#[cfg(test)]
#[test]
fn test_permanent_failure_reads_as_eof() {
    struct AlwaysBroken;

    impl Read for AlwaysBroken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk is gone"))
        }
    }

    let mut r = RetryingReader::new(AlwaysBroken);
    let mut buf = [0u8; 8];
    assert_eq!(r.read(&mut buf).unwrap(), 0);
}
