use std::io::{self, Write};

/// Write-side byte cap. Forwards at most `cap` bytes to the inner sink,
/// truncating the final chunk exactly at the boundary; everything past the
/// cap is reported as consumed without being written. Reaching the cap is
/// the sample-mode success condition, not an error, and this stage applies
/// even when the server already granted a matching range, in case it
/// ignores or mis-honors the request.
pub struct CappedWriter<W: Write> {
    inner: W,
    remaining: u64,
}

impl<W: Write> CappedWriter<W> {
    pub fn new(inner: W, cap: u64) -> Self {
        Self {
            inner,
            remaining: cap,
        }
    }

    /// True once the cap has been fully written; the upstream read should
    /// stop at this point.
    pub fn is_satisfied(&self) -> bool {
        self.remaining == 0
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CappedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let take = (self.remaining.min(buf.len() as u64)) as usize;
        if take > 0 {
            self.inner.write_all(&buf[..take])?;
            self.remaining -= take as u64;
        }
        // Excess is swallowed so callers never see a short write.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
