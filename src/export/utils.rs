use std::io::{self, Write};

use sha2::{Digest, Sha256};

pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub fn sha256_string(data: &str) -> String {
    sha256_bytes(data.as_bytes())
}

/// Write adapter that feeds every byte through SHA-256 on its way to the
/// inner sink, so a layer tar is digested while it is written instead of
/// being re-read or buffered whole.
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Hand back the sink plus the lowercase-hex digest and byte count of
    /// everything written through this adapter.
    pub fn finish(self) -> (W, String, u64) {
        (self.inner, hex::encode(self.hasher.finalize()), self.written)
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digesting_is_deterministic() {
        let one = sha256_bytes(b"the same bytes");
        let two = sha256_bytes(b"the same bytes");
        assert_eq!(one, two);
        assert_eq!(one.len(), 64);
        assert!(one.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_writer_matches_buffered_digest() {
        let mut writer = DigestWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        let (sink, digest, written) = writer.finish();

        assert_eq!(sink, b"hello world");
        assert_eq!(written, 11);
        assert_eq!(digest, sha256_string("hello world"));
    }
}
