//! SHA256d (double SHA-256), the hash function used throughout the wire
//! format: block hashes, transaction hashes, and message checksums.

use sha2::{Digest, Sha256};
use std::io;

/// A `Write` sink that accumulates bytes and produces their SHA256d digest.
///
/// Used to hash a header or transaction while it is being serialized, rather
/// than serializing to a buffer and hashing that buffer afterwards.
#[derive(Default)]
pub struct Writer(Sha256);

impl Writer {
    /// Consume `self` and return the double-SHA256 digest of everything written.
    pub fn finish(self) -> [u8; 32] {
        let first = self.0.finalize();
        let second = Sha256::digest(&first[..]);
        let mut out = [0u8; 32];
        out.copy_from_slice(&second[..]);
        out
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Convenience wrapper computing SHA256d over a byte slice in one call.
pub fn hash(bytes: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(bytes);
    let second = Sha256::digest(&first[..]);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second[..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn writer_matches_hash() {
        let mut w = Writer::default();
        w.write_all(b"litecoincash").unwrap();
        assert_eq!(w.finish(), hash(b"litecoincash"));
    }
}
