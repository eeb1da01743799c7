//! Sequential byte source over a raw data file

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::common::{RawFileError, RawFileResult};

/// Forward-only byte stream owning one open file (or any `Read`)
///
/// The file handle is released when the source is dropped.
pub struct ByteSource<R> {
    inner: R,
    position: u64,
}

impl ByteSource<BufReader<File>> {
    /// Open a file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> RawFileResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RawFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> ByteSource<R> {
    /// Wrap an existing reader positioned at the first record
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Read until `buf` is full or the stream ends
    ///
    /// Returns the number of bytes read: `buf.len()` on success, fewer
    /// (possibly 0) at end of stream.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> RawFileResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    let offset = self.position + filled as u64;
                    self.position = offset;
                    return Err(RawFileError::Io { offset, source });
                }
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    /// Bytes consumed so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Recover the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}
