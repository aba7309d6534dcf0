//! Splits an input stream into fixed-size chunks.

use std::io::{self, ErrorKind};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// A contiguous slice of the input, owned by whichever task is sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the input, starting at 0.
    pub seq: u64,

    /// Byte offset of the first byte.
    pub offset: u64,

    pub data: Bytes,

    /// Failed attempts so far.
    pub attempts: u32,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reads `chunk_size` bytes at a time. Only the last chunk may be shorter,
/// and no chunk is ever empty.
pub struct ChunkReader<R> {
    input: Option<R>,
    chunk_size: usize,
    next_seq: u64,
    bytes_read: u64,
    exhausted: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(input: R, chunk_size: usize) -> Self {
        Self {
            input: Some(input),
            chunk_size,
            next_seq: 0,
            bytes_read: 0,
            exhausted: false,
        }
    }

    /// Read the next chunk, or `None` once the input has no bytes left.
    ///
    /// Short reads are retried until the buffer is full or the input ends.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        let input = match self.input.as_mut() {
            Some(input) if !self.exhausted => input,
            _ => return Ok(None),
        };

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < self.chunk_size {
            match input.read(&mut buf[filled..]).await {
                Ok(0) => {
                    self.exhausted = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let chunk = Chunk {
            seq: self.next_seq,
            offset: self.bytes_read,
            data: Bytes::from(buf),
            attempts: 0,
        };
        self.next_seq += 1;
        self.bytes_read += filled as u64;

        Ok(Some(chunk))
    }

    /// Whether end of input has been seen.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted || self.input.is_none()
    }

    /// Drop the underlying input. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        self.exhausted = true;
        self.input.take().is_some()
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of chunks handed out so far.
    pub fn chunks_read(&self) -> u64 {
        self.next_seq
    }
}
