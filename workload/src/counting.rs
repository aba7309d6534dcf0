use anyhow::Result;
use bytes::Bytes;

/// Number of bytes in the chunk.
pub fn bytes(chunk: Bytes) -> Result<i64> {
    Ok(chunk.len() as i64)
}

/// Number of `\n` bytes in the chunk. Summed over chunks this is the line
/// count of the input, wherever the chunk boundaries fall.
pub fn lines(chunk: Bytes) -> Result<i64> {
    Ok(chunk.iter().filter(|&&b| b == b'\n').count() as i64)
}
