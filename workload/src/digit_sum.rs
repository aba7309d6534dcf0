//! Sums the decimal digits of a chunk.
//!
//! Any byte that is not an ASCII digit counts as zero, so newlines and
//! stray characters in the input never fail a chunk.

use anyhow::Result;
use bytes::Bytes;

pub fn task(chunk: Bytes) -> Result<i64> {
    Ok(chunk
        .iter()
        .filter(|b| b.is_ascii_digit())
        .map(|&b| (b - b'0') as i64)
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits() {
        assert_eq!(task(Bytes::from_static(b"123")).unwrap(), 6);
        assert_eq!(task(Bytes::from_static(b"456")).unwrap(), 15);
        assert_eq!(task(Bytes::from_static(b"789")).unwrap(), 24);
        assert_eq!(task(Bytes::from_static(b"123456789")).unwrap(), 45);
    }

    #[test]
    fn test_empty_chunk() {
        assert_eq!(task(Bytes::new()).unwrap(), 0);
    }

    #[test]
    fn test_whitespace_is_skipped() {
        assert_eq!(task(Bytes::from_static(b"1 2\n3\r\n")).unwrap(), 6);
    }

    #[test]
    fn test_non_digit_counts_as_zero() {
        assert_eq!(task(Bytes::from_static(b"12x4")).unwrap(), 7);
        assert_eq!(task(Bytes::from_static(b"-9\xff")).unwrap(), 9);
    }
}
