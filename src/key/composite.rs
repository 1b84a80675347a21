//! Composite key encoding
//!
//! Escaped, terminator-delimited segments. See the module docs in `key` for
//! the byte layout.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{LedgerError, Result};

/// First byte of every composite key (separates them from plain keys)
pub const NAMESPACE_MARKER: u8 = 0x00;

/// Ends every segment, including the domain tag
const TERMINATOR_BYTE: u8 = 0x00;

/// Introduces a two-byte escape sequence
const ESCAPE_BYTE: u8 = 0x01;

/// Separator used only when rendering keys for humans
pub const DISPLAY_SEPARATOR: char = '~';

/// A single store key built from a domain tag and an ordered list of segments.
///
/// Keys compare byte-wise, which is the order the world state iterates in.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey(Bytes);

impl CompositeKey {
    /// Encode `tag` and `segments` into a key.
    ///
    /// Encoding is total: any strings (empty, or containing `0x00`, `0x01`
    /// or the display separator) produce a key, and distinct inputs never
    /// produce the same key. A key built from a segment list is a byte
    /// prefix of every key built from an extension of that list.
    pub fn encode<S: AsRef<str>>(tag: &str, segments: &[S]) -> Self {
        let capacity = 2
            + tag.len()
            + segments
                .iter()
                .map(|s| s.as_ref().len() + 1)
                .sum::<usize>();

        let mut buf = BytesMut::with_capacity(capacity);
        buf.put_u8(NAMESPACE_MARKER);
        write_segment(tag.as_bytes(), &mut buf);
        for segment in segments {
            write_segment(segment.as_ref().as_bytes(), &mut buf);
        }

        Self(buf.freeze())
    }

    /// Wrap raw bytes (e.g. a key handed back by a scan) without validating them.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Split the key back into its tag and segments
    pub fn decode(&self) -> Result<(String, Vec<String>)> {
        let mut buf = match self.0.split_first() {
            Some((&NAMESPACE_MARKER, rest)) => rest,
            _ => {
                return Err(LedgerError::KeyDecode(
                    "missing composite key namespace marker".to_string(),
                ))
            }
        };

        let tag = read_segment(&mut buf)?;
        let mut segments = Vec::new();
        while !buf.is_empty() {
            segments.push(read_segment(&mut buf)?);
        }

        Ok((tag, segments))
    }

    /// True if this key is a byte prefix of `other`
    pub fn is_prefix_of(&self, other: &[u8]) -> bool {
        other.starts_with(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CompositeKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    /// Renders `tag~seg1~seg2`; falls back to a lossy dump for bytes that
    /// are not a well-formed composite key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok((tag, segments)) => {
                f.write_str(&tag)?;
                for segment in &segments {
                    write!(f, "{}{}", DISPLAY_SEPARATOR, segment)?;
                }
                Ok(())
            }
            Err(_) => write!(f, "{}", String::from_utf8_lossy(&self.0).escape_debug()),
        }
    }
}

impl fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeKey({})", self)
    }
}

// =============================================================================
// Segment Encoding
// =============================================================================

/// Escape a segment and append its terminator.
///
/// - `0x00` → `0x01 0x01`
/// - `0x01` → `0x01 0x02`
/// - all other bytes unchanged
fn write_segment(data: &[u8], buf: &mut BytesMut) {
    for &byte in data {
        match byte {
            TERMINATOR_BYTE => {
                buf.put_u8(ESCAPE_BYTE);
                buf.put_u8(0x01);
            }
            ESCAPE_BYTE => {
                buf.put_u8(ESCAPE_BYTE);
                buf.put_u8(0x02);
            }
            _ => buf.put_u8(byte),
        }
    }
    buf.put_u8(TERMINATOR_BYTE);
}

/// Read one escaped segment, advancing `buf` past its terminator
fn read_segment(buf: &mut &[u8]) -> Result<String> {
    let mut raw = Vec::new();
    let mut i = 0;

    while i < buf.len() {
        match buf[i] {
            TERMINATOR_BYTE => {
                *buf = &buf[i + 1..];
                return String::from_utf8(raw).map_err(|e| {
                    LedgerError::KeyDecode(format!("segment is not valid UTF-8: {}", e))
                });
            }
            ESCAPE_BYTE => {
                let next = buf.get(i + 1).copied().ok_or_else(|| {
                    LedgerError::KeyDecode("truncated escape sequence".to_string())
                })?;
                match next {
                    0x01 => raw.push(TERMINATOR_BYTE),
                    0x02 => raw.push(ESCAPE_BYTE),
                    other => {
                        return Err(LedgerError::KeyDecode(format!(
                            "invalid escape sequence: 0x01 0x{:02x}",
                            other
                        )))
                    }
                }
                i += 2;
            }
            byte => {
                raw.push(byte);
                i += 1;
            }
        }
    }

    Err(LedgerError::KeyDecode(
        "unterminated segment (missing 0x00 terminator)".to_string(),
    ))
}
