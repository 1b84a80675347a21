//! Timestamp rendering inside keys

use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, Result};

/// Digits needed for `u64::MAX` (18446744073709551615)
pub const FIXED_WIDTH_DIGITS: usize = 20;

/// How a `u64` timestamp becomes a key segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampLayout {
    /// Zero-padded to 20 digits. Byte order equals numeric order.
    #[default]
    FixedWidth,

    /// Plain decimal (`100`, `99`, ...). Byte-compatible with keys written by
    /// legacy deployments, but `"100" < "99"`, so device scans are not
    /// chronological.
    Decimal,
}

impl TimestampLayout {
    /// Render a timestamp as a key segment
    pub fn render(self, timestamp: u64) -> String {
        match self {
            TimestampLayout::FixedWidth => {
                format!("{:0width$}", timestamp, width = FIXED_WIDTH_DIGITS)
            }
            TimestampLayout::Decimal => timestamp.to_string(),
        }
    }

    /// Parse a key segment produced by [`render`](Self::render)
    ///
    /// Only the exact rendering is accepted, so `"0100"` is not a decimal
    /// segment even though it names 100.
    pub fn parse(self, segment: &str) -> Result<u64> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::KeyDecode(format!(
                "timestamp segment {:?} is not a decimal number",
                segment
            )));
        }

        if self == TimestampLayout::FixedWidth && segment.len() != FIXED_WIDTH_DIGITS {
            return Err(LedgerError::KeyDecode(format!(
                "timestamp segment {:?} is not {} digits wide",
                segment, FIXED_WIDTH_DIGITS
            )));
        }

        if self == TimestampLayout::Decimal && segment.len() > 1 && segment.starts_with('0') {
            return Err(LedgerError::KeyDecode(format!(
                "timestamp segment {:?} has leading zeros",
                segment
            )));
        }

        segment.parse::<u64>().map_err(|e| {
            LedgerError::KeyDecode(format!("timestamp segment {:?}: {}", segment, e))
        })
    }

    /// Whether a prefix scan over keys in this layout yields ascending timestamps
    pub fn is_chronological(self) -> bool {
        matches!(self, TimestampLayout::FixedWidth)
    }
}

impl fmt::Display for TimestampLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampLayout::FixedWidth => f.write_str("fixed"),
            TimestampLayout::Decimal => f.write_str("decimal"),
        }
    }
}

impl FromStr for TimestampLayout {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "fixed-width" => Ok(TimestampLayout::FixedWidth),
            "decimal" => Ok(TimestampLayout::Decimal),
            other => Err(LedgerError::Config(format!(
                "unknown timestamp layout {:?} (expected \"fixed\" or \"decimal\")",
                other
            ))),
        }
    }
}
