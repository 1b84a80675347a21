//! Key Codec Tests
//!
//! These tests verify:
//! - Byte layout of composite keys
//! - Prefix composition for device scans
//! - Non-collision for adversarial segments
//! - Timestamp layouts and ordering
//! - Decoding and error cases

use proptest::prelude::*;
use sensorledger::key::{
    CompositeKey, ReadingKey, TimestampLayout, FIXED_WIDTH_DIGITS, READING_TAG,
};
use sensorledger::LedgerError;

// =============================================================================
// Helper Functions
// =============================================================================

fn fixed(uuid: &str, ts: u64) -> CompositeKey {
    ReadingKey::encode(uuid, ts, TimestampLayout::FixedWidth)
}

fn decimal(uuid: &str, ts: u64) -> CompositeKey {
    ReadingKey::encode(uuid, ts, TimestampLayout::Decimal)
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_encode_byte_layout() {
    let key = CompositeKey::encode("reading", &["dev-1", "100"]);
    assert_eq!(key.as_bytes(), b"\x00reading\x00dev-1\x00100\x00");
}

#[test]
fn test_encode_escapes_control_bytes() {
    let key = CompositeKey::encode("t", &["a\u{0}b\u{1}c"]);
    assert_eq!(key.as_bytes(), b"\x00t\x00a\x01\x01b\x01\x02c\x00");
}

#[test]
fn test_reading_key_uses_reading_tag() {
    let key = fixed("dev-1", 100);
    let (tag, segments) = key.decode().unwrap();

    assert_eq!(tag, READING_TAG);
    assert_eq!(segments, vec!["dev-1".to_string(), "00000000000000000100".to_string()]);
}

#[test]
fn test_display_renders_tilde_separated() {
    assert_eq!(fixed("dev-1", 100).to_string(), "reading~dev-1~00000000000000000100");
    assert_eq!(decimal("dev-1", 100).to_string(), "reading~dev-1~100");
}

// =============================================================================
// Prefix Tests
// =============================================================================

#[test]
fn test_device_prefix_is_prefix_of_full_key() {
    let prefix = ReadingKey::device_prefix("dev-1");

    assert!(prefix.is_prefix_of(fixed("dev-1", 0).as_bytes()));
    assert!(prefix.is_prefix_of(fixed("dev-1", u64::MAX).as_bytes()));
    assert!(prefix.is_prefix_of(decimal("dev-1", 42).as_bytes()));
}

#[test]
fn test_device_prefix_excludes_similar_devices() {
    let prefix = ReadingKey::device_prefix("dev-1");

    assert!(!prefix.is_prefix_of(fixed("dev-10", 5).as_bytes()));
    assert!(!prefix.is_prefix_of(fixed("dev-", 15).as_bytes()));
    assert!(!prefix.is_prefix_of(fixed("dev-1~x", 5).as_bytes()));
    assert!(!prefix.is_prefix_of(fixed("dev-1\u{0}", 5).as_bytes()));
}

#[test]
fn test_prefix_shorter_than_full_key() {
    let prefix = ReadingKey::device_prefix("dev-1");
    let full = fixed("dev-1", 7);
    assert!(prefix.len() < full.len());
    assert_ne!(prefix, full);
}

// =============================================================================
// Collision Tests
// =============================================================================

#[test]
fn test_separator_in_segments_does_not_collide() {
    // A raw "~" join would render both as "reading~a~1~2"
    let left = CompositeKey::encode(READING_TAG, &["a~1", "2"]);
    let right = CompositeKey::encode(READING_TAG, &["a", "1~2"]);
    assert_ne!(left, right);
}

#[test]
fn test_terminator_in_segments_does_not_collide() {
    let left = CompositeKey::encode(READING_TAG, &["a\u{0}", "b"]);
    let right = CompositeKey::encode(READING_TAG, &["a", "\u{0}b"]);
    assert_ne!(left, right);
}

#[test]
fn test_escape_byte_in_segments_does_not_collide() {
    let left = CompositeKey::encode(READING_TAG, &["a\u{1}", "b"]);
    let right = CompositeKey::encode(READING_TAG, &["a", "\u{1}b"]);
    assert_ne!(left, right);
}

#[test]
fn test_tuple_length_is_part_of_key() {
    let one = CompositeKey::encode(READING_TAG, &["a"]);
    let two = CompositeKey::encode(READING_TAG, &["a", ""]);
    let none = CompositeKey::encode::<&str>(READING_TAG, &[]);

    assert_ne!(one, two);
    assert_ne!(one, none);
    assert_ne!(two, none);
}

#[test]
fn test_empty_segments_round_trip() {
    let key = CompositeKey::encode(READING_TAG, &["", ""]);
    let (tag, segments) = key.decode().unwrap();

    assert_eq!(tag, READING_TAG);
    assert_eq!(segments, vec![String::new(), String::new()]);
}

#[test]
fn test_tag_is_part_of_key() {
    let a = CompositeKey::encode("reading", &["x"]);
    let b = CompositeKey::encode("readings", &["x"]);
    assert_ne!(a, b);
}

// =============================================================================
// Timestamp Layout Tests
// =============================================================================

#[test]
fn test_fixed_width_rendering() {
    let layout = TimestampLayout::FixedWidth;

    assert_eq!(layout.render(0), "00000000000000000000");
    assert_eq!(layout.render(100), "00000000000000000100");
    assert_eq!(layout.render(u64::MAX), "18446744073709551615");
    assert_eq!(layout.render(u64::MAX).len(), FIXED_WIDTH_DIGITS);
}

#[test]
fn test_decimal_rendering() {
    assert_eq!(TimestampLayout::Decimal.render(0), "0");
    assert_eq!(TimestampLayout::Decimal.render(1_700_000_000_000), "1700000000000");
}

#[test]
fn test_fixed_width_keys_sort_numerically() {
    assert!(fixed("d", 9) < fixed("d", 10));
    assert!(fixed("d", 99) < fixed("d", 100));
    assert!(fixed("d", 100) < fixed("d", u64::MAX));
}

#[test]
fn test_decimal_keys_sort_lexicographically() {
    // The legacy layout does not preserve numeric order
    assert!(decimal("d", 100) < decimal("d", 99));
    assert!(!TimestampLayout::Decimal.is_chronological());
    assert!(TimestampLayout::FixedWidth.is_chronological());
}

#[test]
fn test_parse_timestamp_segments() {
    assert_eq!(TimestampLayout::FixedWidth.parse("00000000000000000100").unwrap(), 100);
    assert_eq!(TimestampLayout::Decimal.parse("100").unwrap(), 100);
}

#[test]
fn test_parse_rejects_bad_segments() {
    assert!(matches!(
        TimestampLayout::FixedWidth.parse("100"),
        Err(LedgerError::KeyDecode(_))
    ));
    assert!(TimestampLayout::Decimal.parse("").is_err());
    assert!(TimestampLayout::Decimal.parse("+5").is_err());
    assert!(TimestampLayout::Decimal.parse("12a").is_err());
    assert!(TimestampLayout::Decimal.parse("99999999999999999999").is_err());
}

#[test]
fn test_decimal_parse_rejects_leading_zeros() {
    assert_eq!(TimestampLayout::Decimal.parse("0").unwrap(), 0);
    assert!(matches!(
        TimestampLayout::Decimal.parse("0100"),
        Err(LedgerError::KeyDecode(_))
    ));
    assert!(TimestampLayout::Decimal.parse("00").is_err());

    // A padded segment under a decimal key never decodes as the reading it resembles
    let key = CompositeKey::encode(READING_TAG, &["dev-1", "0100"]);
    assert!(matches!(
        ReadingKey::decode(&key, TimestampLayout::Decimal),
        Err(LedgerError::KeyDecode(_))
    ));
}

#[test]
fn test_layout_from_str() {
    assert_eq!("fixed".parse::<TimestampLayout>().unwrap(), TimestampLayout::FixedWidth);
    assert_eq!("Fixed-Width".parse::<TimestampLayout>().unwrap(), TimestampLayout::FixedWidth);
    assert_eq!("decimal".parse::<TimestampLayout>().unwrap(), TimestampLayout::Decimal);
    assert!(matches!(
        "hex".parse::<TimestampLayout>(),
        Err(LedgerError::Config(_))
    ));
}

#[test]
fn test_default_layout_is_fixed_width() {
    assert_eq!(TimestampLayout::default(), TimestampLayout::FixedWidth);
}

// =============================================================================
// Decode Tests
// =============================================================================

#[test]
fn test_reading_key_decode() {
    let key = fixed("dev~1\u{0}", 1234);
    let decoded = ReadingKey::decode(&key, TimestampLayout::FixedWidth).unwrap();

    assert_eq!(decoded, ReadingKey::new("dev~1\u{0}", 1234));
    assert_eq!(decoded.to_key(TimestampLayout::FixedWidth), key);
}

#[test]
fn test_reading_key_decode_rejects_other_tags() {
    let key = CompositeKey::encode("device", &["x", "00000000000000000001"]);
    let result = ReadingKey::decode(&key, TimestampLayout::FixedWidth);
    assert!(matches!(result, Err(LedgerError::KeyDecode(_))));
}

#[test]
fn test_reading_key_decode_rejects_prefix() {
    let result = ReadingKey::decode(&ReadingKey::device_prefix("x"), TimestampLayout::FixedWidth);
    assert!(matches!(result, Err(LedgerError::KeyDecode(_))));
}

#[test]
fn test_decode_rejects_missing_marker() {
    let key = CompositeKey::from_bytes(&b"reading\x00x\x00"[..]);
    assert!(matches!(key.decode(), Err(LedgerError::KeyDecode(_))));
}

#[test]
fn test_decode_rejects_bad_escape() {
    let key = CompositeKey::from_bytes(&b"\x00reading\x00a\x01\x07\x00"[..]);
    assert!(matches!(key.decode(), Err(LedgerError::KeyDecode(_))));
}

#[test]
fn test_decode_rejects_unterminated_segment() {
    let key = CompositeKey::from_bytes(&b"\x00reading\x00abc"[..]);
    assert!(matches!(key.decode(), Err(LedgerError::KeyDecode(_))));
}

#[test]
fn test_decode_rejects_truncated_escape() {
    let key = CompositeKey::from_bytes(&b"\x00reading\x00a\x01"[..]);
    assert!(matches!(key.decode(), Err(LedgerError::KeyDecode(_))));
}

// =============================================================================
// Property Tests
// =============================================================================

/// Short strings drawn mostly from bytes the codec treats specially
fn adversarial_segment() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(vec!['a', 'b', '~', '\u{0}', '\u{1}', '1']), 0..6)
        .prop_map(|chars| chars.into_iter().collect())
}

fn small_timestamp() -> impl Strategy<Value = u64> {
    prop_oneof![0u64..20, Just(100u64), Just(u64::MAX)]
}

proptest! {
    #[test]
    fn prop_reading_keys_are_injective(
        u1 in adversarial_segment(),
        t1 in small_timestamp(),
        u2 in adversarial_segment(),
        t2 in small_timestamp(),
    ) {
        for layout in [TimestampLayout::FixedWidth, TimestampLayout::Decimal] {
            let k1 = ReadingKey::encode(&u1, t1, layout);
            let k2 = ReadingKey::encode(&u2, t2, layout);
            prop_assert_eq!(k1 == k2, u1 == u2 && t1 == t2);
        }
    }

    #[test]
    fn prop_device_prefix_matches_only_its_device(
        u1 in adversarial_segment(),
        u2 in adversarial_segment(),
        t in any::<u64>(),
    ) {
        let prefix = ReadingKey::device_prefix(&u1);
        let key = fixed(&u2, t);
        prop_assert_eq!(prefix.is_prefix_of(key.as_bytes()), u1 == u2);
    }

    #[test]
    fn prop_fixed_width_preserves_timestamp_order(
        uuid in adversarial_segment(),
        t1 in any::<u64>(),
        t2 in any::<u64>(),
    ) {
        prop_assert_eq!(fixed(&uuid, t1).cmp(&fixed(&uuid, t2)), t1.cmp(&t2));
    }

    #[test]
    fn prop_decode_inverts_encode(
        tag in adversarial_segment(),
        segments in prop::collection::vec(adversarial_segment(), 0..4),
    ) {
        let key = CompositeKey::encode(&tag, segments.as_slice());
        let (decoded_tag, decoded_segments) = key.decode().unwrap();
        prop_assert_eq!(decoded_tag, tag);
        prop_assert_eq!(decoded_segments, segments);
    }
}
