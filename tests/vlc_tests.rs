//! Property tests for the variable-length integer code.

use blink::codec::vlc::{decode_signed, decode_unsigned, encode_signed, encode_unsigned, unsigned_len};
use blink::CodecError;
use proptest::prelude::*;

fn signed(v: i64) -> Vec<u8> {
    let mut out = Vec::new();
    encode_signed(v, &mut out);
    out
}

fn unsigned(v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    encode_unsigned(v, &mut out);
    out
}

/// Whether the top bit of the payload, at the payload's own width, is set.
fn payload_sign_bit(bytes: &[u8]) -> bool {
    let first = bytes[0];
    if first & 0x80 == 0 {
        first & 0x40 != 0
    } else if first & 0x40 == 0 {
        bytes[1] & 0x80 != 0
    } else {
        let n = (first & 0x3f) as usize;
        n > 0 && bytes[n] & 0x80 != 0
    }
}

#[test]
fn test_form_boundaries() {
    let cases: &[(i64, &[u8])] = &[
        (0, &[0x00]),
        (63, &[0x3f]),
        (-64, &[0x40]),
        (-17, &[0x6f]),
        (64, &[0x80, 0x01]),
        (-65, &[0xbf, 0xfe]),
        (8191, &[0xbf, 0x7f]),
        (-8192, &[0x80, 0x80]),
        (8192, &[0xc2, 0x00, 0x20]),
        (-8193, &[0xc2, 0xff, 0xdf]),
        (i64::MIN, &[0xc8, 0, 0, 0, 0, 0, 0, 0, 0x80]),
    ];
    for (value, expected) in cases {
        assert_eq!(signed(*value), *expected, "signed {}", value);
    }

    let cases: &[(u64, &[u8])] = &[
        (127, &[0x7f]),
        (128, &[0x80, 0x02]),
        (16383, &[0xbf, 0xff]),
        (16384, &[0xc2, 0x00, 0x40]),
        (u64::MAX, &[0xc8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]),
    ];
    for (value, expected) in cases {
        assert_eq!(unsigned(*value), *expected, "unsigned {}", value);
    }
}

#[test]
fn test_same_bytes_read_both_ways() {
    assert_eq!(decode_signed(&[0x6f], 8).unwrap(), (-17, 1));
    assert_eq!(decode_unsigned(&[0x6f], 8).unwrap(), (111, 1));
    assert_eq!(decode_signed(&[0xbf, 0xff], 16).unwrap(), (-1, 2));
    assert_eq!(decode_unsigned(&[0xbf, 0xff], 16).unwrap(), (16383, 2));
}

#[test]
fn test_truncated_input() {
    assert!(matches!(decode_unsigned(&[], 64), Err(CodecError::Truncated { need: 1, have: 0 })));
    assert!(matches!(decode_signed(&[0x80], 64), Err(CodecError::Truncated { need: 2, have: 1 })));
    assert!(matches!(
        decode_unsigned(&[0xc4, 0x01, 0x02], 64),
        Err(CodecError::Truncated { need: 5, have: 3 })
    ));
}

#[test]
fn test_width_overflow() {
    assert!(matches!(decode_unsigned(&unsigned(256), 8), Err(CodecError::Overflow { bits: 8 })));
    assert!(matches!(decode_signed(&signed(128), 8), Err(CodecError::Overflow { bits: 8 })));
    assert!(matches!(decode_signed(&signed(-129), 8), Err(CodecError::Overflow { bits: 8 })));
    assert_eq!(decode_signed(&signed(-128), 8).unwrap().0, -128);
}

#[test]
fn test_oversized_extension() {
    // Nine payload bytes: the ninth must only extend the sign.
    let mut bytes = vec![0xc9];
    bytes.extend_from_slice(&[0xff; 9]);
    assert_eq!(decode_signed(&bytes, 64).unwrap(), (-1, 10));
    assert!(matches!(decode_unsigned(&bytes, 64), Err(CodecError::Overflow { bits: 64 })));

    let mut bytes = vec![0xc9];
    bytes.extend_from_slice(&[0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(decode_unsigned(&bytes, 64).unwrap(), (1, 10));
}

#[test]
fn test_empty_extended_form_is_zero() {
    assert_eq!(decode_signed(&[0xc0], 64).unwrap(), (0, 1));
    assert_eq!(decode_unsigned(&[0xc0], 64).unwrap(), (0, 1));
}

proptest! {
    #[test]
    fn prop_signed_roundtrip(v in any::<i64>()) {
        let bytes = signed(v);
        prop_assert_eq!(decode_signed(&bytes, 64).unwrap(), (v, bytes.len()));
    }

    #[test]
    fn prop_unsigned_roundtrip(v in any::<u64>()) {
        let bytes = unsigned(v);
        prop_assert_eq!(decode_unsigned(&bytes, 64).unwrap(), (v, bytes.len()));
        prop_assert_eq!(unsigned_len(v), bytes.len());
    }

    #[test]
    fn prop_narrow_widths_roundtrip(v in any::<i32>(), u in any::<u16>()) {
        prop_assert_eq!(decode_signed(&signed(v as i64), 32).unwrap().0, v as i64);
        prop_assert_eq!(decode_unsigned(&unsigned(u as u64), 16).unwrap().0, u as u64);
    }

    #[test]
    fn prop_positive_sign_bit_means_agreement(v in any::<u64>()) {
        let bytes = unsigned(v);
        if !payload_sign_bit(&bytes) {
            prop_assert_eq!(decode_signed(&bytes, 64).unwrap().0 as u64, v);
        }
    }

    #[test]
    fn prop_nonnegative_signed_reads_unsigned(v in 0..=i64::MAX) {
        let bytes = signed(v);
        prop_assert!(!payload_sign_bit(&bytes));
        prop_assert_eq!(decode_unsigned(&bytes, 64).unwrap().0, v as u64);
    }

    #[test]
    fn prop_signed_encoding_is_minimal(v in any::<i64>()) {
        let len = signed(v).len();
        let expected = if (-64..=63).contains(&v) {
            1
        } else if (-8192..=8191).contains(&v) {
            2
        } else {
            1 + (2usize..=8).find(|n| {
                let bound = 1i128 << (8 * n - 1);
                (-bound..bound).contains(&(v as i128))
            }).unwrap()
        };
        prop_assert_eq!(len, expected);
    }

    #[test]
    fn prop_concatenated_values_decode_in_order(values in proptest::collection::vec(any::<i64>(), 0..32)) {
        let mut bytes = Vec::new();
        for v in &values {
            encode_signed(*v, &mut bytes);
        }
        let mut pos = 0;
        let mut decoded = Vec::new();
        while pos < bytes.len() {
            let (v, n) = decode_signed(&bytes[pos..], 64).unwrap();
            decoded.push(v);
            pos += n;
        }
        prop_assert_eq!(decoded, values);
    }
}
