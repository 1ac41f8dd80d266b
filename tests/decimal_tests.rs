use blink::error::DecimalError;
use blink::FixedDec;
use proptest::prelude::*;

fn decimal() -> impl Strategy<Value = FixedDec> {
    (any::<i64>(), 0u8..=18).prop_map(|(m, s)| FixedDec::new(m, s).unwrap())
}

proptest! {
    #[test]
    fn prop_display_parse_roundtrip(d in decimal()) {
        let parsed: FixedDec = d.to_string().parse().unwrap();
        prop_assert_eq!(parsed.mantissa(), d.mantissa());
        prop_assert_eq!(parsed.scale(), d.scale());
    }

    #[test]
    fn prop_rescale_up_then_down_is_identity(m in -1_000_000_000i64..1_000_000_000, s in 0u8..=9, extra in 0u8..=9) {
        let d = FixedDec::new(m, s).unwrap();
        let up = d.rescale(s + extra).unwrap();
        prop_assert_eq!(up, d);
        let down = up.rescale(s).unwrap();
        prop_assert_eq!(down.mantissa(), m);
        prop_assert_eq!(down.scale(), s);
    }

    #[test]
    fn prop_rescale_never_rounds(d in decimal(), target in 0u8..=18) {
        match d.rescale(target) {
            Ok(r) => prop_assert_eq!(r, d),
            Err(DecimalError::Inexact { .. }) => prop_assert!(target < d.scale()),
            Err(DecimalError::Overflow { .. }) => prop_assert!(target > d.scale()),
            Err(e) => prop_assert!(false, "unexpected error {}", e),
        }
    }

    #[test]
    fn prop_order_matches_exact_rational_order(a in decimal(), b in decimal()) {
        // Compare a.m * 10^b.s with b.m * 10^a.s using i128 arithmetic.
        let lhs = a.mantissa() as i128 * 10i128.pow(b.scale() as u32);
        let rhs = b.mantissa() as i128 * 10i128.pow(a.scale() as u32);
        prop_assert_eq!(a.cmp(&b), lhs.cmp(&rhs));
        prop_assert_eq!(a == b, lhs == rhs);
    }

    #[test]
    fn prop_normalize_keeps_value(d in decimal()) {
        let n = d.normalize();
        prop_assert_eq!(n, d);
        prop_assert!(n.scale() == 0 || n.mantissa() % 10 != 0);
    }
}

#[test]
fn test_scale_limit() {
    assert!(matches!(FixedDec::new(1, 19), Err(DecimalError::ScaleTooLarge(19))));
    assert!(matches!(
        "0.1234567890123456789".parse::<FixedDec>(),
        Err(DecimalError::ScaleTooLarge(19))
    ));
}

#[test]
fn test_parse_extremes() {
    let min: FixedDec = "-9223372036854775808".parse().unwrap();
    assert_eq!(min.mantissa(), i64::MIN);
    assert!("9223372036854775808".parse::<FixedDec>().is_err());
    assert_eq!("+3.10".parse::<FixedDec>().unwrap().to_string(), "3.10");
}
