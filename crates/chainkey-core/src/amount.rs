//! Exact conversion between base units and decimal display amounts.
//!
//! Amounts are handled as integers end to end: `"0.00000001"` BTC is exactly
//! one satoshi, and input with more fractional digits than the chain allows
//! is rejected rather than rounded.

use crate::error::AmountError;

/// Parse a non-negative decimal string into base units with `decimals`
/// fractional digits.
///
/// Accepts `"1"`, `"1.5"` and `"0.00000001"`. Rejects empty input, signs,
/// exponents, a dangling `.` and more than `decimals` fractional digits.
pub fn parse_units(s: &str, decimals: u8) -> Result<u128, AmountError> {
    let s = s.trim();
    let invalid = || AmountError::Invalid(s.to_string());
    let (whole, frac) = match s.split_once('.') {
        Some((_, "")) => return Err(invalid()),
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || !is_digits(whole) || !is_digits(frac) {
        return Err(invalid());
    }
    if frac.len() > usize::from(decimals) {
        return Err(AmountError::TooPrecise { decimals });
    }

    let scale = 10u128
        .checked_pow(u32::from(decimals))
        .ok_or(AmountError::Overflow)?;
    let pad = 10u128.pow((usize::from(decimals) - frac.len()) as u32);
    let frac_units = digits_value(frac)?
        .checked_mul(pad)
        .ok_or(AmountError::Overflow)?;
    digits_value(whole)?
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or(AmountError::Overflow)
}

/// [`parse_units`] for chains whose base-unit values fit in `u64`.
pub fn parse_units_u64(s: &str, decimals: u8) -> Result<u64, AmountError> {
    u64::try_from(parse_units(s, decimals)?).map_err(|_| AmountError::Overflow)
}

/// Render base units as a decimal string, trailing fractional zeros trimmed.
pub fn format_units(value: u128, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn digits_value(s: &str) -> Result<u128, AmountError> {
    s.bytes().try_fold(0u128, |acc, b| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u128::from(b - b'0')))
            .ok_or(AmountError::Overflow)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::Chain;

    #[test]
    fn smallest_units() {
        assert_eq!(parse_units("0.00000001", 8).unwrap(), 1);
        assert_eq!(parse_units("0.000001", 6).unwrap(), 1);
        assert_eq!(parse_units("0.000000000000000001", 18).unwrap(), 1);
        assert_eq!(format_units(1, 8), "0.00000001");
    }

    #[test]
    fn whole_and_fractional() {
        assert_eq!(parse_units("1", 8).unwrap(), 100_000_000);
        assert_eq!(parse_units("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(parse_units(" 21.05 ", 8).unwrap(), 2_105_000_000);
        assert_eq!(parse_units("0", 18).unwrap(), 0);
        assert_eq!(format_units(2_105_000_000, 8), "21.05");
        assert_eq!(format_units(100_000_000, 8), "1");
        assert_eq!(format_units(0, 8), "0");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn excess_precision_rejected() {
        assert_eq!(
            parse_units("0.000000001", 8).unwrap_err(),
            AmountError::TooPrecise { decimals: 8 }
        );
        assert_eq!(
            parse_units("1.0000000", 6).unwrap_err(),
            AmountError::TooPrecise { decimals: 6 }
        );
        assert_eq!(
            parse_units("1.5", 0).unwrap_err(),
            AmountError::TooPrecise { decimals: 0 }
        );
    }

    #[test]
    fn malformed_rejected() {
        for s in ["", ".", "1.", ".5", "-1", "+1", "1e8", "1.2.3", "1,000", "0x10", "１"] {
            assert!(
                matches!(parse_units(s, 8), Err(AmountError::Invalid(_))),
                "{s:?}"
            );
        }
    }

    #[test]
    fn u64_boundary() {
        let max = "184467440737.09551615";
        assert_eq!(parse_units_u64(max, 8).unwrap(), u64::MAX);
        assert_eq!(format_units(u128::from(u64::MAX), 8), max);
        assert_eq!(
            parse_units_u64("184467440737.09551616", 8).unwrap_err(),
            AmountError::Overflow
        );
    }

    #[test]
    fn u128_overflow() {
        let max = format_units(u128::MAX, 18);
        assert_eq!(parse_units(&max, 18).unwrap(), u128::MAX);
        assert_eq!(
            parse_units("340282366920938463464", 18).unwrap_err(),
            AmountError::Overflow
        );
        assert_eq!(
            parse_units(&"9".repeat(40), 0).unwrap_err(),
            AmountError::Overflow
        );
        assert_eq!(parse_units("1", 39).unwrap_err(), AmountError::Overflow);
    }

    #[test]
    fn chain_units() {
        assert_eq!(Chain::Bitcoin.parse_amount("0.0005").unwrap(), 50_000);
        assert_eq!(Chain::Litecoin.decimals(), 8);
        assert_eq!(Chain::Stacks.parse_amount("2").unwrap(), 2_000_000);
        assert_eq!(Chain::Tron.parse_amount("1.5").unwrap(), 1_500_000);
        assert_eq!(
            Chain::Ethereum.parse_amount("1").unwrap(),
            1_000_000_000_000_000_000
        );
        assert_eq!(Chain::Ethereum.format_amount(1_500_000_000_000_000_000), "1.5");
    }

    // --- proptest ---

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn formatted_amounts_parse_back(value in any::<u64>(), decimals in 0u8..=18) {
            let text = format_units(u128::from(value), decimals);
            prop_assert_eq!(parse_units(&text, decimals).unwrap(), u128::from(value));
        }
    }
}
