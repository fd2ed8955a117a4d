// Fixed-point helpers for 2-decimal amounts (prices, km/l mileage).
// Amounts are persisted as integer hundredths so range filters stay exact.
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds half-up to two places and pins the scale, so `3750` renders as
/// `"3750.00"`.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn to_hundredths(value: Decimal) -> Option<i64> {
    i64::try_from(round2(value).mantissa()).ok()
}

fn whole(mut value: Decimal) -> Option<i64> {
    value.rescale(0);
    i64::try_from(value.mantissa()).ok()
}

/// Smallest whole number of hundredths that is `>= value`, or `None` when
/// that does not fit in an `i64`.
pub fn ceil_hundredths(value: Decimal) -> Option<i64> {
    value.checked_mul(Decimal::ONE_HUNDRED).and_then(|v| whole(v.ceil()))
}

/// Largest whole number of hundredths that is `<= value`, or `None` when
/// that does not fit in an `i64`.
pub fn floor_hundredths(value: Decimal) -> Option<i64> {
    value.checked_mul(Decimal::ONE_HUNDRED).and_then(|v| whole(v.floor()))
}

pub fn from_hundredths(hundredths: i64) -> Decimal {
    Decimal::new(hundredths, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round2_is_half_up() {
        assert_eq!(round2(Decimal::from_str("2.345").unwrap()).to_string(), "2.35");
        assert_eq!(round2(Decimal::from_str("2.344").unwrap()).to_string(), "2.34");
        assert_eq!(round2(Decimal::from(3750)).to_string(), "3750.00");
    }

    #[test]
    fn test_hundredths_conversion() {
        let price = Decimal::from_str("84999.50").unwrap();
        assert_eq!(to_hundredths(price), Some(8_499_950));
        assert_eq!(from_hundredths(8_499_950), price);
        assert_eq!(ceil_hundredths(Decimal::from_str("80.008").unwrap()), Some(8001));
        assert_eq!(floor_hundredths(Decimal::from_str("120.012").unwrap()), Some(12001));
    }

    #[test]
    fn test_hundredths_out_of_range_is_none() {
        assert_eq!(ceil_hundredths(Decimal::MAX), None);
        assert_eq!(floor_hundredths(Decimal::MAX), None);
        assert_eq!(ceil_hundredths(Decimal::MIN), None);
        // Fits a Decimal but not an i64 once scaled.
        let big = Decimal::from_str("100000000000000000000").unwrap();
        assert_eq!(floor_hundredths(big), None);
    }
}
