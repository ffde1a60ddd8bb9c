//! Fixed-point conversion between human units and wire integers
//!
//! - Odds: decimal odds × 10 000 (4 decimal digits)
//! - Spread / total points: × 10, spread signed
//! - Scores: × 10
//!
//! Conversion truncates toward zero. Products within `SNAP_EPSILON` of an
//! integer are snapped first so binary float error (0.29 × 10 000 =
//! 2899.9999…) does not lose a unit.

use super::opcode::{OpcodeError, OpcodeResult};

/// Odds scale factor
pub const ODDS_DIVISOR: u32 = 10_000;

/// Points and score scale factor
pub const POINTS_DIVISOR: u32 = 10;

const SNAP_EPSILON: f64 = 1e-6;

fn scale(field: &'static str, value: f64, factor: u32) -> OpcodeResult<f64> {
    if !value.is_finite() {
        return Err(OpcodeError::range(field, format!("{} is not a finite number", value)));
    }
    let scaled = value * factor as f64;
    let nearest = scaled.round();
    if (scaled - nearest).abs() < SNAP_EPSILON {
        Ok(nearest)
    } else {
        Ok(scaled.trunc())
    }
}

fn to_unsigned(field: &'static str, value: f64, factor: u32, max: u64) -> OpcodeResult<u64> {
    let scaled = scale(field, value, factor)?;
    if scaled < 0.0 {
        return Err(OpcodeError::range(field, format!("{} is negative", value)));
    }
    if scaled > max as f64 {
        return Err(OpcodeError::range(
            field,
            format!("{} scales to {} which exceeds {}", value, scaled, max),
        ));
    }
    Ok(scaled as u64)
}

/// Decimal odds (e.g. 1.9) to the wire value (19 000)
pub fn odds_to_fixed(field: &'static str, odds: f64) -> OpcodeResult<u32> {
    to_unsigned(field, odds, ODDS_DIVISOR, u32::MAX as u64).map(|v| v as u32)
}

/// Signed spread points (e.g. -3.5) to tenths (-35)
pub fn points_to_tenths(field: &'static str, points: f64) -> OpcodeResult<i16> {
    let scaled = scale(field, points, POINTS_DIVISOR)?;
    if scaled < i16::MIN as f64 || scaled > i16::MAX as f64 {
        return Err(OpcodeError::range(
            field,
            format!("{} scales to {} which does not fit in 16 signed bits", points, scaled),
        ));
    }
    Ok(scaled as i16)
}

/// Unsigned total points (e.g. 210.5) to tenths (2105)
pub fn total_points_to_tenths(field: &'static str, points: f64) -> OpcodeResult<u16> {
    to_unsigned(field, points, POINTS_DIVISOR, u16::MAX as u64).map(|v| v as u16)
}

/// Score to tenths; a tenths value above 65 535 is an error, never truncated
pub fn score_to_tenths(field: &'static str, score: f64) -> OpcodeResult<u16> {
    to_unsigned(field, score, POINTS_DIVISOR, u16::MAX as u64).map(|v| v as u16)
}

pub fn fixed_to_odds(value: u32) -> f64 {
    value as f64 / ODDS_DIVISOR as f64
}

pub fn tenths_to_points(value: i16) -> f64 {
    value as f64 / POINTS_DIVISOR as f64
}

pub fn tenths_to_total(value: u16) -> f64 {
    value as f64 / POINTS_DIVISOR as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odds_precision() {
        assert_eq!(odds_to_fixed("odds", 1.2345).unwrap(), 12_345);
        assert_eq!(odds_to_fixed("odds", 1.9).unwrap(), 19_000);
        assert_eq!(odds_to_fixed("odds", 0.29).unwrap(), 2_900);
        // fifth decimal digit is dropped, not rounded
        assert_eq!(odds_to_fixed("odds", 2.12349).unwrap(), 21_234);
    }

    #[test]
    fn test_spread_points_signed() {
        assert_eq!(points_to_tenths("spread_points", -3.5).unwrap(), -35);
        assert_eq!(points_to_tenths("spread_points", 7.0).unwrap(), 70);
        assert!(points_to_tenths("spread_points", 4000.0).is_err());
    }

    #[test]
    fn test_score_width() {
        assert_eq!(score_to_tenths("home_score", 6553.5).unwrap(), 65_535);
        let err = score_to_tenths("home_score", 6553.6).unwrap_err();
        assert!(matches!(err, OpcodeError::EncodingRange { field: "home_score", .. }));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(odds_to_fixed("home_odds", -1.5).is_err());
        assert!(odds_to_fixed("home_odds", f64::NAN).is_err());
        assert!(total_points_to_tenths("total_points", f64::INFINITY).is_err());
    }

    #[test]
    fn test_inverse_rendering() {
        assert_eq!(fixed_to_odds(12_345), 1.2345);
        assert_eq!(tenths_to_points(-35), -3.5);
        assert_eq!(tenths_to_total(2105), 210.5);
    }
}
