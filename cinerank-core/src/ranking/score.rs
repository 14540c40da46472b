use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;

/// Highest display score a rating can carry.
pub const MAX_SCORE: i32 = 10;

/// Linear rescale of a position in (0, 1) to the `[0, 10]` display range,
/// clamped and rounded to two decimals.
pub fn score_from_position(position: &BigDecimal) -> f64 {
    let zero = BigDecimal::from(0);
    let max = BigDecimal::from(MAX_SCORE);

    let scaled = position * &max;
    let clamped = if scaled < zero {
        zero
    } else if scaled > max {
        max
    } else {
        scaled
    };

    clamped.round(2).to_f64().unwrap_or(0.0)
}
