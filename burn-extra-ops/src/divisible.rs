//! Channel rounding shared by the GhostNet family.

/// Round `value` to a multiple of `divisor`.
///
/// The result is never smaller than `divisor` and never more than 10% below
/// `value`; in that case one more `divisor` is added.
pub fn make_divisible(value: f64, divisor: usize) -> usize {
    let step = divisor as f64;
    let rounded = ((value + step / 2.0) / step).floor() * step;
    let mut channels = (rounded as usize).max(divisor);
    if (channels as f64) < 0.9 * value {
        channels += divisor;
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squeeze_excite_widths() {
        assert_eq!(make_divisible(72.0 * 0.25, 4), 20);
        assert_eq!(make_divisible(120.0 * 0.25, 4), 32);
        assert_eq!(make_divisible(480.0 * 0.25, 4), 120);
        assert_eq!(make_divisible(672.0 * 0.25, 4), 168);
        assert_eq!(make_divisible(960.0 * 0.25, 4), 240);
    }

    #[test]
    fn never_below_divisor() {
        assert_eq!(make_divisible(1.0, 4), 4);
        assert_eq!(make_divisible(0.0, 8), 8);
    }

    #[test]
    fn bumps_when_rounding_down_too_far() {
        // 10 rounds to 8, which is more than 10% below 10.
        assert_eq!(make_divisible(10.0, 8), 16);
    }
}
