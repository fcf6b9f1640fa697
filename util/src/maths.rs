//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Linearly step from `start` towards `finish`, `step` steps out of `total`.
///
/// The product is formed before the division, so `step == total` lands on
/// `finish` to within rounding. No clamping is applied, `step > total`
/// extrapolates past `finish`.
pub fn lerp_step<T>(start: T, finish: T, step: T, total: T) -> T
where
    T: Float
{
    start + (finish - start) * step / total
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 800.0), (0.0, 1.0), 400.0), 0.5);
        assert_eq!(lin_map((-1.0, 1.0), (0.0, 10.0), 1.0), 10.0);
    }

    #[test]
    fn test_lerp_step() {
        assert_eq!(lerp_step(1.0, 3.0, 0.0, 4.0), 1.0);
        assert_eq!(lerp_step(1.0, 3.0, 2.0, 4.0), 2.0);
        assert_eq!(lerp_step(1.0, 3.0, 4.0, 4.0), 3.0);
        // Extrapolation is not clamped
        assert_eq!(lerp_step(1.0, 3.0, 8.0, 4.0), 5.0);
    }
}
