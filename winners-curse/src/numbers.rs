//! Numeric conversion helpers centralizing count-to-float casts.

use num_traits::cast::cast;

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(f64::MAX)
}

/// Convert a u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(f64::MAX)
}

/// Share of `count` in `total`, returning 0.0 for an empty total.
#[must_use]
pub fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count_to_f64(count) / count_to_f64(total)
}

/// `count` evenly spaced points from `start` to `end` inclusive.
///
/// Each point is computed as `start + (end - start) * i / (count - 1)` rather
/// than by repeated addition, so grid points such as `5.0` on `0..=10` land
/// exactly.
#[must_use]
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = count_to_f64(count - 1);
            (0..count)
                .map(|i| start + (end - start) * count_to_f64(i) / last)
                .collect()
        }
    }
}
