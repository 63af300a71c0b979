//! One-dimensional signal helpers for profiles sampled along a skeleton.
//!
//! [`gaussian_smooth`] uses a kernel truncated at four sigma and
//! half-sample symmetric ("reflect") boundary handling, so the ends of a
//! short profile are not pulled toward zero.

/// Kernel half-width in units of sigma.
const TRUNCATE: f64 = 4.0;

/// Map an out-of-range index onto `0..len` by mirroring about the
/// sample edges (`d c b a | a b c d | d c b a`).
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn reflect_index(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = i.rem_euclid(period);
    if m < len as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Normalized Gaussian kernel of radius `round(4σ)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn kernel(sigma: f64) -> Vec<f64> {
    let radius = TRUNCATE.mul_add(sigma, 0.5) as usize;
    let weights: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Smooth a sequence with a 1-D Gaussian of standard deviation `sigma`
/// (in samples).
///
/// Non-positive sigma and empty input return the input unchanged.
#[must_use = "returns the smoothed signal"]
#[allow(clippy::cast_possible_wrap)]
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    if values.is_empty() || sigma <= 0.0 {
        return values.to_vec();
    }

    let kernel = kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    (0..values.len() as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[reflect_index(i + k as isize - radius, values.len())])
                .sum()
        })
        .collect()
}

/// Discrete derivative: central differences in the interior, one-sided
/// differences at the two ends.
///
/// Fewer than two samples have no defined slope and produce zeros.
#[must_use = "returns the gradient"]
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push(values[1] - values[0]);
    for i in 1..n - 1 {
        out.push((values[i + 1] - values[i - 1]) / 2.0);
    }
    out.push(values[n - 1] - values[n - 2]);
    out
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation, `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Linearly resample `values` to `samples` evenly spaced points spanning
/// the whole sequence.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn resample(values: &[f64], samples: usize) -> Vec<f64> {
    match values.len() {
        0 => return Vec::new(),
        1 => return vec![values[0]; samples],
        _ => {}
    }
    if samples < 2 {
        return values.iter().copied().take(samples).collect();
    }

    let last = (values.len() - 1) as f64;
    (0..samples)
        .map(|i| {
            let t = i as f64 / (samples - 1) as f64 * last;
            let lo = t.floor() as usize;
            let hi = (lo + 1).min(values.len() - 1);
            let frac = t - lo as f64;
            values[lo].mul_add(1.0 - frac, values[hi] * frac)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "expected {b}, got {a}");
    }

    #[test]
    fn reflect_index_mirrors_about_edges() {
        let got: Vec<usize> = (-3..7).map(|i| reflect_index(i, 4)).collect();
        assert_eq!(got, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1]);
    }

    #[test]
    fn reflect_index_handles_short_sequences() {
        // Kernel wider than the data wraps through several reflections.
        assert_eq!(reflect_index(-5, 2), 0);
        assert_eq!(reflect_index(9, 1), 0);
    }

    #[test]
    fn kernel_is_normalized_with_radius_eight_at_sigma_two() {
        let k = kernel(2.0);
        assert_eq!(k.len(), 17);
        assert_close(k.iter().sum(), 1.0, 1e-12);
        assert!(k[8] > k[7] && k[7] > k[0]);
    }

    #[test]
    fn constant_signal_is_unchanged() {
        let smoothed = gaussian_smooth(&[10.0; 12], 2.0);
        for v in smoothed {
            assert_close(v, 10.0, 1e-12);
        }
    }

    #[test]
    fn smoothing_reduces_a_spike() {
        let mut signal = vec![0.0; 21];
        signal[10] = 10.0;
        let smoothed = gaussian_smooth(&signal, 2.0);
        assert!(smoothed[10] < 3.0);
        assert_close(smoothed.iter().sum(), 10.0, 1e-9);
    }

    #[test]
    fn non_positive_sigma_is_identity() {
        let signal = [1.0, 5.0, 2.0];
        assert_eq!(gaussian_smooth(&signal, 0.0), signal.to_vec());
    }

    #[test]
    fn gradient_matches_central_and_one_sided_differences() {
        let g = gradient(&[1.0, 2.0, 4.0, 7.0, 11.0]);
        assert_eq!(g, vec![1.0, 1.5, 2.5, 3.5, 4.0]);
    }

    #[test]
    fn gradient_of_single_sample_is_zero() {
        assert_eq!(gradient(&[3.0]), vec![0.0]);
        assert!(gradient(&[]).is_empty());
    }

    #[test]
    fn population_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_close(mean(&values).unwrap_or_default(), 5.0, 1e-12);
        assert_close(std_dev(&values).unwrap_or_default(), 2.0, 1e-12);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn resample_interpolates_endpoints_exactly() {
        let r = resample(&[0.0, 10.0], 11);
        assert_eq!(r.len(), 11);
        assert_close(r[0], 0.0, 1e-12);
        assert_close(r[5], 5.0, 1e-12);
        assert_close(r[10], 10.0, 1e-12);
    }
}
