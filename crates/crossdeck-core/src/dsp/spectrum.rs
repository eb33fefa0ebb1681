//! Log-frequency leveling of linear spectra

/// Rebucket a linear-frequency sequence into logarithmically widening buckets
///
/// Bucket `k` takes the next run of bins `i` with
/// `log10(i + 1) < (2k + 1) * log10(2) / 2`. Each output is the weighted mean
/// of its bins, bin `j` of the bucket weighing `log10(j + 2) - log10(j + 1)`.
pub fn log10_leveling(src: &[f64]) -> Vec<f64> {
    let half_width = 2.0_f64.log10() / 2.0;
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut bucket = 0usize;

    while start < src.len() {
        let end = bucket as f64 * half_width * 2.0 + half_width;
        let len = src[start..]
            .iter()
            .enumerate()
            .take_while(|(i, _)| ((start + i) as f64 + 1.0).log10() < end)
            .count();

        let (sum, weight) = src[start..start + len].iter().enumerate().fold(
            (0.0, 0.0),
            |(sum, weight), (j, &v)| {
                let w = (j as f64 + 2.0).log10() - (j as f64 + 1.0).log10();
                (sum + v * w, weight + w)
            },
        );
        out.push(if weight > 0.0 { sum / weight } else { 0.0 });

        start += len;
        bucket += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(log10_leveling(&[]).is_empty());
    }

    #[test]
    fn test_bucket_boundaries() {
        // Buckets: [0], [1], [2..=4], [5..=10], ...
        let src: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let out = log10_leveling(&src);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 1.0);
        assert!(out[2] > 2.0 && out[2] < 3.0, "weights favour the low bin");
        assert!(out[3] > 5.0 && out[3] < 7.5);
    }

    #[test]
    fn test_constant_spectrum_stays_constant() {
        let out = log10_leveling(&[3.5; 300]);
        assert!(out.iter().all(|&v| (v - 3.5).abs() < 1e-9));
    }
}
