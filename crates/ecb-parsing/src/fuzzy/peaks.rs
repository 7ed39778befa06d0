use std::ops::Range;

/// Indices of local maxima in `series`.
///
/// A peak is strictly greater than its left neighbour and greater than the
/// first differing value to its right. Flat tops report their midpoint
/// (rounded down). The first and last samples are never peaks.
pub fn find_peaks(series: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if series.len() < 3 {
        return peaks;
    }
    let last = series.len() - 1;
    let mut i = 1;
    while i < last {
        if series[i - 1] < series[i] {
            let mut ahead = i + 1;
            while ahead < last && series[ahead] == series[i] {
                ahead += 1;
            }
            if series[ahead] < series[i] {
                let right = ahead - 1;
                peaks.push((i + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// The run of samples equal to `series[peak]` that contains `peak`.
pub fn plateau(series: &[f64], peak: usize) -> Range<usize> {
    let value = series[peak];
    let mut start = peak;
    while start > 0 && series[start - 1] == value {
        start -= 1;
    }
    let mut end = peak + 1;
    while end < series.len() && series[end] == value {
        end += 1;
    }
    start..end
}
