use crate::time_series::TimeSeriesPoint;

/// Compute the X (seconds) extent and Y (wpm) ceiling for the results chart.
/// Without samples the X extent falls back to `expected_duration`.
pub fn compute_chart_params(
    points: &[TimeSeriesPoint],
    expected_duration: Option<f64>,
) -> (f64, f64) {
    let highest_wpm = points.iter().map(|p| p.value).fold(0.0, f64::max);

    let overall_duration = match points.last() {
        Some(p) => p.t,
        None => expected_duration.unwrap_or(1.0),
    };

    (overall_duration.max(1.0), highest_wpm.round().max(1.0))
}

/// X bounds for a series with arbitrary origin, e.g. unix milliseconds.
/// A single point gets a small window around it.
pub fn x_bounds(points: &[TimeSeriesPoint]) -> [f64; 2] {
    let min = points.iter().map(|p| p.t).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.t).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return [0.0, 1.0];
    }
    if max - min < f64::EPSILON {
        return [min - 1.0, max + 1.0];
    }
    [min, max]
}

pub fn as_tuples(points: &[TimeSeriesPoint]) -> Vec<(f64, f64)> {
    points.iter().copied().map(Into::into).collect()
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
