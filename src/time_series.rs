use serde::{Deserialize, Serialize};

/// One sample on a chart. The server's progress data calls the axes `x`
/// (epoch milliseconds) and `y`; the session trace uses seconds for `t`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(rename = "x")]
    pub t: f64,
    #[serde(rename = "y")]
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, value: f64) -> Self {
        Self { t, value }
    }
}

impl From<(f64, f64)> for TimeSeriesPoint {
    fn from(v: (f64, f64)) -> Self {
        TimeSeriesPoint { t: v.0, value: v.1 }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.value)
    }
}

pub fn values(points: &[TimeSeriesPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}
