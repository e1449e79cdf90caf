/// Stand-in for zero durations on a log axis, in hours.
pub const DEFAULT_ZERO_FLOOR: f64 = 0.01;

/// `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub intercept: f64,
    pub slope: f64,
}

impl TrendLine {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares fit with a free intercept and unit weights.
///
/// Returns `None` when the line is undefined: fewer than two points, or every
/// point shares the same x.
pub fn fit_trend(points: &[(f64, f64)]) -> Option<TrendLine> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    // Centered sums keep epoch-second x values from swamping the variance.
    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });

    if sxx == 0.0 || !sxx.is_finite() {
        return None;
    }

    let slope = sxy / sxx;
    Some(TrendLine {
        intercept: mean_y - slope * mean_x,
        slope,
    })
}

/// Replaces non-positive values with `floor`.
pub fn apply_floor(y: f64, floor: f64) -> f64 {
    if y <= 0.0 {
        floor
    } else {
        y
    }
}
