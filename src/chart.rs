use crate::aggregation::NightlyStats;
use crate::error::{Result, SleepStatsError};
use crate::output::{charted_stages, stage_series};
use crate::trend::{apply_floor, fit_trend, TrendLine};
use chrono::DateTime;
use log::info;
use plotters::coord::ranged1d::{AsRangedCoord, Ranged, ValueFormatter};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

/// 15in x 8in at 96 dpi.
pub const CHART_SIZE: (u32, u32) = (1440, 768);

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AxisScale {
    #[default]
    Log,
    Linear,
}

impl FromStr for AxisScale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "log" => Ok(AxisScale::Log),
            "linear" => Ok(AxisScale::Linear),
            _ => Err(format!("Invalid axis scale: {}. Use log (default) or linear", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarkerStyle {
    #[default]
    Points,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartOptions {
    pub scale: AxisScale,
    pub markers: MarkerStyle,
    /// Stand-in for zero durations on a log axis, in hours.
    pub zero_floor: f64,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            scale: AxisScale::Log,
            markers: MarkerStyle::Points,
            zero_floor: crate::trend::DEFAULT_ZERO_FLOOR,
        }
    }
}

/// One plotted stage: points keyed by epoch seconds, plus its fitted trend.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub label: &'static str,
    pub color: RGBColor,
    pub points: Vec<(f64, f64)>,
    pub trend: Option<TrendLine>,
}

impl ChartSeries {
    /// Trend values at each point's x, clamped to `floor` on a log axis.
    fn trend_points(&self, options: &ChartOptions) -> Vec<(f64, f64)> {
        match self.trend {
            Some(line) => self
                .points
                .iter()
                .map(|(x, _)| {
                    let y = line.at(*x);
                    let y = match options.scale {
                        AxisScale::Log => y.max(options.zero_floor),
                        AxisScale::Linear => y,
                    };
                    (*x, y)
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Builds the plotted series for every charted stage.
pub fn chart_series(stats: &NightlyStats, options: &ChartOptions) -> Vec<ChartSeries> {
    charted_stages()
        .map(|(tracked, (r, g, b))| {
            let points: Vec<(f64, f64)> = stage_series(stats, tracked.stage)
                .into_iter()
                .map(|(key, hours)| {
                    let y = match options.scale {
                        AxisScale::Log => apply_floor(hours, options.zero_floor),
                        AxisScale::Linear => hours,
                    };
                    (key.epoch_seconds() as f64, y)
                })
                .collect();
            let trend = fit_trend(&points);
            ChartSeries {
                label: tracked.label,
                color: RGBColor(r, g, b),
                points,
                trend,
            }
        })
        .collect()
}

fn x_range(series: &[ChartSeries]) -> Range<f64> {
    let xs = series.iter().flat_map(|s| s.points.iter().map(|(x, _)| *x));
    let (min, max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    if !min.is_finite() {
        return 0.0..SECONDS_PER_DAY;
    }
    (min - SECONDS_PER_DAY)..(max + SECONDS_PER_DAY)
}

fn y_max(series: &[ChartSeries], options: &ChartOptions) -> f64 {
    let max = series
        .iter()
        .flat_map(|s| {
            s.points
                .iter()
                .map(|(_, y)| *y)
                .chain(s.trend_points(options).into_iter().map(|(_, y)| y))
        })
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.2
    } else {
        1.0
    }
}

fn tick_format(x_range: &Range<f64>) -> &'static str {
    if x_range.end - x_range.start < 60.0 * SECONDS_PER_DAY {
        "%Y-%m-%d"
    } else {
        "%Y-%m"
    }
}

fn draw<Y>(
    path: &Path,
    series: &[ChartSeries],
    options: &ChartOptions,
    x_range: Range<f64>,
    y_range: Y,
) -> std::result::Result<(), Box<dyn std::error::Error>>
where
    Y: AsRangedCoord<Value = f64>,
    Y::CoordDescType: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let format = tick_format(&x_range);
    let mut chart = ChartBuilder::on(&root)
        .caption("Sleep Statistics Over Time", ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Duration (hours)")
        .x_labels(12)
        .x_label_formatter(&|x| {
            DateTime::from_timestamp(*x as i64, 0)
                .map(|dt| dt.format(format).to_string())
                .unwrap_or_default()
        })
        .draw()?;

    for s in series {
        let color = s.color;
        match options.markers {
            MarkerStyle::Lines => {
                chart
                    .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
                    .label(s.label)
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
            }
            MarkerStyle::Points => {
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
                    )?
                    .label(s.label)
                    .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
            }
        }

        let trend = s.trend_points(options);
        if !trend.is_empty() {
            chart.draw_series(LineSeries::new(trend, color.stroke_width(2)))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperMiddle)
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Draws the nightly stage chart as SVG. Any drawing failure is fatal.
pub fn render_chart(path: &Path, stats: &NightlyStats, options: &ChartOptions) -> Result<()> {
    let series = chart_series(stats, options);
    for s in &series {
        if let Some(line) = fit_trend(&ordinal_points(&s.points)) {
            info!("{} trend: {:+.3} h/night", s.label, line.slope);
        }
    }

    let x_range = x_range(&series);
    let y_max = y_max(&series, options);
    let drawn = match options.scale {
        AxisScale::Log => {
            let y_min = options.zero_floor * 0.5;
            draw(path, &series, options, x_range, (y_min..y_max).log_scale())
        }
        AxisScale::Linear => draw(path, &series, options, x_range, 0.0..y_max),
    };
    drawn.map_err(|e| SleepStatsError::Render(e.to_string()))?;

    info!("Chart written to {}", path.display());
    Ok(())
}

/// Re-keys points by their position, for slopes in units per night.
fn ordinal_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .enumerate()
        .map(|(i, (_, y))| (i as f64, *y))
        .collect()
}
