//! Forward projection of emission trends.
//!
//! A single method is used everywhere: ordinary least squares over the
//! trailing window of the history, with x measured in periods from the
//! first point of that window (so gaps in the history are respected).
//! Forecast values are clamped at zero.

use serde::{Deserialize, Serialize};

use crate::aggregation::TrendSeries;
use crate::error::EngineError;
use crate::period::Period;

pub const METHOD_LINEAR_LEAST_SQUARES: &str = "linear-least-squares";
pub const DEFAULT_WINDOW: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub period: Period,
    pub forecast_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub method: String,
    pub slope_per_period: f64,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.forecast_value).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionEngine {
    window: usize,
}

impl Default for ProjectionEngine {
    fn default() -> Self {
        ProjectionEngine {
            window: DEFAULT_WINDOW,
        }
    }
}

impl ProjectionEngine {
    /// `window` below 2 is raised to 2.
    pub fn new(window: usize) -> Self {
        ProjectionEngine {
            window: window.max(2),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Forecasts `horizon` periods past the last point of `series`. The series must be in
    /// chronological order with one point per period, all of the series' granularity.
    /// The forecast ends early if the calendar runs out before `horizon` periods.
    pub fn project(&self, series: &TrendSeries, horizon: u32) -> Result<Forecast, EngineError> {
        if series.points.iter().any(|p| p.period.granularity != series.granularity) {
            return Err(EngineError::InvalidSeries(
                "point granularity differs from the series",
            ));
        }
        if series.points.windows(2).any(|w| w[0].period >= w[1].period) {
            return Err(EngineError::InvalidSeries(
                "periods must be strictly increasing",
            ));
        }
        let n = series.points.len();
        if n < 2 {
            return Err(EngineError::InsufficientHistory { points: n });
        }

        let tail = &series.points[n.saturating_sub(self.window)..];
        let origin = tail[0].period;
        let xs: Vec<f64> = tail.iter().map(|p| p.period.index_from(&origin) as f64).collect();
        let ys: Vec<f64> = tail.iter().map(|p| p.value).collect();
        let (slope, intercept) = least_squares(&xs, &ys);

        let last = tail[tail.len() - 1].period;
        let last_x = last.index_from(&origin) as f64;
        let points = (1..=horizon)
            .map_while(|k| {
                Some(ForecastPoint {
                    period: last.advance(k)?,
                    forecast_value: (intercept + slope * (last_x + f64::from(k))).max(0.0),
                })
            })
            .collect();

        Ok(Forecast {
            method: METHOD_LINEAR_LEAST_SQUARES.to_string(),
            slope_per_period: slope,
            points,
        })
    }
}

/// Returns (slope, intercept). Callers guarantee at least two distinct xs.
fn least_squares(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}
