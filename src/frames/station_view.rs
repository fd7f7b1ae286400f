//! A single station's slice of the enriched series, with the aggregations the
//! presentation layer asks for: resolutions, a summary table, spiral data and
//! CSV export.

use crate::derived::normal::{compute_normal, deviation_from_normal, monthly_means};
use crate::filtering::ClimateFrameExt;
use crate::series::frame::enriched_to_frame;
use crate::types::observation::{EnrichedObservation, MonthlyValue};
use crate::types::resolution::Resolution;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A daily extreme and the day it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyExtreme {
    pub date: NaiveDate,
    pub value: f64,
}

/// A monthly mean extreme and the month it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyExtreme {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

/// Record values of one station. On ties the earliest row wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Lowest daily minimum temperature.
    pub lowest_min: DailyExtreme,
    /// Highest daily maximum temperature.
    pub highest_max: DailyExtreme,
    pub coldest_month: MonthlyExtreme,
    pub hottest_month: MonthlyExtreme,
}

/// Which values the spiral chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiralMode {
    /// Monthly mean temperature.
    #[default]
    MonthlyMean,
    /// Monthly mean minus the climate normal of the same month.
    DeviationFromNormal,
}

/// One point of the temperature spiral. `z_axis` grows by one per year so the
/// months of a year wind once around the axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpiralPoint {
    pub year: i32,
    pub month: u32,
    pub value: Option<f64>,
    pub z_axis: f64,
}

/// The rows of one station, detached from the full series.
#[derive(Debug, Clone, PartialEq)]
pub struct StationView {
    station_id: String,
    rows: Vec<EnrichedObservation>,
    year_range: Option<(i32, i32)>,
}

impl StationView {
    pub(crate) fn new(station_id: &str, rows: Vec<EnrichedObservation>) -> Self {
        let year_range = rows.iter().fold(None, |acc, r| match acc {
            None => Some((r.year, r.year)),
            Some((lo, hi)) => Some((r.year.min(lo), r.year.max(hi))),
        });
        Self {
            station_id: station_id.to_string(),
            rows,
            year_range,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn rows(&self) -> &[EnrichedObservation] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(year_min, year_max)` of the rows in the view, `None` when empty.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        self.year_range
    }

    pub fn year_min(&self) -> Option<i32> {
        self.year_range.map(|(lo, _)| lo)
    }

    pub fn year_max(&self) -> Option<i32> {
        self.year_range.map(|(_, hi)| hi)
    }

    /// A new view with the rows of `start..=end`.
    pub fn within_years(&self, start: i32, end: i32) -> StationView {
        StationView::new(
            &self.station_id,
            self.rows
                .iter()
                .filter(|r| (start..=end).contains(&r.year))
                .cloned()
                .collect(),
        )
    }

    /// The view at the requested time resolution, sorted chronologically.
    ///
    /// * `Day`: every enriched column, one row per observation.
    /// * `Month`: `year, month, month_date, temp_avg` with the monthly mean.
    /// * `Year`: `year, year_date, temp_avg` with the yearly mean.
    pub fn aggregate(&self, resolution: Resolution) -> PolarsResult<DataFrame> {
        let lf = enriched_to_frame(&self.rows)?.lazy();
        match resolution {
            Resolution::Day => lf
                .sort_by_exprs(
                    [col(resolution.time_column())],
                    SortMultipleOptions::default().with_maintain_order(true),
                )
                .collect(),
            Resolution::Month => lf.mean_by_month().collect(),
            Resolution::Year => lf.mean_by_year().collect(),
        }
    }

    /// Extremes of the view, or `None` when it lacks a daily minimum, a daily
    /// maximum or a month with a mean.
    pub fn summary(&self) -> Option<SeriesSummary> {
        let lowest_min = self.daily_extreme(|r| r.temp_min, |new, best| new < best)?;
        let highest_max = self.daily_extreme(|r| r.temp_max, |new, best| new > best)?;

        let months = self.monthly_means();
        let coldest_month = monthly_extreme(&months, |new, best| new < best)?;
        let hottest_month = monthly_extreme(&months, |new, best| new > best)?;

        Some(SeriesSummary {
            lowest_min,
            highest_max,
            coldest_month,
            hottest_month,
        })
    }

    /// Mean `temp_avg` per `(year, month)`, chronologically.
    pub fn monthly_means(&self) -> Vec<MonthlyValue> {
        monthly_means(&self.rows)
    }

    /// Spiral chart data.
    ///
    /// In [`SpiralMode::DeviationFromNormal`] the normal is taken from the
    /// monthly means before `reference_year`; months without a normal are
    /// dropped. `current_year` and later years are incomplete and left out.
    pub fn spiral(&self, mode: SpiralMode, reference_year: i32, current_year: i32) -> Vec<SpiralPoint> {
        let months = self.monthly_means();
        let values = match mode {
            SpiralMode::MonthlyMean => months,
            SpiralMode::DeviationFromNormal => {
                let normal = compute_normal(&months, reference_year);
                deviation_from_normal(&months, &normal)
            }
        };

        let mut points: Vec<SpiralPoint> = values
            .into_iter()
            .filter(|m| m.year < current_year)
            .map(|m| SpiralPoint {
                year: m.year,
                month: m.month,
                value: m.value,
                z_axis: m.year as f64 + m.month as f64 / 12.0,
            })
            .collect();
        points.sort_by_key(|p| (p.year, p.month));
        points
    }

    /// Writes the view at `resolution` as CSV with a header row.
    pub fn write_csv<W: Write>(&self, resolution: Resolution, writer: &mut W) -> PolarsResult<()> {
        let mut df = self.aggregate(resolution)?;
        CsvWriter::new(writer)
            .include_header(true)
            .finish(&mut df)
    }

    fn daily_extreme(
        &self,
        value: impl Fn(&EnrichedObservation) -> Option<f64>,
        better: impl Fn(f64, f64) -> bool,
    ) -> Option<DailyExtreme> {
        self.rows.iter().fold(None, |best: Option<DailyExtreme>, r| {
            let Some(v) = value(r) else {
                return best;
            };
            match best {
                Some(b) if !better(v, b.value) => Some(b),
                _ => Some(DailyExtreme {
                    date: r.date,
                    value: v,
                }),
            }
        })
    }
}

fn monthly_extreme(
    months: &[MonthlyValue],
    better: impl Fn(f64, f64) -> bool,
) -> Option<MonthlyExtreme> {
    months.iter().fold(None, |best: Option<MonthlyExtreme>, m| {
        let Some(v) = m.value else {
            return best;
        };
        match best {
            Some(b) if !better(v, b.value) => Some(b),
            _ => Some(MonthlyExtreme {
                year: m.year,
                month: m.month,
                value: v,
            }),
        }
    })
}
