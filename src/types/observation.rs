use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of one station, reduced to the temperature fields.
///
/// `None` marks a missing measurement. It is never replaced by zero, so
/// aggregations skip it instead of counting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub station_id: String,
    pub date: NaiveDate,
    pub temp_avg: Option<f64>, // tre200d0
    pub temp_min: Option<f64>, // tre200dn
    pub temp_max: Option<f64>, // tre200dx
}

/// A [`DailyObservation`] with its calendar buckets and degree-day columns.
///
/// All derived fields are computed by [`crate::DerivedColumnEngine`] from
/// `date` and `temp_avg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedObservation {
    pub station_id: String,
    pub date: NaiveDate,
    pub temp_avg: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub year: i32,
    pub month: u32,
    /// 1-based ordinal day within the year.
    pub day_of_year: u32,
    /// The 15th of the row's month; plotting anchor for monthly buckets.
    pub month_date: NaiveDate,
    /// 15 July of the row's year; plotting anchor for yearly buckets.
    pub year_date: NaiveDate,
    pub heating_days: Option<u8>,
    pub cooling_days: Option<u8>,
    pub heating_deg_days: Option<f64>,
    pub cooling_deg_days: Option<f64>,
}

/// Mean daily `temp_avg` of one station for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyValue {
    pub year: i32,
    pub month: u32,
    /// `None` when every day of the month was missing.
    pub value: Option<f64>,
}

/// Anything that can be bucketed by `(year, month)` and averaged.
pub trait MonthlySample {
    fn year(&self) -> i32;
    fn month(&self) -> u32;
    fn value(&self) -> Option<f64>;
}

impl MonthlySample for EnrichedObservation {
    fn year(&self) -> i32 {
        self.year
    }
    fn month(&self) -> u32 {
        self.month
    }
    fn value(&self) -> Option<f64> {
        self.temp_avg
    }
}

impl MonthlySample for MonthlyValue {
    fn year(&self) -> i32 {
        self.year
    }
    fn month(&self) -> u32 {
        self.month
    }
    fn value(&self) -> Option<f64> {
        self.value
    }
}
