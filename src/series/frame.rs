//! Conversions between polars frames and the typed observation rows.

use crate::types::observation::{DailyObservation, EnrichedObservation};
use crate::utils::{date_to_epoch_days, epoch_days_to_date, parse_measurement};
use chrono::NaiveDate;
use log::warn;
use polars::prelude::*;
use std::io::Cursor;

/// Reads a `;`-separated, UTF-8 CSV with a header row. Every column is kept
/// as a string so the caller decides how to coerce each cell.
pub(crate) fn read_semicolon_csv(text: String) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(b';')
                .with_truncate_ragged_lines(true),
        )
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
}

/// Extracts `(station, date, temp_avg, temp_min, temp_max)` rows from a frame
/// whose columns carry the positional series names.
///
/// Temperature cells that are not numbers become missing values. Rows with an
/// unreadable date cannot be placed on the calendar and are skipped.
pub(crate) fn observations_from_raw(df: &DataFrame) -> PolarsResult<Vec<DailyObservation>> {
    let station = df.column("station")?.str()?;
    let date = df.column("date")?.str()?;
    let temp_avg = df.column("temp_avg")?.str()?;
    let temp_min = df.column("temp_min")?.str()?;
    let temp_max = df.column("temp_max")?.str()?;

    let mut rows = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for i in 0..df.height() {
        let parsed_date = date
            .get(i)
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y%m%d").ok());
        let (Some(station_id), Some(day)) = (station.get(i), parsed_date) else {
            skipped += 1;
            continue;
        };
        rows.push(DailyObservation {
            station_id: station_id.trim().to_string(),
            date: day,
            temp_avg: parse_measurement(temp_avg.get(i)),
            temp_min: parse_measurement(temp_min.get(i)),
            temp_max: parse_measurement(temp_max.get(i)),
        });
    }
    if skipped > 0 {
        warn!("Skipped {} rows without a station or a YYYYMMDD date", skipped);
    }
    Ok(rows)
}

fn date_series(name: &str, dates: impl Iterator<Item = NaiveDate>) -> PolarsResult<Series> {
    let days: Vec<i32> = dates.map(date_to_epoch_days).collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

fn dates_from_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let physical = df.column(name)?.cast(&DataType::Int32)?;
    Ok(physical
        .i32()?
        .into_iter()
        .map(|d| d.and_then(epoch_days_to_date))
        .collect())
}

/// Normalized rows as a frame; the layout of the cache snapshot.
pub(crate) fn observations_to_frame(rows: &[DailyObservation]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            "station".into(),
            rows.iter().map(|r| r.station_id.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        date_series("date", rows.iter().map(|r| r.date))?.into(),
        Series::new(
            "temp_avg".into(),
            rows.iter().map(|r| r.temp_avg).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "temp_min".into(),
            rows.iter().map(|r| r.temp_min).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "temp_max".into(),
            rows.iter().map(|r| r.temp_max).collect::<Vec<_>>(),
        )
        .into(),
    ])
}

/// Inverse of [`observations_to_frame`]. A snapshot never holds a null
/// station or date, so finding one is an error.
pub(crate) fn observations_from_frame(df: &DataFrame) -> PolarsResult<Vec<DailyObservation>> {
    let station = df.column("station")?.str()?;
    let dates = dates_from_column(df, "date")?;
    let temp_avg = df.column("temp_avg")?.f64()?;
    let temp_min = df.column("temp_min")?.f64()?;
    let temp_max = df.column("temp_max")?.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    for (i, date) in dates.into_iter().enumerate() {
        let (Some(station_id), Some(date)) = (station.get(i), date) else {
            return Err(PolarsError::ComputeError(
                format!("snapshot row {} has no station or date", i).into(),
            ));
        };
        rows.push(DailyObservation {
            station_id: station_id.to_string(),
            date,
            temp_avg: temp_avg.get(i),
            temp_min: temp_min.get(i),
            temp_max: temp_max.get(i),
        });
    }
    Ok(rows)
}

fn flag_column(values: impl Iterator<Item = Option<u8>>) -> Vec<Option<i32>> {
    values.map(|v| v.map(i32::from)).collect()
}

/// The enriched series in the column layout handed to the presentation layer.
pub(crate) fn enriched_to_frame(rows: &[EnrichedObservation]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            "station".into(),
            rows.iter().map(|r| r.station_id.as_str()).collect::<Vec<_>>(),
        )
        .into(),
        date_series("date", rows.iter().map(|r| r.date))?.into(),
        Series::new(
            "temp_avg".into(),
            rows.iter().map(|r| r.temp_avg).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "temp_min".into(),
            rows.iter().map(|r| r.temp_min).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "temp_max".into(),
            rows.iter().map(|r| r.temp_max).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "year".into(),
            rows.iter().map(|r| r.year).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "month".into(),
            rows.iter().map(|r| r.month as i32).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "day_of_year".into(),
            rows.iter().map(|r| r.day_of_year as i32).collect::<Vec<_>>(),
        )
        .into(),
        date_series("month_date", rows.iter().map(|r| r.month_date))?.into(),
        date_series("year_date", rows.iter().map(|r| r.year_date))?.into(),
        Series::new(
            "heating_days".into(),
            flag_column(rows.iter().map(|r| r.heating_days)),
        )
        .into(),
        Series::new(
            "cooling_days".into(),
            flag_column(rows.iter().map(|r| r.cooling_days)),
        )
        .into(),
        Series::new(
            "heating_deg_days".into(),
            rows.iter().map(|r| r.heating_deg_days).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "cooling_deg_days".into(),
            rows.iter().map(|r| r.cooling_deg_days).collect::<Vec<_>>(),
        )
        .into(),
    ])
}
