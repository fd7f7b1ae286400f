use polars::prelude::{col, lit, LazyFrame, SortMultipleOptions};

/// Lazy filters and aggregations over a frame with the enriched column layout.
pub trait ClimateFrameExt {
    /// Keeps the rows of a single station.
    fn filter_station(self, station_id: &str) -> LazyFrame;

    /// Filters by the `year` column (inclusive on both ends).
    ///
    /// # Arguments
    /// * `start_year`: The first year to keep.
    /// * `end_year`: The last year to keep.
    fn filter_years(self, start_year: i32, end_year: i32) -> LazyFrame;

    /// Mean `temp_avg` per `(year, month, month_date)`, sorted chronologically.
    /// A month whose days are all missing has a null mean.
    fn mean_by_month(self) -> LazyFrame;

    /// Mean `temp_avg` per `(year, year_date)`, sorted chronologically.
    fn mean_by_year(self) -> LazyFrame;
}

impl ClimateFrameExt for LazyFrame {
    fn filter_station(self, station_id: &str) -> LazyFrame {
        self.filter(col("station").eq(lit(station_id)))
    }

    fn filter_years(self, start_year: i32, end_year: i32) -> LazyFrame {
        self.filter(
            col("year")
                .gt_eq(lit(start_year))
                .and(col("year").lt_eq(lit(end_year))),
        )
    }

    fn mean_by_month(self) -> LazyFrame {
        self.group_by([col("year"), col("month"), col("month_date")])
            .agg([col("temp_avg").mean()])
            .sort_by_exprs([col("year"), col("month")], SortMultipleOptions::default())
    }

    fn mean_by_year(self) -> LazyFrame {
        self.group_by([col("year"), col("year_date")])
            .agg([col("temp_avg").mean()])
            .sort_by_exprs([col("year")], SortMultipleOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::engine::DerivedColumnEngine;
    use crate::series::frame::enriched_to_frame;
    use crate::types::observation::DailyObservation;
    use chrono::NaiveDate;
    use polars::prelude::IntoLazy;

    fn frame() -> LazyFrame {
        let days = [
            ("BAS", 2001, 2, 1, Some(2.0)),
            ("BAS", 2000, 1, 2, Some(1.0)),
            ("BAS", 2000, 1, 1, Some(3.0)),
            ("BAS", 2000, 2, 1, None),
            ("SMA", 2000, 1, 1, Some(-5.0)),
        ];
        let rows: Vec<_> = days
            .iter()
            .map(|(id, y, m, d, t)| DailyObservation {
                station_id: id.to_string(),
                date: NaiveDate::from_ymd_opt(*y, *m, *d).unwrap(),
                temp_avg: *t,
                temp_min: None,
                temp_max: None,
            })
            .collect();
        let enriched = DerivedColumnEngine::default().enrich(&rows);
        enriched_to_frame(&enriched).unwrap().lazy()
    }

    #[test]
    fn test_filter_station_and_years() {
        let df = frame()
            .filter_station("BAS")
            .filter_years(2000, 2000)
            .collect()
            .unwrap();
        assert_eq!(df.height(), 3);
        let years = df.column("year").unwrap().i32().unwrap();
        assert!(years.into_iter().all(|y| y == Some(2000)));
    }

    #[test]
    fn test_mean_by_month_sorted_with_null_month() {
        let df = frame().filter_station("BAS").mean_by_month().collect().unwrap();
        assert_eq!(df.height(), 3);

        let months: Vec<_> = df.column("month").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(months, vec![Some(1), Some(2), Some(2)]);

        let means: Vec<_> = df
            .column("temp_avg")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(means, vec![Some(2.0), None, Some(2.0)]);
    }

    #[test]
    fn test_mean_by_year() {
        let df = frame().filter_station("BAS").mean_by_year().collect().unwrap();
        let years: Vec<_> = df.column("year").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(years, vec![Some(2000), Some(2001)]);
        let means: Vec<_> = df
            .column("temp_avg")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(means, vec![Some(2.0), Some(2.0)]);
    }
}
