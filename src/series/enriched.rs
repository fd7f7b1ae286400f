use crate::frames::station_view::StationView;
use crate::series::frame::enriched_to_frame;
use crate::types::observation::EnrichedObservation;
use polars::prelude::{DataFrame, IntoLazy, LazyFrame, PolarsResult};

/// The merged, enriched series of every loaded station.
///
/// Rows are in arrival order: all historical rows, then all current rows,
/// each portion in station order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedSeries {
    rows: Vec<EnrichedObservation>,
}

impl EnrichedSeries {
    pub fn new(rows: Vec<EnrichedObservation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedObservation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<EnrichedObservation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct station ids in order of first appearance.
    pub fn station_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !ids.contains(&row.station_id.as_str()) {
                ids.push(&row.station_id);
            }
        }
        ids
    }

    /// The series as a `DataFrame` with the enriched column layout.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        enriched_to_frame(&self.rows)
    }

    pub fn lazy(&self) -> PolarsResult<LazyFrame> {
        Ok(self.to_frame()?.lazy())
    }

    /// A view over one station's rows. The series itself is left untouched;
    /// an unknown id gives an empty view.
    pub fn select_station(&self, station_id: &str) -> StationView {
        StationView::new(
            station_id,
            self.rows
                .iter()
                .filter(|r| r.station_id == station_id)
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derived::engine::DerivedColumnEngine;
    use crate::types::observation::DailyObservation;
    use chrono::NaiveDate;

    fn series() -> EnrichedSeries {
        let rows: Vec<_> = [("SMA", 1890), ("BAS", 1890), ("SMA", 2024), ("BAS", 2024)]
            .iter()
            .map(|(id, year)| DailyObservation {
                station_id: id.to_string(),
                date: NaiveDate::from_ymd_opt(*year, 6, 1).unwrap(),
                temp_avg: Some(15.0),
                temp_min: None,
                temp_max: None,
            })
            .collect();
        EnrichedSeries::new(DerivedColumnEngine::default().enrich(&rows))
    }

    #[test]
    fn test_station_ids_in_first_seen_order() {
        assert_eq!(series().station_ids(), ["SMA", "BAS"]);
    }

    #[test]
    fn test_select_station_leaves_series_untouched() {
        let series = series();
        let before = series.clone();
        let view = series.select_station("BAS");

        assert_eq!(view.station_id(), "BAS");
        assert_eq!(view.rows().len(), 2);
        assert!(view.rows().iter().all(|r| r.station_id == "BAS"));
        assert_eq!(view.year_range(), Some((1890, 2024)));
        assert_eq!(series, before);
    }

    #[test]
    fn test_select_unknown_station_is_empty() {
        let view = series().select_station("XXX");
        assert!(view.is_empty());
        assert_eq!(view.year_range(), None);
    }

    #[test]
    fn test_to_frame_height() {
        assert_eq!(series().to_frame().unwrap().height(), 4);
    }
}
