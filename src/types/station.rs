//! Defines the data structures representing NBCN climate stations as listed in
//! the MeteoSwiss station registry. Also includes the implementations needed
//! for spatial indexing with the `rstar` crate.

use chrono::NaiveDate;
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::types::data_source::SourceKind;

/// A single station of the Swiss National Basic Climatological Network.
///
/// Loaded once from the station registry and read-only afterwards.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StationRecord {
    /// Station abbreviation used in the data files (e.g. "BAS").
    pub id: String,
    /// Display name (e.g. "Basel / Binningen").
    pub name: String,
    /// WIGOS identifier, if listed.
    pub wigos_id: Option<String>,
    /// Date from which the station provides data ("Data since" column).
    pub registration_date: Option<NaiveDate>,
    /// Elevation in meters above sea level.
    pub elevation: Option<f64>,
    /// Swiss grid easting.
    pub x: Option<f64>,
    /// Swiss grid northing.
    pub y: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub climate_region: Option<String>,
    pub canton: Option<String>,
    /// URL of the frozen, verified data of the previous years.
    pub historical_source_url: String,
    /// URL of the still-updating data of the current year.
    pub current_source_url: String,
}

impl StationRecord {
    /// URL of the resource holding the requested portion of the record.
    pub fn source_url(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Historical => &self.historical_source_url,
            SourceKind::Current => &self.current_source_url,
        }
    }

    pub(crate) fn coordinates(&self) -> Option<[f64; 2]> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some([lat, lon]),
            _ => None,
        }
    }
}

// --- R-Tree Implementations ---

/// A station with known coordinates, as stored in the locator's R-tree.
#[derive(Debug, Clone)]
pub(crate) struct IndexedStation {
    pub point: [f64; 2],
    pub station: StationRecord,
}

impl IndexedStation {
    pub fn new(station: &StationRecord) -> Option<Self> {
        station.coordinates().map(|point| Self {
            point,
            station: station.clone(),
        })
    }
}

impl RTreeObject for IndexedStation {
    type Envelope = AABB<[f64; 2]>;

    /// A station is a point, so its envelope is the degenerate box around
    /// (latitude, longitude).
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for IndexedStation {
    /// Squared Euclidean distance in degrees. Only used to order R-tree
    /// candidates; the reported distance is haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

#[cfg(test)]
pub(crate) fn sample_station(id: &str, lat: f64, lon: f64) -> StationRecord {
    StationRecord {
        id: id.to_string(),
        name: format!("Station {id}"),
        wigos_id: None,
        registration_date: None,
        elevation: Some(300.0),
        x: None,
        y: None,
        latitude: Some(lat),
        longitude: Some(lon),
        climate_region: None,
        canton: None,
        historical_source_url: format!("https://test.invalid/{id}_previous.csv"),
        current_source_url: format!("https://test.invalid/{id}_current.csv"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_url_by_kind() {
        let s = sample_station("BAS", 47.54, 7.58);
        assert!(s.source_url(SourceKind::Historical).ends_with("_previous.csv"));
        assert!(s.source_url(SourceKind::Current).ends_with("_current.csv"));
    }

    #[test]
    fn test_station_without_coordinates_is_not_indexed() {
        let mut s = sample_station("SAE", 47.25, 9.34);
        assert!(IndexedStation::new(&s).is_some());
        s.longitude = None;
        assert!(IndexedStation::new(&s).is_none());
    }
}
