use crate::types::station::{IndexedStation, StationRecord};
use haversine::{distance, Location as HaversineLocation, Units};
use log::debug;
use ordered_float::OrderedFloat;
use rstar::RTree;

/// Nearest-station queries over the registry coordinates.
#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<IndexedStation>,
}

impl StationLocator {
    /// Indexes every station that has both a latitude and a longitude.
    pub fn new(stations: &[StationRecord]) -> Self {
        let indexed: Vec<IndexedStation> = stations.iter().filter_map(IndexedStation::new).collect();
        if indexed.len() < stations.len() {
            debug!(
                "{} of {} stations have no coordinates and are not indexed",
                stations.len() - indexed.len(),
                stations.len()
            );
        }
        Self {
            rtree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Up to `n_results` stations within `max_distance_km` of the point,
    /// closest first, with their haversine distance in km.
    pub fn query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
    ) -> Vec<(StationRecord, f64)> {
        if n_results == 0 {
            return vec![];
        }
        let query_point = [latitude, longitude];

        // Degree distance and km distance disagree away from the equator, so
        // take more candidates than asked for before the exact filter.
        let candidate_limit = (n_results * 2).max(20);

        let mut stations_with_dist: Vec<(StationRecord, f64)> = self
            .rtree
            .nearest_neighbor_iter(&query_point)
            .take(candidate_limit)
            .filter_map(|indexed| {
                let dist_km = distance(
                    HaversineLocation {
                        latitude,
                        longitude,
                    },
                    HaversineLocation {
                        latitude: indexed.point[0],
                        longitude: indexed.point[1],
                    },
                    Units::Kilometers,
                );
                (dist_km <= max_distance_km).then(|| (indexed.station.clone(), dist_km))
            })
            .collect();

        stations_with_dist.sort_by_key(|(_, d)| OrderedFloat(*d));
        stations_with_dist.truncate(n_results);
        stations_with_dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::station::sample_station;

    fn locator() -> StationLocator {
        let mut no_coords = sample_station("XXX", 0.0, 0.0);
        no_coords.latitude = None;
        StationLocator::new(&[
            sample_station("BAS", 47.541, 7.584),
            sample_station("SMA", 47.378, 8.566),
            sample_station("BER", 46.991, 7.464),
            sample_station("LUG", 46.004, 8.960),
            sample_station("GVE", 46.248, 6.128),
            no_coords,
        ])
    }

    fn validate_results(results: &[(StationRecord, f64)], expected_max_len: usize, max_distance_km: f64) {
        assert!(results.len() <= expected_max_len);
        let mut last_dist = -1.0;
        for (station, dist) in results {
            assert!(
                *dist <= max_distance_km + 1e-9,
                "{} distance {} > max {}",
                station.id,
                dist,
                max_distance_km
            );
            assert!(*dist >= last_dist - 1e-9);
            last_dist = *dist;
        }
    }

    #[test]
    fn test_stations_without_coordinates_are_skipped() {
        assert_eq!(locator().len(), 5);
    }

    #[test]
    fn test_nearest_to_zurich() {
        let results = locator().query(47.3769, 8.5417, 2, 500.0);
        validate_results(&results, 2, 500.0);
        assert_eq!(results[0].0.id, "SMA");
        assert!(results[0].1 < 5.0);
        assert_eq!(results[1].0.id, "BAS");
    }

    #[test]
    fn test_radius_limits_results() {
        let results = locator().query(46.2044, 6.1432, 5, 50.0);
        validate_results(&results, 5, 50.0);
        let ids: Vec<_> = results.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, ["GVE"]);
    }

    #[test]
    fn test_no_results() {
        let l = locator();
        assert!(l.query(0.0, 0.0, 5, 1.0).is_empty());
        assert!(l.query(47.0, 8.0, 0, 500.0).is_empty());
    }
}
