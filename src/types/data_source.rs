//! Defines which portion of a station's record is requested and the fixed
//! positional schemas of the upstream CSV files.

use std::fmt;

/// The two remote resources published for every station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Frozen, verified data of the previous years. Large and static, so it is
    /// fetched from origin once and then read from the local snapshot.
    Historical,
    /// Data of the current year, updated daily. Always fetched fresh.
    Current,
}

impl SourceKind {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            SourceKind::Historical => "historical",
            SourceKind::Current => "current",
        }
    }
}

/// Allows formatting a `SourceKind` using its label.
///
/// # Examples
///
/// ```
/// use nbcn_climate::SourceKind;
///
/// assert_eq!(SourceKind::Historical.to_string(), "historical");
/// assert_eq!(format!("{}", SourceKind::Current), "current");
/// ```
impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Column names assigned by position to a per-station data file. Only
/// `station`, `date` and the three temperatures are kept.
pub(crate) const SERIES_COLUMNS: [&str; 12] = [
    "station",
    "date",
    "radiation",
    "snowpack",
    "cloud_cover",
    "pressure",
    "precip",
    "sunshine_dur",
    "temp_avg",
    "temp_min",
    "temp_max",
    "humidity",
];

/// Column names assigned by position to the station registry.
pub(crate) const REGISTRY_COLUMNS: [&str; 13] = [
    "station",
    "id",
    "wigos_id",
    "data_since",
    "station_elev_masl",
    "x",
    "y",
    "latitude",
    "longitude",
    "climate_region",
    "canton",
    "url_verified_data",
    "url_current_data",
];
