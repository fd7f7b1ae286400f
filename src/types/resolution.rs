use std::fmt;

/// Time resolution of a station view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    /// One row per observed day.
    #[default]
    Day,
    /// Mean `temp_avg` per `(year, month)`, anchored on `month_date`.
    Month,
    /// Mean `temp_avg` per year, anchored on `year_date`.
    Year,
}

impl Resolution {
    /// Name of the column holding the x-axis value of this resolution.
    pub fn time_column(&self) -> &'static str {
        match self {
            Resolution::Day => "date",
            Resolution::Month => "month_date",
            Resolution::Year => "year_date",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resolution::Day => "Day",
            Resolution::Month => "Month",
            Resolution::Year => "Year",
        };
        write!(f, "{}", name)
    }
}
