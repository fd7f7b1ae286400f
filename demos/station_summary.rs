use chrono::{Datelike, Utc};
use nbcn_climate::{LatLon, Nbcn, NbcnError, Resolution, SpiralMode};
use std::env;

#[tokio::main]
async fn main() -> Result<(), NbcnError> {
    configure_polars_display();
    let client = Nbcn::new().await?;

    let nearest = client
        .find_stations()
        .location(LatLon(47.3769, 8.5417))
        .station_limit(1)
        .call()
        .await?;
    let Some(station) = nearest.first() else {
        println!("No NBCN station near Zurich");
        return Ok(());
    };
    println!("{} ({})", station.name, station.id);

    let view = client.station_view(&station.id).await?;
    if let Some(summary) = view.summary() {
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
    }

    let yearly = view
        .within_years(1900, 2023)
        .aggregate(Resolution::Year)
        .map_err(nbcn_climate::SeriesError::from)?;
    println!("{:#?}", yearly);

    let spiral = client.spiral(&view, SpiralMode::DeviationFromNormal, Utc::now().year());
    if let Some(last) = spiral.last() {
        println!(
            "{}-{:02}: {:+.2} °C against the pre-1900 normal",
            last.year,
            last.month,
            last.value.unwrap_or(f64::NAN)
        );
    }

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
