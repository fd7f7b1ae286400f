pub mod station_view;
