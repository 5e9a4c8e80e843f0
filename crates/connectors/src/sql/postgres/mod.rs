pub mod adapter;
pub mod coercion;
pub mod params;
pub mod utils;
