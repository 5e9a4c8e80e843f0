pub mod adapter;
pub mod params;
