pub mod filter;
pub mod mapping;
