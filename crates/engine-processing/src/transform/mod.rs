pub mod canonical;
pub mod encoding;
pub mod filter;
pub mod mapping;
pub mod normalizer;
pub mod pipeline;
pub mod projection;
