pub mod bridge;
pub mod config;
pub mod error;
pub mod origin;
pub mod report;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
