pub mod broker;
pub mod config;
pub mod error;
pub mod repository;
pub mod sync;
pub mod utils;

#[cfg(test)]
pub mod test_utils;
