pub mod config;
pub mod job;
pub mod migrate;
pub mod password;
