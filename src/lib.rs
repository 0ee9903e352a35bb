pub mod config;
pub mod download;
pub mod enumerate;
pub mod error;
pub mod follow;
pub mod provider;
pub mod utils;
