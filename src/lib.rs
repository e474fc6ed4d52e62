pub mod analytics;
pub mod config;
pub mod fetch;
pub mod loader;
pub mod number;
pub mod output;
