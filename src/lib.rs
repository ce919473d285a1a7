pub mod config;
pub mod http;
pub mod pipeline;
pub mod strategy;
