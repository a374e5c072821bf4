pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod handler;
pub mod message;
pub mod metrics;
pub mod middleware;
pub mod processor;
pub mod routing;
pub mod server;
