pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod links;
pub mod loader;
pub mod render;
pub mod review;
pub mod sources;
pub mod stats;
pub mod store;
pub mod submission;
pub mod templates;
