pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod feed;
pub mod pipeline;
