pub mod config;
pub mod logging;

// Core modules
pub mod download;
pub mod error;
pub mod executor;
pub mod item;
pub mod queue;
pub mod task;
