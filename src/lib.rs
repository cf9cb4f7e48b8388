pub mod config;
pub mod engine;
pub mod feed;
pub mod notify;
pub mod runtime;
pub mod store;
pub mod tui;
