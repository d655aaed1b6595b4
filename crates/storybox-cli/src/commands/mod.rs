pub mod auth;
pub mod common;
pub mod completions;
pub mod config;
pub mod export;
pub mod maintenance;
pub mod push;
pub mod settings;
pub mod stories;
pub mod sync;
