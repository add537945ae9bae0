//! CLI command implementations.

pub mod common;
pub mod config;
pub mod env;
pub mod overlay;
pub mod probe;
pub mod tile_url;
