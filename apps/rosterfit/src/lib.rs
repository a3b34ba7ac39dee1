//! # rosterfit
//!
//! Application layer over `rosterfit-core`: roster fetching, TOML plan
//! files, the CLI and the HTTP API.

pub mod api;
pub mod cli;
pub mod config;
pub mod source;
