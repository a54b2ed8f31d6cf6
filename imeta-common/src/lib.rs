//! # imeta Common Library
//!
//! Shared code for the imeta workspace:
//! - Error types shared by library and binaries
//! - TOML configuration loading and source resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
