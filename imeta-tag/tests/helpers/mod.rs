//! Test Helper Utilities
//!
//! Shared image builders for imeta-tag integration tests

#![allow(dead_code)]

pub mod images;

pub use images::{bare_jpeg, jpeg_with_comment, jpeg_with_comment_bytes, jpeg_with_make, sample_context};
