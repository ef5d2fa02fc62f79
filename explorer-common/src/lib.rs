//! # Explorer Common Library
//!
//! Shared code for the explorer services including:
//! - Database schema, models and reference-attribute definitions
//! - Bootstrap configuration loading
//! - Bearer token and password primitives
//! - Common error type

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use db::models::ReferenceKind;
pub use error::{Error, Result};
