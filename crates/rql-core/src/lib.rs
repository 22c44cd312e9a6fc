//! # rql-core
//!
//! Core types for the RQL engine.
//!
//! This crate provides the foundational building blocks used by the parser
//! and builder crates:
//! - Typed error taxonomy
//! - Result type alias
//! - Typed leaf values
//! - Encoding configuration

pub mod config;
pub mod error;
pub mod result;
pub mod value;

pub use config::*;
pub use error::*;
pub use result::*;
pub use value::*;
