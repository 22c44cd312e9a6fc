//! # rql
//!
//! Resource Query Language engine: a URL-embeddable query DSL for filters,
//! sorting, pagination, and projections.
//!
//! The engine has two halves kept grammar-compatible by construction:
//!
//! - `parser` - validates a raw query string and decomposes it into a
//!   [`Term`] expression tree
//! - `builder` - incrementally constructs valid query strings through a
//!   chainable API, re-validating any seed string through the parser
//! - `convert` - converts raw query tokens into typed values
//! - `encode` - percent-encodes values so they survive transport
//!
//! ## Example
//!
//! ```
//! use rql::RqlBuilder;
//!
//! let query = RqlBuilder::new()
//!     .select(["name", "id"])
//!     .eq("status", "active")
//!     .limit(10, 15)
//!     .build();
//! assert_eq!(query, "?select(name,id)&eq(status,active)&limit(10,15)");
//!
//! // the parser accepts everything the builder emits
//! let term = rql::parse("select(name,id)&eq(status,active)&limit(10,15)").unwrap();
//! assert_eq!(term.name(), "and");
//! assert_eq!(term.limit_args().map(|args| args.len()), Some(2));
//! ```

pub mod builder;
pub mod convert;
pub mod encode;
pub mod parser;
pub mod term;

// Re-exports for convenience
pub use builder::{BuilderOptions, RqlBuilder, RqlBuilderFactory};
pub use convert::{convert_token, Converter};
pub use encode::encode_value;
pub use parser::{parse, parse_with_params};
pub use term::{QueryCache, Term, TermArg};

pub use rql_core::{RqlConfig, RqlError, RqlResult, Value};
