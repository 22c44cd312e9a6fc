//! Result type alias for RQL operations

use crate::error::RqlError;

/// Standard Result type for parsing, conversion, and builder seeding
pub type RqlResult<T> = Result<T, RqlError>;
