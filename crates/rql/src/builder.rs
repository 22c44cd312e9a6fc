//! Fluent RQL builder
//!
//! Builds a query string operator by operator. The builder keeps no tree:
//! its only state is the accumulated string and the resolved double-encode
//! policy. A caller-supplied seed string is re-validated through the parser
//! before any mutation, so the builder never extends malformed input.

use rql_core::config::RqlConfig;
use rql_core::result::RqlResult;
use serde::{Deserialize, Serialize};

use crate::encode::encode_value;
use crate::parser;

/// Construction options for a builder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderOptions {
    /// Seed query string, re-validated before use (a leading `?` is stripped)
    pub rql: Option<String>,
    /// Per-builder override of the double-encode default
    pub double_encode: Option<bool>,
}

/// Hands out builders carrying configured defaults
///
/// Resolve the encoding policy once at startup and construct every builder
/// through the factory; the policy then travels with each instance instead
/// of living in shared mutable state.
#[derive(Debug, Clone, Default)]
pub struct RqlBuilderFactory {
    config: RqlConfig,
}

impl RqlBuilderFactory {
    pub fn new(config: RqlConfig) -> Self {
        Self { config }
    }

    /// Create an empty builder with the configured defaults
    pub fn builder(&self) -> RqlBuilder {
        RqlBuilder {
            rql: String::new(),
            double_encode: self.config.double_encode,
        }
    }

    /// Create a builder seeded from an existing query string
    pub fn from_rql(&self, rql: impl Into<String>) -> RqlResult<RqlBuilder> {
        RqlBuilder::with_options(BuilderOptions {
            rql: Some(rql.into()),
            double_encode: Some(self.config.double_encode),
        })
    }
}

/// Chainable builder for RQL query strings
#[derive(Debug, Clone)]
pub struct RqlBuilder {
    rql: String,
    double_encode: bool,
}

impl Default for RqlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RqlBuilder {
    /// Create an empty builder with double encoding on
    pub fn new() -> Self {
        Self {
            rql: String::new(),
            double_encode: true,
        }
    }

    /// Create a builder seeded from an existing query string
    ///
    /// The seed is validated through the parser; grammar errors surface
    /// verbatim.
    pub fn from_rql(rql: impl Into<String>) -> RqlResult<Self> {
        Self::with_options(BuilderOptions {
            rql: Some(rql.into()),
            double_encode: None,
        })
    }

    /// Create a builder from explicit options
    pub fn with_options(options: BuilderOptions) -> RqlResult<Self> {
        let mut builder = Self::new();
        if let Some(double_encode) = options.double_encode {
            builder.double_encode = double_encode;
        }
        if let Some(seed) = options.rql {
            let seed = match seed.strip_prefix('?') {
                Some(stripped) => stripped.to_string(),
                None => seed,
            };
            if !seed.is_empty() {
                parser::parse(&seed)?;
            }
            builder.rql = seed;
        }
        Ok(builder)
    }

    /// Override the double-encode policy for subsequent values
    pub fn double_encode(mut self, double_encode: bool) -> Self {
        self.double_encode = double_encode;
        self
    }

    fn encode(&self, value: &str) -> String {
        encode_value(value, self.double_encode)
    }

    fn append(mut self, operation: &str, args: &str) -> Self {
        if !self.rql.is_empty() {
            self.rql.push('&');
        }
        self.rql.push_str(operation);
        self.rql.push('(');
        self.rql.push_str(args);
        self.rql.push(')');
        self
    }

    fn encoded_list<I, S>(&self, items: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        items
            .into_iter()
            .map(|item| self.encode(item.as_ref()))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn comparison(self, operation: &str, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let args = format!("{},{}", self.encode(field.as_ref()), self.encode(value.as_ref()));
        self.append(operation, &args)
    }

    /// Project the listed fields: `select(name,id)`
    pub fn select<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = self.encoded_list(fields);
        self.append("select", &joined)
    }

    /// Sort by the listed fields, `-` prefix for descending: `sort(-name)`
    pub fn sort<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = self.encoded_list(fields);
        self.append("sort", &joined)
    }

    pub fn eq(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("eq", field, value)
    }

    pub fn ne(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("ne", field, value)
    }

    pub fn gt(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("gt", field, value)
    }

    pub fn ge(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("ge", field, value)
    }

    pub fn lt(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("lt", field, value)
    }

    pub fn le(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("le", field, value)
    }

    pub fn like(self, field: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.comparison("like", field, value)
    }

    /// Match any of the listed values: `in(field,v1,v2)`
    pub fn in_<I, S>(self, field: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = format!("{},{}", self.encode(field.as_ref()), self.encoded_list(values));
        self.append("in", &args)
    }

    /// Match none of the listed values: `out(field,v1,v2)`
    pub fn out<I, S>(self, field: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = format!("{},{}", self.encode(field.as_ref()), self.encoded_list(values));
        self.append("out", &args)
    }

    /// Set the page size and optional offset, replacing any existing
    /// `limit(...)` clause in place
    ///
    /// A query carries at most one limit clause; pagination code routinely
    /// inherits one from a previous page link and re-derives the offset.
    pub fn limit(mut self, count: usize, offset: impl Into<Option<usize>>) -> Self {
        let clause = match offset.into() {
            Some(offset) => format!("limit({},{})", count, offset),
            None => format!("limit({})", count),
        };
        if let Some((start, end)) = find_clause(&self.rql, "limit") {
            self.rql.replace_range(start..end, &clause);
        } else {
            if !self.rql.is_empty() {
                self.rql.push('&');
            }
            self.rql.push_str(&clause);
        }
        self
    }

    /// Join pre-built intermediate fragments under `and(...)`
    pub fn and<I, S>(self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_fragments(expressions);
        self.append("and", &joined)
    }

    /// Join pre-built intermediate fragments under `or(...)`
    pub fn or<I, S>(self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_fragments(expressions);
        self.append("or", &joined)
    }

    /// Existence test on an array field: `contains(field)`
    pub fn contains(self, field: impl AsRef<str>) -> Self {
        let field = self.encode(field.as_ref());
        self.append("contains", &field)
    }

    /// Array field must hold an element matching every expression:
    /// `contains(field,and(expr,...))`
    pub fn contains_matching<I, S>(self, field: impl AsRef<str>, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = format!(
            "{},and({})",
            self.encode(field.as_ref()),
            join_fragments(expressions)
        );
        self.append("contains", &args)
    }

    /// Absence test on an array field: `excludes(field)`
    pub fn excludes(self, field: impl AsRef<str>) -> Self {
        let field = self.encode(field.as_ref());
        self.append("excludes", &field)
    }

    /// Array field must hold no element matching every expression:
    /// `excludes(field,and(expr,...))`
    pub fn excludes_matching<I, S>(self, field: impl AsRef<str>, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args = format!(
            "{},and({})",
            self.encode(field.as_ref()),
            join_fragments(expressions)
        );
        self.append("excludes", &args)
    }

    /// Ask the backend to skip the total-count computation
    pub fn skip_count(self) -> Self {
        self.append("skipCount", "")
    }

    /// Finish as a URL-ready query string with a `?` prefix
    ///
    /// Idempotent: an empty accumulator stays empty, an already-prefixed
    /// one is returned unchanged.
    pub fn build(&self) -> String {
        if self.rql.is_empty() || self.rql.starts_with('?') {
            self.rql.clone()
        } else {
            format!("?{}", self.rql)
        }
    }

    /// Finish as a bare fragment for embedding inside `and`/`or`/
    /// `contains`/`excludes`
    pub fn intermediate(&self) -> String {
        self.rql.clone()
    }
}

fn join_fragments<I, S>(expressions: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    expressions
        .into_iter()
        .map(|e| e.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Locate a `name(...)` clause by balanced-paren scan, returning its byte
/// range
///
/// Scanning parens explicitly keeps nested groups elsewhere in the string
/// from confusing the match.
fn find_clause(rql: &str, name: &str) -> Option<(usize, usize)> {
    let needle = format!("{}(", name);
    let mut search_from = 0;

    while let Some(found) = rql[search_from..].find(&needle) {
        let start = search_from + found;
        let preceded_ok =
            start == 0 || matches!(rql.as_bytes()[start - 1], b'&' | b'|' | b'(' | b',');
        if preceded_ok {
            let mut depth = 0usize;
            for (i, byte) in rql[start..].bytes().enumerate() {
                match byte {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some((start, start + i + 1));
                        }
                    }
                    _ => {}
                }
            }
            // unbalanced tail, treat the clause as absent
            return None;
        }
        search_from = start + needle.len();
    }
    None
}
