//! Parsed expression tree
//!
//! A `Term` is one operator call: a name plus ordered arguments, where each
//! argument is either a typed leaf value or a nested term. The tree is plain
//! parent-free data; parse-time bookkeeping never leaks into it.

use rql_core::value::Value;

/// One argument of a term
#[derive(Debug, Clone, PartialEq)]
pub enum TermArg {
    Value(Value),
    Term(Term),
}

impl TermArg {
    /// Get as leaf value
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            TermArg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Get as nested term
    pub fn as_term(&self) -> Option<&Term> {
        match self {
            TermArg::Term(term) => Some(term),
            _ => None,
        }
    }
}

/// Lookup cache maintained on the top-level term
///
/// Holds the most recently seen `sort` / `select` / `limit` argument lists
/// and the cached primary-key equality value, so callers who only need
/// "what did this query sort by" never walk the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCache {
    pub sort: Option<Vec<Value>>,
    pub select: Option<Vec<Value>>,
    pub limit: Option<Vec<Value>>,
    pub id: Option<Value>,
}

/// A node in the parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    name: String,
    args: Vec<TermArg>,
    // populated on the top-level term only
    cache: QueryCache,
}

impl Term {
    pub(crate) fn from_parts(name: impl Into<String>, args: Vec<TermArg>) -> Self {
        Self {
            name: name.into(),
            args,
            cache: QueryCache::default(),
        }
    }

    pub(crate) fn with_cache(mut self, cache: QueryCache) -> Self {
        self.cache = cache;
        self
    }

    /// Build the implicit AND-of-equalities tree from key/value pairs
    ///
    /// This is the structured-input convenience: callers holding a plain map
    /// of field constraints get the same tree shape a parsed
    /// `eq(k1,v1)&eq(k2,v2)` string would produce.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut cache = QueryCache::default();
        let mut args = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            if key == "id" {
                cache.id = Some(value.clone());
            }
            args.push(TermArg::Term(Term::from_parts(
                "eq",
                vec![TermArg::Value(Value::String(key)), TermArg::Value(value)],
            )));
        }
        Term::from_parts("and", args).with_cache(cache)
    }

    /// Operator name (`eq`, `and`, `sort`, …)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered arguments
    pub fn args(&self) -> &[TermArg] {
        &self.args
    }

    /// Lookup cache (meaningful on the top-level term)
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Cached `sort` arguments, if the query has a sort clause
    pub fn sort_args(&self) -> Option<&[Value]> {
        self.cache.sort.as_deref()
    }

    /// Cached `select` arguments, if the query has a projection
    pub fn select_args(&self) -> Option<&[Value]> {
        self.cache.select.as_deref()
    }

    /// Cached `limit` arguments, if the query has a limit clause
    pub fn limit_args(&self) -> Option<&[Value]> {
        self.cache.limit.as_deref()
    }

    /// Cached primary-key equality value, if the query filters on `id`
    pub fn id_value(&self) -> Option<&Value> {
        self.cache.id.as_ref()
    }

    /// Collect every term with the given operator name, depth first
    pub fn terms_named<'a>(&'a self, name: &str) -> Vec<&'a Term> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Term>) {
        if self.name == name {
            found.push(self);
        }
        for arg in &self.args {
            if let TermArg::Term(term) = arg {
                term.collect_named(name, found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_builds_and_of_equalities() {
        let term = Term::from_pairs([
            ("name".to_string(), Value::from("tester")),
            ("id".to_string(), Value::from(42i64)),
        ]);

        assert_eq!(term.name(), "and");
        assert_eq!(term.args().len(), 2);

        let first = term.args()[0].as_term().unwrap();
        assert_eq!(first.name(), "eq");
        assert_eq!(
            first.args()[0].as_value().unwrap().as_str(),
            Some("name")
        );
        assert_eq!(
            first.args()[1].as_value().unwrap().as_str(),
            Some("tester")
        );

        assert_eq!(term.id_value(), Some(&Value::Number(42.0)));
    }

    #[test]
    fn test_from_pairs_empty() {
        let term = Term::from_pairs(Vec::<(String, Value)>::new());
        assert_eq!(term.name(), "and");
        assert!(term.args().is_empty());
        assert!(term.id_value().is_none());
    }

    #[test]
    fn test_terms_named_walks_nested_terms() {
        let inner = Term::from_parts(
            "eq",
            vec![
                TermArg::Value(Value::from("a")),
                TermArg::Value(Value::from(1i64)),
            ],
        );
        let wrapper = Term::from_parts("or", vec![TermArg::Term(inner)]);
        let root = Term::from_parts("and", vec![TermArg::Term(wrapper)]);

        assert_eq!(root.terms_named("eq").len(), 1);
        assert_eq!(root.terms_named("or").len(), 1);
        assert!(root.terms_named("sort").is_empty());
    }
}
