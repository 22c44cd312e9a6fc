//! RQL parser / validator
//!
//! Validates a raw query string (without its leading `?`) and decomposes it
//! into a [`Term`] tree. Parsing runs in three passes: FIQL-style infix
//! comparators are rewritten into call syntax, bare slash-delimited tokens
//! become comma arrays, and a single anchored scan then walks the call
//! structure with an explicit stack of open groups. All grammar violations
//! raise typed errors; a partially-valid tree is never returned.

use regex::Regex;
use rql_core::error::RqlError;
use rql_core::result::RqlResult;
use rql_core::value::Value;
use std::sync::LazyLock;

use crate::convert::convert_token;
use crate::term::{QueryCache, Term, TermArg};

/// Infix comparator between a property and a value: `a>=b`, `price=gt=10`
static COMPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\([\w\-+*$:%._~']+\)|[\w\-+*$:%._~']*)([<>!]?=(?:[\w]*=)?|>|<)(\([\w\-+*$:%._~',]+\)|[\w\-+*$:%._~']*)",
    )
    .unwrap()
});

/// Bare slash-delimited token run outside parentheses: `a/b/c`
static SLASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w\-+*$:%._~']*/[\w\-+*$:%._~'/]*").unwrap());

/// One structural step: a closing paren, or an optional delimiter followed
/// by a token and an optional opening paren
static SCAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A(?:(\))|([&|,])?([\w\-+*$:%._~']*)(\()?)").unwrap());

/// Parse a raw RQL string into its expression tree
pub fn parse(raw: &str) -> RqlResult<Term> {
    parse_with_params(raw, &[])
}

/// Parse with a positional parameter array for `$n` substitution
pub fn parse_with_params(raw: &str, parameters: &[Value]) -> RqlResult<Term> {
    if raw.starts_with('?') {
        return Err(RqlError::LeadingQuestionMark);
    }
    let normalized = normalize_comparators(raw)?;
    let normalized = expand_slash_arrays(&normalized);
    walk(&normalized, parameters)
}

fn comparator_name(symbol: &str) -> RqlResult<&'static str> {
    match symbol {
        "=" | "==" => Ok("eq"),
        ">" => Ok("gt"),
        ">=" => Ok("ge"),
        "<" => Ok("lt"),
        "<=" => Ok("le"),
        "!=" => Ok("ne"),
        _ => Err(RqlError::IllegalOperator {
            symbol: symbol.to_string(),
        }),
    }
}

/// Rewrite FIQL infix comparators into call syntax: `a>=b` → `ge(a,b)`
fn normalize_comparators(query: &str) -> RqlResult<String> {
    let mut out = String::with_capacity(query.len());
    let mut last = 0;

    for caps in COMPARATOR.captures_iter(query) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let property = caps.get(1).map_or("", |m| m.as_str());
        let symbol = caps.get(2).map_or("", |m| m.as_str());
        let value = caps.get(3).map_or("", |m| m.as_str());

        // verbose =name= forms carry the operator name themselves,
        // anything shorter goes through the symbol table
        let name = if symbol.len() < 3 {
            comparator_name(symbol)?.to_string()
        } else {
            symbol[1..symbol.len() - 1].to_string()
        };

        out.push_str(&query[last..whole.start()]);
        out.push_str(&name);
        out.push('(');
        out.push_str(property);
        out.push(',');
        out.push_str(value);
        out.push(')');
        last = whole.end();
    }
    out.push_str(&query[last..]);
    Ok(out)
}

/// Rewrite the slash shorthand into an explicit array: `a/b/c` → `(a,b,c)`
fn expand_slash_arrays(query: &str) -> String {
    SLASHED
        .replace_all(query, |caps: &regex::Captures| {
            format!("({})", caps[0].replace('/', ","))
        })
        .into_owned()
}

/// An open group during the structural walk
struct Frame {
    /// Operator name; `None` for a bare grouping paren or an undecided
    /// conjunction level
    name: Option<String>,
    args: Vec<TermArg>,
}

impl Frame {
    fn root() -> Self {
        Self {
            name: None,
            args: Vec::new(),
        }
    }

    fn opened(token: &str) -> Self {
        Self {
            name: if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            },
            args: Vec::new(),
        }
    }
}

fn current(stack: &mut [Frame]) -> &mut Frame {
    // the walk never pops the root frame
    stack.last_mut().expect("frame stack holds the root frame")
}

fn set_conjunction(stack: &mut [Frame], conjunction: &str) -> RqlResult<()> {
    let frame = current(stack);
    match &frame.name {
        None => {
            frame.name = Some(conjunction.to_string());
            Ok(())
        }
        Some(name) if name == conjunction => Ok(()),
        Some(_) => Err(RqlError::MixedConjunction),
    }
}

fn close_group(stack: &mut Vec<Frame>, cache: &mut QueryCache) -> RqlResult<()> {
    if stack.len() == 1 {
        return Err(RqlError::UnmatchedCloseParen);
    }
    let frame = match stack.pop() {
        Some(frame) => frame,
        None => return Err(RqlError::UnmatchedCloseParen),
    };

    match frame.name {
        Some(name) => {
            let term = Term::from_parts(name, frame.args);
            update_cache(cache, &term);
            current(stack).args.push(TermArg::Term(term));
        }
        None => {
            // a bare comma group collapses to a plain value array; a group
            // holding sub-expressions keeps term shape under the implicit
            // conjunction
            if frame.args.iter().all(|arg| matches!(arg, TermArg::Value(_))) {
                let values = frame
                    .args
                    .into_iter()
                    .filter_map(|arg| match arg {
                        TermArg::Value(value) => Some(value),
                        TermArg::Term(_) => None,
                    })
                    .collect();
                current(stack).args.push(TermArg::Value(Value::List(values)));
            } else {
                current(stack)
                    .args
                    .push(TermArg::Term(Term::from_parts("and", frame.args)));
            }
        }
    }
    Ok(())
}

fn update_cache(cache: &mut QueryCache, term: &Term) {
    let leaf_values = || {
        term.args()
            .iter()
            .filter_map(|arg| arg.as_value().cloned())
            .collect::<Vec<_>>()
    };
    match term.name() {
        "sort" => cache.sort = Some(leaf_values()),
        "select" => cache.select = Some(leaf_values()),
        "limit" => cache.limit = Some(leaf_values()),
        "eq" => {
            if let [TermArg::Value(Value::String(field)), TermArg::Value(value), ..] = term.args() {
                if field.as_str() == "id" {
                    cache.id = Some(value.clone());
                }
            }
        }
        _ => {}
    }
}

fn walk(query: &str, parameters: &[Value]) -> RqlResult<Term> {
    let mut stack = vec![Frame::root()];
    let mut cache = QueryCache::default();
    let mut pos = 0;

    while pos < query.len() {
        let slice = &query[pos..];
        let caps = match SCAN.captures(slice) {
            Some(caps) => caps,
            None => {
                return Err(RqlError::IllegalCharacter {
                    remainder: slice.to_string(),
                })
            }
        };
        let consumed = caps.get(0).map_or(0, |m| m.len());
        if consumed == 0 {
            // the scan stalled on a character outside the grammar
            return Err(RqlError::IllegalCharacter {
                remainder: slice.to_string(),
            });
        }

        if caps.get(1).is_some() {
            close_group(&mut stack, &mut cache)?;
        } else {
            match caps.get(2).map(|m| m.as_str()) {
                Some("&") => set_conjunction(&mut stack, "and")?,
                Some("|") => set_conjunction(&mut stack, "or")?,
                // a comma only separates arguments
                _ => {}
            }

            let token = caps.get(3).map_or("", |m| m.as_str());
            if caps.get(4).is_some() {
                stack.push(Frame::opened(token));
            } else if !token.is_empty() {
                let value = convert_token(token, parameters)?;
                current(&mut stack).args.push(TermArg::Value(value));
            }
        }

        pos += consumed;
    }

    if stack.len() > 1 {
        return Err(RqlError::UnclosedGroup);
    }
    let root = match stack.pop() {
        Some(frame) => frame,
        None => Frame::root(),
    };
    // a query that never established a conjunction still gets the
    // structural default
    let name = root.name.unwrap_or_else(|| "and".to_string());
    Ok(Term::from_parts(name, root.args).with_cache(cache))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_term<'a>(root: &'a Term) -> &'a Term {
        root.args()[0].as_term().unwrap()
    }

    #[test]
    fn test_parse_call_syntax() {
        let root = parse("eq(name,tester)").unwrap();
        assert_eq!(root.name(), "and");
        assert_eq!(root.args().len(), 1);

        let eq = first_term(&root);
        assert_eq!(eq.name(), "eq");
        assert_eq!(eq.args()[0].as_value().unwrap().as_str(), Some("name"));
        assert_eq!(eq.args()[1].as_value().unwrap().as_str(), Some("tester"));
    }

    #[test]
    fn test_parse_empty_query() {
        let root = parse("").unwrap();
        assert_eq!(root.name(), "and");
        assert!(root.args().is_empty());
    }

    #[test]
    fn test_parse_typed_arguments() {
        let root = parse("eq(age,25)&eq(active,true)&eq(deleted,null)").unwrap();
        let terms = root.terms_named("eq");
        assert_eq!(terms[0].args()[1].as_value().unwrap(), &Value::Number(25.0));
        assert_eq!(terms[1].args()[1].as_value().unwrap(), &Value::Bool(true));
        assert_eq!(terms[2].args()[1].as_value().unwrap(), &Value::Null);
    }

    #[test]
    fn test_parse_date_argument() {
        let root = parse("eq(timestamp,1970-01-01T00:00:00.000Z)").unwrap();
        let eq = first_term(&root);
        let date = eq.args()[1].as_value().unwrap().as_date().unwrap();
        assert_eq!(date.timestamp_millis(), 0);
    }

    #[test]
    fn test_fiql_symbols_rewrite_to_call_syntax() {
        let root = parse("age>=21").unwrap();
        let ge = first_term(&root);
        assert_eq!(ge.name(), "ge");
        assert_eq!(ge.args()[0].as_value().unwrap().as_str(), Some("age"));
        assert_eq!(ge.args()[1].as_value().unwrap(), &Value::Number(21.0));

        let root = parse("name=tester").unwrap();
        assert_eq!(first_term(&root).name(), "eq");

        let root = parse("age!=21").unwrap();
        assert_eq!(first_term(&root).name(), "ne");
    }

    #[test]
    fn test_fiql_verbose_operator_is_used_verbatim() {
        let root = parse("price=between=(10,20)").unwrap();
        let term = first_term(&root);
        assert_eq!(term.name(), "between");
        assert_eq!(term.args()[0].as_value().unwrap().as_str(), Some("price"));
        let list = term.args()[1].as_value().unwrap().as_list().unwrap();
        assert_eq!(list, &[Value::Number(10.0), Value::Number(20.0)]);
    }

    #[test]
    fn test_slash_shorthand_becomes_array() {
        let root = parse("in(id,1/2/3)").unwrap();
        let term = first_term(&root);
        assert_eq!(term.name(), "in");
        let list = term.args()[1].as_value().unwrap().as_list().unwrap();
        assert_eq!(
            list,
            &[Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]
        );
    }

    #[test]
    fn test_comma_group_collapses_to_list() {
        let root = parse("in(id,(a,b,c))").unwrap();
        let term = first_term(&root);
        let list = term.args()[1].as_value().unwrap().as_list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].as_str(), Some("a"));
    }

    #[test]
    fn test_top_level_defaults_to_and() {
        assert_eq!(parse("eq(a,1)").unwrap().name(), "and");
        assert_eq!(parse("eq(a,1)&eq(b,2)").unwrap().name(), "and");
    }

    #[test]
    fn test_pipe_sets_or() {
        let root = parse("eq(a,1)|eq(b,2)").unwrap();
        assert_eq!(root.name(), "or");
        assert_eq!(root.args().len(), 2);
    }

    #[test]
    fn test_mixed_conjunctions_error() {
        assert_eq!(
            parse("eq(a,1)&eq(b,2)|eq(c,3)"),
            Err(RqlError::MixedConjunction)
        );
    }

    #[test]
    fn test_explicitly_grouped_conjunctions_parse() {
        let root = parse("or(eq(a,1),and(eq(b,2),eq(c,3)))").unwrap();
        let or = first_term(&root);
        assert_eq!(or.name(), "or");
        assert_eq!(or.args().len(), 2);
        let and = or.args()[1].as_term().unwrap();
        assert_eq!(and.name(), "and");
        assert_eq!(and.args().len(), 2);
    }

    #[test]
    fn test_parenthesized_conjunction_groups() {
        let root = parse("and((eq(a,1)|eq(b,2)),eq(c,3))").unwrap();
        let and = first_term(&root);
        let or = and.args()[0].as_term().unwrap();
        assert_eq!(or.name(), "or");
        assert_eq!(or.args().len(), 2);
    }

    #[test]
    fn test_unclosed_group_errors() {
        assert_eq!(
            parse("or((like(name,btfit))"),
            Err(RqlError::UnclosedGroup)
        );
    }

    #[test]
    fn test_unmatched_close_paren_errors() {
        assert_eq!(parse("eq(a,1))"), Err(RqlError::UnmatchedCloseParen));
    }

    #[test]
    fn test_leading_question_mark_errors() {
        assert_eq!(
            parse("?eq(a,1)"),
            Err(RqlError::LeadingQuestionMark)
        );
    }

    #[test]
    fn test_leftover_characters_error() {
        let err = parse("eq(a,1);drop").unwrap_err();
        assert_eq!(
            err,
            RqlError::IllegalCharacter {
                remainder: ";drop".to_string()
            }
        );
    }

    #[test]
    fn test_cache_tracks_sort_select_limit_and_id() {
        let root = parse("select(name,id)&sort(-name)&limit(10,15)&eq(id,42)").unwrap();

        assert_eq!(
            root.select_args(),
            Some(&[Value::from("name"), Value::from("id")][..])
        );
        assert_eq!(root.sort_args(), Some(&[Value::from("-name")][..]));
        assert_eq!(
            root.limit_args(),
            Some(&[Value::Number(10.0), Value::Number(15.0)][..])
        );
        assert_eq!(root.id_value(), Some(&Value::Number(42.0)));
    }

    #[test]
    fn test_cache_keeps_most_recent_clause() {
        let root = parse("limit(5,0)&limit(10,15)").unwrap();
        assert_eq!(
            root.limit_args(),
            Some(&[Value::Number(10.0), Value::Number(15.0)][..])
        );
    }

    #[test]
    fn test_parameter_substitution() {
        let params = [Value::from("tester"), Value::from(7i64)];
        let root = parse_with_params("eq(name,$1)&eq(level,$2)&eq(ghost,$9)", &params).unwrap();
        let terms = root.terms_named("eq");
        assert_eq!(terms[0].args()[1].as_value().unwrap().as_str(), Some("tester"));
        assert_eq!(terms[1].args()[1].as_value().unwrap(), &Value::Number(7.0));
        assert_eq!(terms[2].args()[1].as_value().unwrap(), &Value::Undefined);
    }

    #[test]
    fn test_sort_prefixes_survive() {
        let root = parse("sort(-created,+name)").unwrap();
        assert_eq!(
            root.sort_args(),
            Some(&[Value::from("-created"), Value::from("+name")][..])
        );
    }

    #[test]
    fn test_zero_argument_marker() {
        let root = parse("skipCount()").unwrap();
        let term = first_term(&root);
        assert_eq!(term.name(), "skipCount");
        assert!(term.args().is_empty());
    }

    #[test]
    fn test_illegal_short_operator_symbol() {
        // the symbol table is closed for short comparators
        assert!(matches!(
            comparator_name("=~"),
            Err(RqlError::IllegalOperator { .. })
        ));
    }

    #[test]
    fn test_converter_errors_surface() {
        assert_eq!(
            parse("eq(count,number:abc)"),
            Err(RqlError::InvalidNumber {
                token: "abc".to_string()
            })
        );
    }
}
