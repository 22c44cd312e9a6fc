//! Core error types for the RQL engine
//!
//! Every grammar or conversion violation is a distinct variant so callers can
//! decide whether a failure is user-facing (a raw filter string rejected) or a
//! programming error (a malformed literal assembled internally).

use thiserror::Error;

/// Errors raised while parsing, converting, or seeding RQL strings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RqlError {
    #[error("Illegal operator: {symbol}")]
    IllegalOperator { symbol: String },

    #[error("Cannot mix & and | within a group, parenthesize each set of like conjunctions")]
    MixedConjunction,

    #[error("Unclosed parenthesis group")]
    UnclosedGroup,

    #[error("Unmatched closing parenthesis")]
    UnmatchedCloseParen,

    #[error("Illegal character(s) in query: {remainder}")]
    IllegalCharacter { remainder: String },

    #[error("Invalid number: {token}")]
    InvalidNumber { token: String },

    #[error("Invalid date: {token}")]
    InvalidDate { token: String },

    #[error("Invalid regular expression: {pattern}")]
    InvalidRegex { pattern: String },

    #[error("Unknown converter: {name}")]
    UnknownConverter { name: String },

    #[error("Query must not start with '?'")]
    LeadingQuestionMark,
}

impl RqlError {
    /// Stable machine-readable code for each error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            RqlError::IllegalOperator { .. } => "illegal_operator",
            RqlError::MixedConjunction => "mixed_conjunction",
            RqlError::UnclosedGroup => "unclosed_group",
            RqlError::UnmatchedCloseParen => "unmatched_close_paren",
            RqlError::IllegalCharacter { .. } => "illegal_character",
            RqlError::InvalidNumber { .. } => "invalid_number",
            RqlError::InvalidDate { .. } => "invalid_date",
            RqlError::InvalidRegex { .. } => "invalid_regex",
            RqlError::UnknownConverter { .. } => "unknown_converter",
            RqlError::LeadingQuestionMark => "leading_question_mark",
        }
    }

    /// Whether the failure came from the query grammar rather than a value
    pub fn is_grammar_error(&self) -> bool {
        matches!(
            self,
            RqlError::IllegalOperator { .. }
                | RqlError::MixedConjunction
                | RqlError::UnclosedGroup
                | RqlError::UnmatchedCloseParen
                | RqlError::IllegalCharacter { .. }
                | RqlError::LeadingQuestionMark
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = RqlError::IllegalOperator {
            symbol: "=~".to_string(),
        };
        assert_eq!(err.error_code(), "illegal_operator");
        assert!(err.is_grammar_error());

        let err = RqlError::InvalidNumber {
            token: "abc".to_string(),
        };
        assert_eq!(err.error_code(), "invalid_number");
        assert!(!err.is_grammar_error());
    }

    #[test]
    fn test_error_display() {
        let err = RqlError::IllegalCharacter {
            remainder: ";drop".to_string(),
        };
        assert_eq!(err.to_string(), "Illegal character(s) in query: ;drop");
    }
}
