//! Build-direction value encoding
//!
//! Values appended by the builder are percent-encoded so that RQL grammar
//! characters inside a value's own text (`(`, `)`, `,`, `&`, `|`) are never
//! mistaken for query structure. By default the encoding is applied twice:
//! one layer is undone by client-side serialization, the other by the
//! server's own decode pass.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left bare by the value encoder; everything else, including the
/// grammar characters, is escaped
const VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'');

/// Percent-encode one value, once or twice depending on policy
pub fn encode_value(value: &str, double_encode: bool) -> String {
    if value.contains(' ') {
        tracing::warn!(
            value,
            "RQL value contains a literal space; server-side decoding may be ambiguous"
        );
    }
    let once = utf8_percent_encode(value, VALUE_ENCODE_SET).to_string();
    if double_encode {
        utf8_percent_encode(&once, VALUE_ENCODE_SET).to_string()
    } else {
        once
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_tokens_pass_through() {
        assert_eq!(encode_value("name", true), "name");
        assert_eq!(encode_value("-created", true), "-created");
        assert_eq!(encode_value("20", true), "20");
    }

    #[test]
    fn test_single_encoding() {
        assert_eq!(encode_value("a&b", false), "a%26b");
        assert_eq!(encode_value("a(b)c", false), "a%28b%29c");
        assert_eq!(encode_value("a,b", false), "a%2Cb");
        assert_eq!(encode_value("a|b", false), "a%7Cb");
    }

    #[test]
    fn test_double_encoding_escapes_the_escapes() {
        assert_eq!(encode_value("a&b", true), "a%2526b");
        assert_eq!(encode_value("a b", true), "a%2520b");
    }
}
