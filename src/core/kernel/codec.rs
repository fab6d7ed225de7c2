use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything except the RFC 3986 unreserved set is escaped
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode one key or value
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, FORM_ENCODE_SET).to_string()
}

/// Serialize pairs as `k=v&k=v` in the order given
///
/// The same routine produces both the request body and the parameter part
/// of the string to sign, so the two can never disagree on escaping.
pub fn form_encode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreserved_characters_are_kept() {
        assert_eq!(encode_component("AZaz09-_.~"), "AZaz09-_.~");
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        assert_eq!(encode_component("a b"), "a%20b");
        assert_eq!(
            encode_component("2010-01-01T00:00:00.000Z"),
            "2010-01-01T00%3A00%3A00.000Z"
        );
        assert_eq!(encode_component("a+b/c="), "a%2Bb%2Fc%3D");
        assert_eq!(encode_component("é"), "%C3%A9");
    }

    #[test]
    fn test_form_encode_preserves_given_order() {
        let encoded = form_encode([("b", "2"), ("a", "1 1")]);
        assert_eq!(encoded, "b=2&a=1%201");
    }

    #[test]
    fn test_form_encode_empty() {
        assert_eq!(form_encode(std::iter::empty()), "");
    }
}
