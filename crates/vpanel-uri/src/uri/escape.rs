//! Byte-level encodings shared by the descriptor formats.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;
use vpanel_core::{ProvisionError, ProvisionResult};

/// Everything but `A-Za-z0-9-_.~` is escaped in a query component.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Query-component escaping with spaces as `+`.
pub fn query_escape(s: &str) -> String {
    utf8_percent_encode(s, QUERY_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

pub fn query_unescape(s: &str) -> ProvisionResult<String> {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|_| ProvisionError::InvalidDescriptor("label is not valid UTF-8".into()))
}

/// Compact JSON formatter that also escapes `<`, `>`, `&`, U+2028 and U+2029.
///
/// Client apps compare descriptors byte for byte, so the output has to match
/// what HTML-safe JSON encoders emit.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (at, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..at].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = at + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

pub fn to_html_safe_json<T: Serialize>(value: &T) -> ProvisionResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter);
    value
        .serialize(&mut ser)
        .map_err(|e| ProvisionError::InvalidDescriptor(format!("encoding descriptor: {}", e)))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_escape_matches_form_encoding() {
        assert_eq!(
            query_escape("valid before (2025-12-31) vpn-de-c123"),
            "valid+before+%282025-12-31%29+vpn-de-c123"
        );
        assert_eq!(query_escape("[locked:DEV/1]"), "%5Blocked%3ADEV%2F1%5D");
        assert_eq!(query_escape("a~b_c.d"), "a~b_c.d");
        assert_eq!(query_escape("ü"), "%C3%BC");
    }

    #[test]
    fn query_unescape_reverses() {
        let label = "valid before (2025-12-31) vpn-de-c123 [locked:A+B]";
        assert_eq!(query_unescape(&query_escape(label)).unwrap(), label);
    }

    #[test]
    fn html_sensitive_characters_are_escaped() {
        let out = to_html_safe_json(&json!({ "ps": "a<b>&c\u{2028}" })).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"{"ps":"a\u003cb\u003e\u0026c\u2028"}"#);
    }

    #[test]
    fn control_characters_still_escaped() {
        let out = to_html_safe_json(&json!("line\nbreak\"q\"")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#""line\nbreak\"q\"""#);
    }
}
