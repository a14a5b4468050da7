//! S3 XML request/response codec.
//!
//! Responses are built with hand-written string templates rather than a
//! generic serializer: AWS's exact element ordering and its convention of
//! omitting empty fields are easier to pin down that way than coaxing a
//! derive-based XML serializer into the right shape. Requests that clients
//! actually send as XML bodies (Delete, CompleteMultipartUpload, and the
//! handful of bucket sub-resource PUT bodies) are deserialized with
//! `quick_xml` since there the ordering AWS enforces is on output, not input.

pub mod error;
pub mod requests;
pub mod responses;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Escape the five XML-reserved characters for use in text nodes and
/// double-quoted attribute values.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// RFC3339 with no fractional seconds and a literal `Z`, the timestamp shape
/// AWS uses throughout the S3 XML schemas.
pub fn format_timestamp(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_reserved_characters() {
        assert_eq!(
            escape_xml("<a>&'\"b\""),
            "&lt;a&gt;&amp;&apos;&quot;b&quot;"
        );
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_xml("hello world"), "hello world");
    }
}
