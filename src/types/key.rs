//! Bucket name and object key validation.

use std::fmt;

/// Error returned when a bucket name or object key fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValidationError(pub(crate) String);

impl fmt::Display for KeyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for KeyValidationError {}

/// Validate an S3 bucket name: 3-63 chars, lowercase ascii/digits/hyphens/dots,
/// no adjacent dots, not shaped like an IPv4 address.
pub fn validate_bucket_name(name: &str) -> Result<(), KeyValidationError> {
    let len = name.len();
    if !(3..=63).contains(&len) {
        return Err(KeyValidationError(format!(
            "Bucket name must be 3-63 characters, got {len}"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(KeyValidationError(
            "Bucket name may only contain lowercase letters, digits, hyphens and dots".into(),
        ));
    }
    let first = name.chars().next().unwrap();
    let last = name.chars().last().unwrap();
    if !(first.is_ascii_lowercase() || first.is_ascii_digit())
        || !(last.is_ascii_lowercase() || last.is_ascii_digit())
    {
        return Err(KeyValidationError(
            "Bucket name must start and end with a letter or digit".into(),
        ));
    }
    if name.contains("..") {
        return Err(KeyValidationError(
            "Bucket name must not contain adjacent dots".into(),
        ));
    }
    if is_ipv4_shaped(name) {
        return Err(KeyValidationError(
            "Bucket name must not be formatted as an IP address".into(),
        ));
    }
    Ok(())
}

fn is_ipv4_shaped(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts
        .iter()
        .all(|p| !p.is_empty() && p.len() <= 3 && p.chars().all(|c| c.is_ascii_digit()) && p.parse::<u16>().map(|v| v <= 255).unwrap_or(false))
}

/// Validate an object key: 1..=1024 bytes of UTF-8. S3 keys are not URIs —
/// arbitrary bytes (including reserved URI characters) are accepted, but
/// embedded NUL bytes are rejected since the store uses them nowhere and
/// filesystem encodings cannot represent them.
pub fn validate_object_key(key: &str) -> Result<(), KeyValidationError> {
    let len = key.as_bytes().len();
    if len == 0 || len > 1024 {
        return Err(KeyValidationError(format!(
            "Object key must be 1-1024 bytes, got {len}"
        )));
    }
    if key.contains('\0') {
        return Err(KeyValidationError(
            "Object key must not contain NUL bytes".into(),
        ));
    }
    Ok(())
}

/// Percent-encode a key into a single filesystem path segment. S3 keys may
/// contain `/` and arbitrary bytes; the store keeps the logical key as a
/// directory hierarchy mirroring Unix path segments by "/" and encodes the
/// bytes of each segment so the result is always a valid filename.
pub fn encode_key_for_fs(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

/// Reverse of [`encode_key_for_fs`].
pub fn decode_key_from_fs(encoded: &str) -> String {
    urlencoding::decode(encoded)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| encoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_bucket_names() {
        assert!(validate_bucket_name("my-bucket").is_ok());
        assert!(validate_bucket_name("abc").is_ok());
        assert!(validate_bucket_name(&"a".repeat(63)).is_ok());
        assert!(validate_bucket_name("a.b.c").is_ok());
    }

    #[test]
    fn rejects_bad_bucket_names() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
        assert!(validate_bucket_name("Bucket").is_err());
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket-").is_err());
        assert!(validate_bucket_name("bucket..name").is_err());
        assert!(validate_bucket_name("192.168.1.1").is_err());
        assert!(validate_bucket_name("bucket_name").is_err());
    }

    #[test]
    fn validates_object_key_length_boundaries() {
        assert!(validate_object_key("a").is_ok());
        assert!(validate_object_key(&"a".repeat(1024)).is_ok());
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key(&"a".repeat(1025)).is_err());
    }

    #[test]
    fn object_key_allows_slashes_and_reserved_chars() {
        assert!(validate_object_key("a/b/c.txt").is_ok());
        assert!(validate_object_key("a b#c?d").is_ok());
    }

    #[test]
    fn fs_encoding_round_trips() {
        let key = "a/b c/d%e";
        let encoded = encode_key_for_fs(key);
        assert!(!encoded.contains('/'));
        assert_eq!(decode_key_from_fs(&encoded), key);
    }
}
