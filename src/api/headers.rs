//! Header parsing: Range, inline tagging, AWS chunked transfer decoding.

use crate::api::errors::S3Error;

/// A parsed `Range` header, not yet resolved against an object's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=a-b`
    Bounded(u64, u64),
    /// `bytes=a-`
    FromStart(u64),
    /// `bytes=-n`
    Suffix(u64),
}

pub fn parse_range_header(value: &str) -> Result<RangeSpec, S3Error> {
    let value = value.trim();
    let rest = value
        .strip_prefix("bytes=")
        .ok_or_else(|| S3Error::InvalidRequest("malformed Range header".into()))?;
    let (start, end) = rest
        .split_once('-')
        .ok_or_else(|| S3Error::InvalidRequest("malformed Range header".into()))?;
    if start.is_empty() {
        let n: u64 = end
            .parse()
            .map_err(|_| S3Error::InvalidRequest("malformed Range header".into()))?;
        return Ok(RangeSpec::Suffix(n));
    }
    let s: u64 = start
        .parse()
        .map_err(|_| S3Error::InvalidRequest("malformed Range header".into()))?;
    if end.is_empty() {
        return Ok(RangeSpec::FromStart(s));
    }
    let e: u64 = end
        .parse()
        .map_err(|_| S3Error::InvalidRequest("malformed Range header".into()))?;
    if e < s {
        return Err(S3Error::InvalidRequest("malformed Range header".into()));
    }
    Ok(RangeSpec::Bounded(s, e))
}

impl RangeSpec {
    pub fn as_start_end(&self) -> (Option<u64>, Option<u64>) {
        match self {
            RangeSpec::Bounded(s, e) => (Some(*s), Some(*e)),
            RangeSpec::FromStart(s) => (Some(*s), None),
            RangeSpec::Suffix(n) => (None, Some(*n)),
        }
    }
}

/// Parse `key1=val1&key2=val2` tagging grammar shared by the `?tagging`
/// request body's urlencoded form and the `x-amz-tagging` inline header.
pub fn parse_tagging_query(value: &str) -> Result<Vec<(String, String)>, S3Error> {
    let mut pairs = Vec::new();
    if value.is_empty() {
        return Ok(pairs);
    }
    for part in value.split('&') {
        let (k, v) = part
            .split_once('=')
            .ok_or_else(|| S3Error::InvalidRequest("malformed tagging value".into()))?;
        let key = urlencoding::decode(k)
            .map_err(|_| S3Error::InvalidRequest("malformed tagging value".into()))?
            .into_owned();
        let value = urlencoding::decode(v)
            .map_err(|_| S3Error::InvalidRequest("malformed tagging value".into()))?
            .into_owned();
        if key.len() > 128 || value.len() > 256 {
            return Err(S3Error::InvalidTag("tag key/value too long".into()));
        }
        pairs.push((key, value));
    }
    if pairs.len() > 10 {
        return Err(S3Error::InvalidTag("too many tags".into()));
    }
    Ok(pairs)
}

/// True if the request declares AWS chunked transfer encoding
/// (`STREAMING-AWS4-HMAC-SHA256-PAYLOAD`), used by the SDKs to stream
/// signed chunks rather than a single signed body.
pub fn is_aws_chunked(content_sha256_header: Option<&str>) -> bool {
    content_sha256_header
        .map(|v| v.starts_with("STREAMING-"))
        .unwrap_or(false)
}

/// Decode the `hex(chunk-size);chunk-signature=...\r\n<data>\r\n` framing
/// AWS SDKs use for chunked, signed uploads. Signatures are not verified
/// (signing verification is explicitly out of scope); only the framing is
/// stripped to recover the raw payload.
pub fn decode_aws_chunked(body: &[u8]) -> Result<Vec<u8>, S3Error> {
    let mut out = Vec::with_capacity(body.len());
    let mut pos = 0usize;
    loop {
        let line_end = find_crlf(body, pos)
            .ok_or_else(|| S3Error::InvalidRequest("malformed chunked body".into()))?;
        let header_line = std::str::from_utf8(&body[pos..line_end])
            .map_err(|_| S3Error::InvalidRequest("malformed chunked body".into()))?;
        let size_str = header_line.split(';').next().unwrap_or("");
        let chunk_size = u64::from_str_radix(size_str.trim(), 16)
            .map_err(|_| S3Error::InvalidRequest("malformed chunk size".into()))? as usize;
        pos = line_end + 2;
        if chunk_size == 0 {
            break;
        }
        if pos + chunk_size > body.len() {
            return Err(S3Error::InvalidRequest("truncated chunked body".into()));
        }
        out.extend_from_slice(&body[pos..pos + chunk_size]);
        pos += chunk_size + 2; // skip trailing CRLF after the chunk data
    }
    Ok(out)
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| from + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bounded_range() {
        assert_eq!(parse_range_header("bytes=0-0").unwrap(), RangeSpec::Bounded(0, 0));
    }

    #[test]
    fn parses_from_start_range() {
        assert_eq!(parse_range_header("bytes=5-").unwrap(), RangeSpec::FromStart(5));
    }

    #[test]
    fn parses_suffix_range() {
        assert_eq!(parse_range_header("bytes=-4").unwrap(), RangeSpec::Suffix(4));
    }

    #[test]
    fn rejects_malformed_range() {
        assert!(parse_range_header("bytes=5-2").is_err());
        assert!(parse_range_header("nonsense").is_err());
    }

    #[test]
    fn parses_tagging_pairs() {
        let pairs = parse_tagging_query("env=prod&team=ml").unwrap();
        assert_eq!(pairs, vec![("env".into(), "prod".into()), ("team".into(), "ml".into())]);
    }

    #[test]
    fn detects_aws_chunked_header() {
        assert!(is_aws_chunked(Some("STREAMING-AWS4-HMAC-SHA256-PAYLOAD")));
        assert!(!is_aws_chunked(Some("UNSIGNED-PAYLOAD")));
        assert!(!is_aws_chunked(None));
    }

    #[test]
    fn decodes_single_chunk() {
        let body = b"4;chunk-signature=abc\r\nwiki\r\n0;chunk-signature=def\r\n\r\n";
        let decoded = decode_aws_chunked(body).unwrap();
        assert_eq!(decoded, b"wiki");
    }

    #[test]
    fn decodes_multiple_chunks() {
        let body = b"3;chunk-signature=a\r\nfoo\r\n3;chunk-signature=b\r\nbar\r\n0;chunk-signature=c\r\n\r\n";
        let decoded = decode_aws_chunked(body).unwrap();
        assert_eq!(decoded, b"foobar");
    }
}
