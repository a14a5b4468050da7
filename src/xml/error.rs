//! The `<Error>` envelope shared by every S3 error response.

use super::{escape_xml, XML_DECLARATION};

pub struct ErrorEnvelope<'a> {
    pub code: &'a str,
    pub message: &'a str,
    pub resource: &'a str,
    pub request_id: &'a str,
}

impl<'a> ErrorEnvelope<'a> {
    pub fn to_xml(&self) -> String {
        format!(
            "{XML_DECLARATION}\n<Error><Code>{}</Code><Message>{}</Message><Resource>{}</Resource><RequestId>{}</RequestId></Error>",
            escape_xml(self.code),
            escape_xml(self.message),
            escape_xml(self.resource),
            escape_xml(self.request_id),
        )
    }
}

/// The KMS-specific error shape (`KMS.NotFoundException`) S3 emits for
/// unknown SSE-KMS key ids, distinct from the generic `<Error>` envelope.
pub struct KmsErrorEnvelope<'a> {
    pub message: &'a str,
}

impl<'a> KmsErrorEnvelope<'a> {
    pub fn to_xml(&self) -> String {
        format!(
            "{XML_DECLARATION}\n<Error><Code>KMS.NotFoundException</Code><Message>{}</Message><Resource>kmsService</Resource></Error>",
            escape_xml(self.message),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_escapes_message() {
        let env = ErrorEnvelope {
            code: "NoSuchKey",
            message: "key <missing>",
            resource: "/b/k",
            request_id: "req-1",
        };
        let xml = env.to_xml();
        assert!(xml.contains("<Code>NoSuchKey</Code>"));
        assert!(xml.contains("key &lt;missing&gt;"));
    }
}
