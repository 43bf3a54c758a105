use crate::macros::{strcspn, strspn};

/// Structured reading of a DOCTYPE declaration.
///
/// The tree stores a DOCTYPE's raw payload, everything between `<!DOCTYPE`
/// and the closing `>`. Most callers never look inside it; this type parses
/// the payload into the declaration's name and its optional public and
/// system identifiers for the ones that do.
///
/// DOCTYPE declarations historically instructed SGML parsers how to
/// interpret the document. In HTML they are retained for legacy reasons,
/// and almost every modern document carries plain `<!DOCTYPE html>`.
///
/// @see https://html.spec.whatwg.org/#the-doctype
#[derive(Debug, PartialEq)]
pub struct DoctypeInfo {
    /// Name of the DOCTYPE: "html" for HTML documents.
    pub name: Option<String>,

    /// Public identifier, present only when the declaration carries a
    /// `PUBLIC` external identifier.
    pub public_identifier: Option<String>,

    /// System identifier, from either a `SYSTEM` external identifier or the
    /// second quoted string after `PUBLIC`.
    pub system_identifier: Option<String>,
}

impl DoctypeInfo {
    /// Parses a DOCTYPE payload as produced by `parse`, i.e. without the
    /// `<!DOCTYPE` marker and closing `>`.
    pub fn from_payload(payload: &str) -> Self {
        let bytes = payload.as_bytes();
        let end = bytes.len();

        let mut at = strspn!(bytes, b' ' | b'\t' | 0x0c | b'\r' | b'\n', 0);

        let name_length = strcspn!(bytes, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at);
        let name = if name_length == 0 {
            None
        } else {
            Some(payload[at..at + name_length].to_ascii_lowercase())
        };
        at += name_length;
        at += strspn!(bytes, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at);

        let mut public_identifier = None;
        let mut system_identifier = None;

        if at + 6 <= end {
            let keyword = &bytes[at..at + 6];

            if keyword.eq_ignore_ascii_case(b"PUBLIC") {
                let (identifier, after) = quoted_identifier(payload, at + 6);
                public_identifier = identifier;

                /*
                 * A system identifier may follow the public identifier, but
                 * only when the public identifier itself parsed; anything
                 * else in the payload is trailing junk.
                 */
                if public_identifier.is_some() {
                    let (identifier, _) = quoted_identifier(payload, after);
                    system_identifier = identifier;
                }
            } else if keyword.eq_ignore_ascii_case(b"SYSTEM") {
                let (identifier, _) = quoted_identifier(payload, at + 6);
                system_identifier = identifier;
            }
        }

        Self {
            name,
            public_identifier,
            system_identifier,
        }
    }
}

/// Reads one quoted identifier starting at or after `at`, returning it with
/// the offset just past its closing quote. An unterminated identifier runs
/// to the end of the payload; a missing opening quote yields nothing.
fn quoted_identifier(payload: &str, mut at: usize) -> (Option<String>, usize) {
    let bytes = payload.as_bytes();

    at += strspn!(bytes, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at);
    if at >= bytes.len() || !matches!(bytes[at], b'"' | b'\'') {
        return (None, at);
    }

    let quote = bytes[at];
    at += 1;

    let length = strcspn!(bytes, byte if byte == quote, at);
    let identifier = payload[at..at + length].to_string();
    at += length;
    if at < bytes.len() {
        at += 1;
    }

    (Some(identifier), at)
}
