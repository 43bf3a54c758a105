use crate::macros::{strcspn, strspn};
use crate::str_fns::{stripos, strpos, substr};

/// A single lexical token of the markup source.
///
/// Tokens carry decoded attribute values but otherwise undecoded text; the
/// tree builder decides which bodies get character references resolved.
#[derive(Debug, PartialEq)]
pub(crate) enum Token {
    /// A run of plain text, including any runaway `<` characters.
    Text(String),

    /// A processing instruction, e.g. `<?xml version="1.0"?>`.
    Pi(String),

    /// An HTML comment.
    Comment(String),

    /// A CDATA section.
    Cdata(String),

    /// A DOCTYPE declaration payload.
    Doctype(String),

    /// A tag, whether opening or closing.
    Tag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        is_closing: bool,
        self_closing: bool,
    },

    /// The verbatim body of a raw text element such as `script`.
    Raw(String),
}

/// Splits markup into a stream of tokens without interpreting nesting.
///
/// Scanning never fails: any byte sequence produces a complete stream, with
/// malformed constructs degrading to plain text.
pub(crate) struct Tokenizer {
    html_bytes: Box<[u8]>,
    bytes_already_parsed: usize,
    raw_until: Option<Box<str>>,
    pending: Option<Token>,
}

impl Tokenizer {
    pub(crate) fn new(html: &str) -> Self {
        Self {
            html_bytes: html.as_bytes().into(),
            bytes_already_parsed: 0,
            raw_until: None,
            pending: None,
        }
    }

    /// Switches the scanner into raw text mode for the given element.
    ///
    /// The next token will span everything up to (but not including) the
    /// matching case-insensitive closer, followed by the closer itself. With
    /// no closer in the input, the remainder of the document is the body.
    pub(crate) fn enter_raw_text(&mut self, element: &str) {
        self.raw_until = Some(element.into());
    }

    /// Finds the next token in the document.
    ///
    /// Returns `None` once the input is exhausted.
    pub(crate) fn next_token(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.take() {
            return Some(token);
        }

        if let Some(element) = self.raw_until.take() {
            return Some(self.consume_raw_text(&element));
        }

        let doc_length = self.html_bytes.len();
        let was_at = self.bytes_already_parsed;
        if was_at >= doc_length {
            return None;
        }

        let mut at = was_at;
        while at < doc_length {
            let Some(next_at) = strpos(&self.html_bytes, b"<", at) else {
                break;
            };
            at = next_at;

            if let Some((token, token_ends_at)) = self.scan_markup(at) {
                self.bytes_already_parsed = token_ends_at;

                if at > was_at {
                    self.pending = Some(token);
                    return Some(Token::Text(owned(substr(&self.html_bytes, was_at, at - was_at))));
                }

                return Some(token);
            }

            /*
             * A "<" which opens no recognizable construct is treated as
             * plaintext and stays in the surrounding text run. This is how
             * things like "<3" survive parsing instead of vanishing.
             */
            at += 1;
        }

        self.bytes_already_parsed = doc_length;
        Some(Token::Text(owned(substr(
            &self.html_bytes,
            was_at,
            doc_length - was_at,
        ))))
    }

    /// Attempts to scan one non-text construct at `at`, which must point at
    /// a `<`. Returns the token and the offset just past it.
    fn scan_markup(&self, at: usize) -> Option<(Token, usize)> {
        if at + 1 >= self.html_bytes.len() {
            return None;
        }

        match self.html_bytes[at + 1] {
            b'?' => self.scan_processing_instruction(at),

            /*
             * Tried in order: comment, CDATA, DOCTYPE. Anything else opened
             * by "<!" falls through to tag scanning, which may still match a
             * tag with an unusual name.
             */
            b'!' => self
                .scan_comment(at)
                .or_else(|| self.scan_cdata(at))
                .or_else(|| self.scan_doctype(at))
                .or_else(|| self.scan_tag(at)),

            _ => self.scan_tag(at),
        }
    }

    fn scan_processing_instruction(&self, at: usize) -> Option<(Token, usize)> {
        let body_starts_at = at + 2;
        let closer_at = strpos(&self.html_bytes, b"?>", body_starts_at)?;
        let body = substr(&self.html_bytes, body_starts_at, closer_at - body_starts_at);

        Some((Token::Pi(owned(body)), closer_at + 2))
    }

    fn scan_comment(&self, at: usize) -> Option<(Token, usize)> {
        let html = &self.html_bytes;
        if html.len() < at + 4 || &html[at + 2..at + 4] != b"--" {
            return None;
        }

        /*
         * The comment body runs to the first "--" that is followed by ">",
         * with whitespace allowed between the dashes and the closing angle
         * bracket. A "--" inside the body that isn't part of such a closer
         * stays in the body.
         */
        let body_starts_at = at + 4;
        let mut closer_at = body_starts_at;
        loop {
            closer_at = strpos(html, b"--", closer_at)?;
            let whitespace = strspn!(html, b' ' | b'\t' | 0x0c | b'\r' | b'\n', closer_at + 2);
            let gt_at = closer_at + 2 + whitespace;

            if gt_at < html.len() && html[gt_at] == b'>' {
                let body = substr(html, body_starts_at, closer_at - body_starts_at);
                return Some((Token::Comment(owned(body)), gt_at + 1));
            }

            closer_at += 1;
        }
    }

    fn scan_cdata(&self, at: usize) -> Option<(Token, usize)> {
        let html = &self.html_bytes;
        if html.len() < at + 9 || &html[at + 2..at + 9] != b"[CDATA[" {
            return None;
        }

        let body_starts_at = at + 9;
        let closer_at = strpos(html, b"]]>", body_starts_at)?;
        let body = substr(html, body_starts_at, closer_at - body_starts_at);

        Some((Token::Cdata(owned(body)), closer_at + 3))
    }

    fn scan_doctype(&self, at: usize) -> Option<(Token, usize)> {
        let html = &self.html_bytes;
        if html.len() < at + 9 || !html[at + 2..at + 9].eq_ignore_ascii_case(b"DOCTYPE") {
            return None;
        }

        /*
         * The payload may carry quoted public/system identifiers and an
         * internal subset in square brackets; a ">" inside either does not
         * close the declaration.
         */
        let payload_starts_at = at + 9;
        let mut p = payload_starts_at;
        while p < html.len() {
            match html[p] {
                b'>' => {
                    let payload = substr(html, payload_starts_at, p - payload_starts_at);
                    return Some((Token::Doctype(owned(payload)), p + 1));
                }

                quote @ (b'"' | b'\'') => {
                    let closing_at = strpos(html, &[quote], p + 1)?;
                    p = closing_at + 1;
                }

                b'[' => {
                    let closing_at = strpos(html, b"]", p + 1)?;
                    p = closing_at + 1;
                }

                _ => p += 1,
            }
        }

        None
    }

    fn scan_tag(&self, at: usize) -> Option<(Token, usize)> {
        let html = &self.html_bytes;
        let doc_length = html.len();

        let name_starts_at = at + 1 + strspn!(html, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at + 1);
        if name_starts_at >= doc_length {
            return None;
        }

        let name_length = strcspn!(
            html,
            b' ' | b'\t' | 0x0c | b'\r' | b'\n' | b'<' | b'>',
            name_starts_at
        );
        if name_length == 0 {
            return None;
        }

        /*
         * Find the end of the tag. Quoted spans may contain ">", so the scan
         * jumps over them; a bare "<" inside the tag, or an unterminated
         * quote, means this was never a tag at all.
         */
        let mut p = name_starts_at + name_length;
        loop {
            p += strcspn!(html, b'"' | b'\'' | b'<' | b'>', p);
            if p >= doc_length {
                return None;
            }

            match html[p] {
                b'>' => break,
                b'<' => return None,
                quote => {
                    let closing_at = strpos(html, &[quote], p + 1)?;
                    p = closing_at + 1;
                }
            }
        }

        let name = owned(substr(html, name_starts_at, name_length));
        let region_starts_at = name_starts_at + name_length;
        let attribute_region = substr(html, region_starts_at, p - region_starts_at);

        let (is_closing, name) = match name.strip_prefix('/') {
            Some(rest) => (true, rest.to_string()),
            None => (false, name),
        };

        let self_closing = ends_with_solidus(attribute_region);
        let attributes = if is_closing {
            Vec::new()
        } else {
            parse_attributes(attribute_region)
        };

        Some((
            Token::Tag {
                name,
                attributes,
                is_closing,
                self_closing,
            },
            p + 1,
        ))
    }

    /// Consumes the body of a raw text element up to its closer.
    fn consume_raw_text(&mut self, element: &str) -> Token {
        let doc_length = self.html_bytes.len();
        let body_starts_at = self.bytes_already_parsed;
        let needle = format!("</{element}");

        let mut found: Option<(usize, usize)> = None;
        let mut at = body_starts_at;
        while let Some(closer_at) = stripos(&self.html_bytes, needle.as_bytes(), at) {
            let name_ends_at = closer_at + needle.len();
            let whitespace = strspn!(
                self.html_bytes,
                b' ' | b'\t' | 0x0c | b'\r' | b'\n',
                name_ends_at
            );
            let gt_at = name_ends_at + whitespace;

            /*
             * Require the tag name to terminate so that "</scriptx>" cannot
             * end a script region even though "</script" appears in it.
             */
            if gt_at < doc_length && self.html_bytes[gt_at] == b'>' {
                found = Some((closer_at, gt_at + 1));
                break;
            }

            at = closer_at + 1;
        }

        // Without a closer the rest of the document belongs to the element.
        let (body_ends_at, resume_at) = found.unwrap_or((doc_length, doc_length));
        let body = owned(substr(
            &self.html_bytes,
            body_starts_at,
            body_ends_at - body_starts_at,
        ));
        self.bytes_already_parsed = resume_at;

        let closer = Token::Tag {
            name: element.to_string(),
            attributes: Vec::new(),
            is_closing: true,
            self_closing: false,
        };

        if body.is_empty() {
            closer
        } else {
            self.pending = Some(closer);
            Token::Raw(body)
        }
    }
}

/// Whether a tag's raw attribute region marks the tag as self-closing.
fn ends_with_solidus(region: &[u8]) -> bool {
    region
        .iter()
        .rfind(|&&byte| !matches!(byte, b' ' | b'\t' | 0x0c | b'\r' | b'\n'))
        == Some(&b'/')
}

/// Parses the raw attribute region of an opening tag.
///
/// Duplicate names are kept in source order here; the tree builder's map
/// insert makes the last occurrence win. Values are entity-decoded, while a
/// valueless attribute carries `None`.
fn parse_attributes(region: &[u8]) -> Vec<(String, Option<String>)> {
    let region_length = region.len();
    let mut attributes = Vec::new();
    let mut at = 0;

    while at < region_length {
        at += strspn!(region, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at);
        if at >= region_length {
            break;
        }

        // The self-closing marker fragment, not an attribute.
        if region[at] == b'/' {
            at += 1;
            continue;
        }

        let name_length = strcspn!(
            region,
            b' ' | b'\t' | 0x0c | b'\r' | b'\n' | b'<' | b'>' | b'=' | b'/',
            at
        );
        if name_length == 0 {
            break;
        }

        let name = owned(substr(region, at, name_length));
        at += name_length;

        at += strspn!(region, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at);
        if at >= region_length || region[at] != b'=' {
            attributes.push((name, None));
            continue;
        }

        at += 1;
        at += strspn!(region, b' ' | b'\t' | 0x0c | b'\r' | b'\n', at);
        if at >= region_length {
            attributes.push((name, Some(String::new())));
            break;
        }

        let value = match region[at] {
            quote @ (b'"' | b'\'') => match strpos(region, &[quote], at + 1) {
                Some(closing_at) => {
                    let value = substr(region, at + 1, closing_at - (at + 1));
                    at = closing_at + 1;
                    owned(value)
                }
                None => {
                    let value = substr(region, at + 1, region_length - (at + 1));
                    at = region_length;
                    owned(value)
                }
            },

            _ => {
                let value_length = strcspn!(region, b' ' | b'\t' | 0x0c | b'\r' | b'\n' | b'>', at);
                let value = substr(region, at, value_length);
                at += value_length;
                owned(value)
            }
        };

        let value = html_escape::decode_html_entities(&value).into_owned();
        attributes.push((name, Some(value)));
    }

    attributes
}

fn owned(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
