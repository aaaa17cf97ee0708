//! Comment markup to plain text.
//!
//! Reddit hands out `body_html` escaped once more than normal HTML, so cleaning
//! a comment is two steps: unescape the body, then walk the resulting markup
//! and keep only the visible text. The walk is a small streaming tokenizer that
//! reports tags, text runs and character references to a [`MarkupVisitor`].

use tracing::trace;

/// Callbacks for markup events. Every method defaults to doing nothing.
pub trait MarkupVisitor {
    fn start_tag(&mut self, _name: &str) {}
    fn end_tag(&mut self, _name: &str) {}
    fn text(&mut self, _data: &str) {}
    /// Named reference such as `amp` in `&amp;`.
    fn entity_ref(&mut self, _name: &str) {}
    /// Numeric reference body such as `169` or `xA9`.
    fn char_ref(&mut self, _reference: &str) {}
}

enum Markup<'a> {
    Start(&'a str),
    End(&'a str),
    Ignored,
}

enum Reference<'a> {
    Entity(&'a str),
    Char(&'a str),
}

const MAX_REFERENCE_LEN: usize = 32;

/// Tokenize `markup` and feed every event to `visitor`, in document order.
///
/// Malformed constructs degrade to text: a `<` that does not open a tag and a
/// `&` that does not start a terminated reference are reported verbatim.
pub fn walk_markup<V: MarkupVisitor + ?Sized>(markup: &str, visitor: &mut V) {
    let bytes = markup.as_bytes();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'<' => match scan_markup(markup, pos) {
                Some((end, tag)) => {
                    flush_text(markup, text_start, pos, visitor);
                    match tag {
                        Markup::Start(name) => visitor.start_tag(name),
                        Markup::End(name) => visitor.end_tag(name),
                        Markup::Ignored => {}
                    }
                    pos = end;
                    text_start = end;
                }
                None => pos += 1,
            },
            b'&' => match scan_reference(markup, pos) {
                Some((end, reference)) => {
                    flush_text(markup, text_start, pos, visitor);
                    match reference {
                        Reference::Entity(name) => visitor.entity_ref(name),
                        Reference::Char(body) => visitor.char_ref(body),
                    }
                    pos = end;
                    text_start = end;
                }
                None => pos += 1,
            },
            _ => pos += 1,
        }
    }

    flush_text(markup, text_start, bytes.len(), visitor);
}

fn flush_text<V: MarkupVisitor + ?Sized>(markup: &str, start: usize, end: usize, visitor: &mut V) {
    if start < end {
        visitor.text(&markup[start..end]);
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

/// `start` points at a `<`. Returns the byte offset just past the construct.
fn scan_markup(markup: &str, start: usize) -> Option<(usize, Markup<'_>)> {
    let bytes = markup.as_bytes();
    let rest = &markup[start..];

    if rest.starts_with("<!--") {
        let end = rest[4..]
            .find("-->")
            .map(|i| start + 4 + i + 3)
            .unwrap_or(bytes.len());
        return Some((end, Markup::Ignored));
    }

    match bytes.get(start + 1) {
        Some(b'/') if bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) => {
            let name_start = start + 2;
            let name_end = scan_while(bytes, name_start, is_name_byte);
            let close = find_byte(bytes, name_end, b'>')?;
            Some((close + 1, Markup::End(&markup[name_start..name_end])))
        }
        Some(b) if b.is_ascii_alphabetic() => {
            let name_start = start + 1;
            let name_end = scan_while(bytes, name_start, is_name_byte);
            let close = find_tag_close(bytes, name_end)?;
            Some((close + 1, Markup::Start(&markup[name_start..name_end])))
        }
        Some(b'!') | Some(b'?') => {
            let close = find_byte(bytes, start + 2, b'>')?;
            Some((close + 1, Markup::Ignored))
        }
        _ => None,
    }
}

/// `start` points at a `&`. Only `;`-terminated references are recognized.
fn scan_reference(markup: &str, start: usize) -> Option<(usize, Reference<'_>)> {
    let bytes = markup.as_bytes();
    let body_start = start + 1;

    let (body_end, numeric) = match bytes.get(body_start) {
        Some(b'#') => match bytes.get(body_start + 1) {
            Some(b'x') | Some(b'X') => (
                scan_while(bytes, body_start + 2, |b| b.is_ascii_hexdigit()),
                true,
            ),
            Some(b) if b.is_ascii_digit() => {
                (scan_while(bytes, body_start + 1, |b| b.is_ascii_digit()), true)
            }
            _ => return None,
        },
        Some(b) if b.is_ascii_alphabetic() => (
            scan_while(bytes, body_start, |b| b.is_ascii_alphanumeric()),
            false,
        ),
        _ => return None,
    };

    if bytes.get(body_end) != Some(&b';') || body_end - body_start > MAX_REFERENCE_LEN {
        return None;
    }

    if numeric {
        let body = &markup[body_start + 1..body_end];
        // `&#x;` has no digits after the marker.
        if body.len() < 2 && body.starts_with(['x', 'X']) {
            return None;
        }
        Some((body_end + 1, Reference::Char(body)))
    } else {
        Some((body_end + 1, Reference::Entity(&markup[body_start..body_end])))
    }
}

fn scan_while(bytes: &[u8], mut pos: usize, pred: impl Fn(u8) -> bool) -> usize {
    while pos < bytes.len() && pred(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

/// Finds the `>` closing a start tag, skipping over quoted attribute values.
fn find_tag_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// Decode a named reference through the full HTML5 entity table.
///
/// Only exact names match, so `ampfoo` is unknown rather than `&` plus `foo;`.
pub fn decode_entity(name: &str) -> Option<String> {
    let raw = format!("&{};", name);
    let expansion = htmlize::ENTITIES.get(raw.as_bytes())?;
    std::str::from_utf8(expansion).ok().map(str::to_string)
}

/// Decode the body of a numeric reference (`169`, `xA9`).
pub fn decode_char_ref(reference: &str) -> Option<char> {
    let code = match reference.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => reference.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorText {
    Undecided,
    Keep,
    Drop,
}

/// Collects the visible text of a comment.
///
/// Link text that is itself a URL is dropped; any other text inside anchors is
/// kept. References that cannot be decoded are skipped one at a time.
#[derive(Debug)]
pub struct CommentText {
    text: String,
    anchor_depth: usize,
    anchor_text: AnchorText,
    skipped_references: usize,
}

impl Default for CommentText {
    fn default() -> Self {
        Self {
            text: String::new(),
            anchor_depth: 0,
            anchor_text: AnchorText::Keep,
            skipped_references: 0,
        }
    }
}

impl CommentText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped_references(&self) -> usize {
        self.skipped_references
    }

    pub fn into_text(self) -> String {
        self.text
    }

    fn dropping(&self) -> bool {
        self.anchor_depth > 0 && self.anchor_text == AnchorText::Drop
    }

    fn push_decoded(&mut self, decoded: Option<&str>, reference: &str) {
        if self.anchor_depth > 0 && self.anchor_text == AnchorText::Undecided {
            self.anchor_text = AnchorText::Keep;
        }
        if self.dropping() {
            return;
        }
        match decoded {
            Some(s) => self.text.push_str(s),
            None => {
                self.skipped_references += 1;
                trace!("Skipping undecodable reference &{};", reference);
            }
        }
    }
}

impl MarkupVisitor for CommentText {
    fn start_tag(&mut self, name: &str) {
        if name.eq_ignore_ascii_case("a") {
            if self.anchor_depth == 0 {
                self.anchor_text = AnchorText::Undecided;
            }
            self.anchor_depth += 1;
        }
    }

    fn end_tag(&mut self, name: &str) {
        if name.eq_ignore_ascii_case("a") {
            self.anchor_depth = self.anchor_depth.saturating_sub(1);
            if self.anchor_depth == 0 {
                self.anchor_text = AnchorText::Keep;
            }
        }
    }

    fn text(&mut self, data: &str) {
        if self.anchor_depth > 0 && self.anchor_text == AnchorText::Undecided {
            if data.starts_with("http") {
                self.anchor_text = AnchorText::Drop;
            } else if !data.trim().is_empty() {
                self.anchor_text = AnchorText::Keep;
            }
        }
        if !self.dropping() {
            self.text.push_str(data);
        }
    }

    fn entity_ref(&mut self, name: &str) {
        let decoded = decode_entity(name);
        self.push_decoded(decoded.as_deref(), name);
    }

    fn char_ref(&mut self, reference: &str) {
        let decoded = decode_char_ref(reference).map(String::from);
        self.push_decoded(decoded.as_deref(), reference);
    }
}

/// Visible text of already-unescaped markup.
pub fn strip_markup(markup: &str) -> String {
    let mut collector = CommentText::new();
    walk_markup(markup, &mut collector);
    collector.into_text()
}

/// Plain text of a comment's `body_html` as served by Reddit.
pub fn clean_comment(body_html: &str) -> String {
    let markup = htmlize::unescape(body_html);
    strip_markup(&markup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl MarkupVisitor for Recorder {
        fn start_tag(&mut self, name: &str) {
            self.0.push(format!("start:{name}"));
        }
        fn end_tag(&mut self, name: &str) {
            self.0.push(format!("end:{name}"));
        }
        fn text(&mut self, data: &str) {
            self.0.push(format!("text:{data}"));
        }
        fn entity_ref(&mut self, name: &str) {
            self.0.push(format!("entity:{name}"));
        }
        fn char_ref(&mut self, reference: &str) {
            self.0.push(format!("char:{reference}"));
        }
    }

    #[test]
    fn test_event_stream() {
        let mut recorder = Recorder::default();
        walk_markup(
            r#"<p class="x">a &amp; b<!-- hi --><br/>&#169;</p>"#,
            &mut recorder,
        );
        assert_eq!(
            recorder.0,
            vec![
                "start:p",
                "text:a ",
                "entity:amp",
                "text: b",
                "start:br",
                "char:169",
                "end:p",
            ]
        );
    }

    #[test]
    fn test_url_anchor_text_is_dropped() {
        let html = r#"<p>see <a href="https://example.com">https://example.com/some/page</a> now</p>"#;
        assert_eq!(strip_markup(html), "see  now");
    }

    #[test]
    fn test_url_anchor_with_query_entities_is_dropped_entirely() {
        let html = r#"<a href="x">http://example.com/?a=1&amp;b=2</a>"#;
        assert_eq!(strip_markup(html), "");
    }

    #[test]
    fn test_named_anchor_text_is_kept() {
        let html = r#"<p>read <a href="https://example.com">this <em>post</em></a>!</p>"#;
        assert_eq!(strip_markup(html), "read this post!");
    }

    #[test]
    fn test_http_text_outside_anchor_is_kept() {
        assert_eq!(strip_markup("<p>http is a protocol</p>"), "http is a protocol");
    }

    #[test]
    fn test_entity_reference_table() {
        let table = [
            ("&amp;", "&"),
            ("&lt;", "<"),
            ("&gt;", ">"),
            ("&quot;", "\""),
            ("&nbsp;", "\u{a0}"),
            ("&eacute;", "é"),
            ("&hellip;", "…"),
            ("&#169;", "©"),
            ("&#xA9;", "©"),
            ("&#x1F600;", "😀"),
        ];
        for (encoded, literal) in table {
            assert_eq!(strip_markup(encoded), literal, "decoding {encoded}");
        }
    }

    #[test]
    fn test_unknown_entity_is_skipped_alone() {
        let mut collector = CommentText::new();
        walk_markup("a &bogusentity; b &#xFFFFFFFF; c", &mut collector);
        assert_eq!(collector.skipped_references(), 2);
        assert_eq!(collector.into_text(), "a  b  c");
    }

    #[test]
    fn test_legacy_entity_prefix_is_not_partially_decoded() {
        assert_eq!(decode_entity("ampfoo"), None);
        assert_eq!(decode_entity("copyright"), None);
        assert_eq!(decode_entity("amp").as_deref(), Some("&"));
        assert_eq!(decode_entity("semi").as_deref(), Some(";"));

        let mut collector = CommentText::new();
        walk_markup("x &ampfoo; y", &mut collector);
        assert_eq!(collector.skipped_references(), 1);
        assert_eq!(collector.into_text(), "x  y");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        for plain in [
            "such text, very plain",
            "Tom & Jerry; 3 < 4 and 5 > 2",
            "a<b is not a tag",
            "",
        ] {
            assert_eq!(clean_comment(plain), plain);
            assert_eq!(strip_markup(plain), plain);
        }
    }

    #[test]
    fn test_reddit_body_html_is_double_decoded() {
        let body = "&lt;div class=\"md\"&gt;&lt;p&gt;Tom &amp;amp; Jerry &lt;a href=\"http://x.io\"&gt;http://x.io&lt;/a&gt;&lt;/p&gt;\n&lt;/div&gt;";
        assert_eq!(clean_comment(body), "Tom & Jerry \n");
    }

    #[test]
    fn test_unterminated_tag_degrades_to_text() {
        assert_eq!(strip_markup("x <b y"), "x <b y");
    }
}
