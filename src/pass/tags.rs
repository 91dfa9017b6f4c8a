//! Tag-level scrubbing: dangerous `href`/`src` values, `script`/`xss`
//! tags, and bracket-encoding of tags that must never render.

use regex::Regex;

use super::compile;

/// Tag names that are never safe to render. Their delimiting brackets are
/// entity-encoded -- not deleted -- so fragments on either side of the tag
/// cannot join into a fresh opener.
pub(crate) const NAUGHTY_TAGS: &[&str] = &[
    "alert", "applet", "audio", "basefont", "base", "behavior", "bgsound",
    "blink", "body", "embed", "expression", "form", "frameset", "frame",
    "head", "html", "ilayer", "iframe", "input", "isindex", "layer", "link",
    "meta", "object", "plaintext", "style", "script", "textarea", "title",
    "video", "xml", "xss",
];

pub(crate) struct TagSanitizer {
    anchor_hint: Regex,
    image_hint: Regex,
    script_hint: Regex,
    anchor: Regex,
    image: Regex,
    bad_href: Regex,
    bad_src: Regex,
    script_tag: Regex,
    naughty: Regex,
    attr_pair: Regex,
    css_comment: Regex,
}

impl TagSanitizer {
    pub(crate) fn new() -> Self {
        Self {
            anchor_hint: compile(r"(?i)<a"),
            image_hint: compile(r"(?i)<img"),
            script_hint: compile(r"(?i)script|xss"),
            anchor: compile(r"(?is)<a(?:rea)?[^a-z0-9>]+([^>]*?)(?:>|$)"),
            image: compile(r"(?is)<img[^a-z0-9]+([^>]*?)(?:\s?/?>|$)"),
            bad_href: compile(
                r"(?is)href=.*?(?:(?:alert|prompt|confirm)(?:\(|&#40;|`|&#96;)|javascript:|livescript:|mocha:|charset=|window\.|\(?document\)?\.|\.cookie|<script|<xss|d\s*a\s*t\s*a\s*:)",
            ),
            bad_src: compile(
                r"(?is)src=.*?(?:(?:alert|prompt|confirm|eval)(?:\(|&#40;|`|&#96;)|javascript:|livescript:|mocha:|charset=|window\.|\(?document\)?\.|\.cookie|<script|<xss|base64\s*,)",
            ),
            script_tag: compile(r"(?is)</*(?:script|xss).*?>"),
            naughty: compile(&format!(
                r"(?is)<(/*\s*)({})([^><]*)([><]*)",
                NAUGHTY_TAGS.join("|")
            )),
            attr_pair: compile(r#"(?is)\s*[a-z\-]+\s*=\s*("[^"]*"|'[^']*')"#),
            css_comment: compile(r"(?s)/\*.*?\*/"),
        }
    }

    /// Strips dangerous javascript vectors from anchor/area and image tag
    /// attributes and removes `script`/`xss` tags, repeating until an
    /// iteration changes nothing. Returns `None` when the cap is hit.
    pub(crate) fn strip_dangerous(&self, input: &str, limit: usize) -> Option<String> {
        let mut s = input.to_string();
        for _ in 0..limit {
            let before = s.clone();

            if self.anchor_hint.is_match(&s) {
                s = self.scrub_tag(&self.anchor, &self.bad_href, &s);
            }
            if self.image_hint.is_match(&s) {
                s = self.scrub_tag(&self.image, &self.bad_src, &s);
            }
            if self.script_hint.is_match(&s) {
                s = self.script_tag.replace_all(&s, "").into_owned();
            }

            if s == before {
                return Some(s);
            }
        }
        None
    }

    /// Encodes the delimiting brackets of every never-rendered tag.
    pub(crate) fn encode_naughty(&self, input: &str) -> String {
        self.naughty
            .replace_all(input, |caps: &regex::Captures<'_>| {
                format!(
                    "&lt;{}{}{}{}",
                    &caps[1],
                    &caps[2],
                    &caps[3],
                    caps[4].replace('>', "&gt;").replace('<', "&lt;")
                )
            })
            .into_owned()
    }

    /// Rewrites each matched tag: its attribute text is reduced to the
    /// quoted pairs (comments removed), with any dangerous value chunk
    /// deleted.
    fn scrub_tag(&self, tag: &Regex, bad_value: &Regex, s: &str) -> String {
        tag.replace_all(s, |caps: &regex::Captures<'_>| {
            let whole = &caps[0];
            let attrs = &caps[1];
            if attrs.is_empty() {
                return whole.to_string();
            }
            let filtered = self.filter_attributes(attrs);
            let scrubbed = bad_value.replace_all(&filtered, "");
            whole.replace(attrs, &scrubbed)
        })
        .into_owned()
    }

    /// Re-assembles attribute text from its quoted `name="value"` pairs,
    /// dropping unquoted junk and CSS comment tricks.
    fn filter_attributes(&self, attrs: &str) -> String {
        let mut out = String::new();
        for m in self.attr_pair.find_iter(attrs) {
            out.push_str(&self.css_comment.replace_all(m.as_str(), ""));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> TagSanitizer {
        TagSanitizer::new()
    }

    #[test]
    fn anchor_javascript_href_is_removed() {
        let t = sanitizer();
        let out = t
            .strip_dangerous(r#"<a href="javascript:alert(1)">x</a>"#, 32)
            .unwrap();
        assert!(!out.contains("javascript"));
        assert!(out.contains(">x</a>"));
    }

    #[test]
    fn image_src_eval_is_removed() {
        let t = sanitizer();
        let out = t
            .strip_dangerous(r#"<img src="javascript:eval('x')">"#, 32)
            .unwrap();
        assert!(!out.contains("javascript"));
        assert!(!out.contains("eval('x')"));
    }

    #[test]
    fn benign_links_keep_their_quoted_attributes() {
        let t = sanitizer();
        let out = t
            .strip_dangerous(r#"<a href="https://example.com/page">go</a>"#, 32)
            .unwrap();
        assert!(out.contains(r#"href="https://example.com/page""#));
    }

    #[test]
    fn script_tags_are_stripped_even_when_nested() {
        let t = sanitizer();
        assert_eq!(t.strip_dangerous("<sc<script>ript>", 32).unwrap(), "");
        assert_eq!(
            t.strip_dangerous("a<script>b</script>c", 32).unwrap(),
            "abc"
        );
    }

    #[test]
    fn xss_test_tags_are_stripped() {
        let t = sanitizer();
        assert_eq!(t.strip_dangerous("<xss onload=x>hi</xss>", 32).unwrap(), "hi");
    }

    #[test]
    fn cap_exhaustion_is_reported() {
        let t = sanitizer();
        assert!(t.strip_dangerous("<sc<script>ript>", 1).is_none());
    }

    #[test]
    fn naughty_tag_brackets_are_encoded_not_deleted() {
        let t = sanitizer();
        assert_eq!(
            t.encode_naughty("<iframe src=x>"),
            "&lt;iframe src=x&gt;"
        );
        assert_eq!(
            t.encode_naughty("</body>"),
            "&lt;/body&gt;"
        );
    }

    #[test]
    fn naughty_encoding_defuses_recursive_vectors() {
        let t = sanitizer();
        // both captured delimiters are encoded, so the halves of a split
        // opener cannot rejoin
        assert_eq!(
            t.encode_naughty("<style><style>"),
            "&lt;style&gt;&lt;style>"
        );
    }

    #[test]
    fn ordinary_tags_are_not_naughty() {
        let t = sanitizer();
        assert_eq!(t.encode_naughty("<p>fine</p>"), "<p>fine</p>");
        assert_eq!(t.encode_naughty("<div class=a>"), "<div class=a>");
    }
}
