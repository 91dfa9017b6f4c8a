//! HTML character-entity decoding and attribute protection.
//!
//! Entity-obfuscated keywords (`&#106;avascript`, `java&colon;`...) must be
//! made visible before the keyword filters run. Decoding is done to a fixed
//! point in three layers per iteration: bare named entities missing their
//! semicolon, numeric entities missing their semicolon, then the
//! standards-compliant decoder for everything properly terminated.

use regex::Regex;
use uuid::Uuid;

use super::compile;

/// Named entities that are decoded even without a trailing semicolon, as
/// long as the next character could not extend the name. Curated to the
/// punctuation and whitespace spellings seen in obfuscated payloads;
/// properly terminated entities of any name are handled by the
/// standards layer instead.
const BARE_NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{a0}"),
    ("colon", ":"),
    ("semi", ";"),
    ("comma", ","),
    ("period", "."),
    ("sol", "/"),
    ("bsol", "\\"),
    ("lpar", "("),
    ("rpar", ")"),
    ("lsqb", "["),
    ("rsqb", "]"),
    ("lcub", "{"),
    ("rcub", "}"),
    ("excl", "!"),
    ("num", "#"),
    ("percnt", "%"),
    ("quest", "?"),
    ("equals", "="),
    ("plus", "+"),
    ("ast", "*"),
    ("commat", "@"),
    ("dollar", "$"),
    ("lowbar", "_"),
    ("grave", "`"),
    ("tab", "\t"),
    ("newline", "\n"),
];

/// Decodes the five special entities produced by standard HTML escaping.
/// Used once by the scalar pre-pass; `&amp;` goes last so the result is a
/// single level of decoding, not a cascade.
pub(crate) fn decode_special_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Charset-aware entity decoding plus the two tag-scoped protections that
/// run before it in the pipeline.
pub(crate) struct EntityDecoder {
    bare_named: Regex,
    numeric: Regex,
    attr_value: Regex,
    tag_tail: Regex,
    query_pair: Regex,
}

impl EntityDecoder {
    pub(crate) fn new() -> Self {
        Self {
            bare_named: compile(r"&[a-zA-Z]{2,}"),
            numeric: compile(r"&#(?:[xX]0*[0-9a-fA-F]{2,5}|0*[0-9]{2,4})"),
            attr_value: compile(r#"(?is)[^a-z0-9>]+[a-z0-9]+=("[^"]*"|'[^']*')"#),
            tag_tail: compile(r"(?is)<\w+.*"),
            query_pair: compile(r"(?i)&([a-z_0-9-]+)=([a-z_0-9/-]+)"),
        }
    }

    /// Decodes named and numeric entities, with or without trailing
    /// semicolons, until the string stops changing.
    ///
    /// The cap exists only as a backstop: every rewrite turns entities into
    /// plain text, so the loop converges on its own.
    pub(crate) fn decode(&self, input: &str, limit: usize) -> String {
        if !input.contains('&') {
            return input.to_string();
        }
        let mut s = input.to_string();
        for _ in 0..limit {
            let before = s.clone();
            s = self.decode_bare_named(&s);
            s = self.terminate_numeric(&s);
            s = html_escape::decode_html_entities(&s).into_owned();
            if s == before {
                break;
            }
        }
        s
    }

    /// Within substrings that look like the start of a tag, decodes
    /// entities while shielding `&key=value` URL fragments behind a
    /// one-time token so query strings are not corrupted.
    pub(crate) fn decode_in_tags(&self, input: &str, limit: usize) -> String {
        self.tag_tail
            .replace_all(input, |caps: &regex::Captures<'_>| {
                let token = Uuid::new_v4().simple().to_string();
                let guarded = self
                    .query_pair
                    .replace_all(&caps[0], |pair: &regex::Captures<'_>| {
                        format!("{token}{}={}", &pair[1], &pair[2])
                    })
                    .into_owned();
                self.decode(&guarded, limit).replace(&token, "&")
            })
            .into_owned()
    }

    /// Entity-encodes `<` and `>` (and doubles backslashes) inside quoted
    /// `attribute="value"` text, so a value cannot break out of its quotes
    /// once tag-level decoding has run.
    pub(crate) fn protect_attribute_quotes(&self, input: &str) -> String {
        self.attr_value
            .replace_all(input, |caps: &regex::Captures<'_>| {
                caps[0]
                    .replace('>', "&gt;")
                    .replace('<', "&lt;")
                    .replace('\\', "\\\\")
            })
            .into_owned()
    }

    /// Decodes `&name` spellings whose next character rules out a longer
    /// entity name or a proper `&name;` form.
    fn decode_bare_named(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for m in self.bare_named.find_iter(s) {
            let next = s[m.end()..].chars().next();
            if matches!(next, Some(c) if c.is_ascii_alphabetic() || c == ';') {
                continue;
            }
            let name = s[m.start() + 1..m.end()].to_ascii_lowercase();
            if let Some((_, decoded)) =
                BARE_NAMED_ENTITIES.iter().find(|(n, _)| *n == name)
            {
                out.push_str(&s[last..m.start()]);
                out.push_str(decoded);
                last = m.end();
            }
        }
        out.push_str(&s[last..]);
        out
    }

    /// Appends the semicolon missing from numeric entities so the
    /// standards layer will decode them, unless the following character
    /// would have extended the number.
    fn terminate_numeric(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut last = 0;
        for m in self.numeric.find_iter(s) {
            let body = &s[m.start() + 2..m.end()];
            let hex = body.starts_with('x') || body.starts_with('X');
            let next = s[m.end()..].chars().next();
            let leave = match next {
                Some(';') => true,
                Some(c) if hex && c.is_ascii_hexdigit() => true,
                Some(c) if !hex && c.is_ascii_digit() => true,
                _ => false,
            };
            out.push_str(&s[last..m.end()]);
            if !leave {
                out.push(';');
            }
            last = m.end();
        }
        out.push_str(&s[last..]);
        out
    }
}
