//! Control-character stripping, coarse tag stripping, and the repeated
//! percent-decoding loop.

use percent_encoding::percent_decode_str;
use regex::Regex;

use super::compile;

/// Decodes every valid `%xx` escape, leaving `+` and malformed escapes
/// untouched. Byte sequences that do not form valid UTF-8 are replaced
/// with U+FFFD.
pub(crate) fn rawurldecode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Normalizes raw input before any pattern matching runs.
///
/// Strips non-printable control characters -- both raw bytes and their
/// percent-encoded spellings -- and percent-decodes obfuscated input until
/// it reaches a fixed point. Newline, carriage return, and tab survive;
/// tab-to-space collapsing happens later in the pipeline so exploded
/// keywords line up for the compaction pass.
pub(crate) struct Normalizer {
    encoded_low: Regex,
    encoded_high: Regex,
    control_bytes: Regex,
    percent_run: Regex,
    comment: Regex,
    tag: Regex,
}

impl Normalizer {
    pub(crate) fn new() -> Self {
        Self {
            // url encoded 00-08, 11, 12, 14, 15
            encoded_low: compile(r"%0[0-8bcef]"),
            // url encoded 16-31
            encoded_high: compile(r"%1[0-9a-f]"),
            // 00-08, 11, 12, 14-31, 127
            control_bytes: compile(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]+"),
            percent_run: compile(r"(?i)%(?:\s*[0-9a-f]){2,}"),
            comment: compile(r"(?s)<!--.*?-->"),
            tag: compile(r"(?s)<[^>]*(?:>|$)"),
        }
    }

    /// Removes invisible characters, repeating until none remain so that
    /// interleaved spellings (`%0%300` and friends) cannot survive a
    /// single-pass filter.
    pub(crate) fn strip_invisible(&self, input: &str, url_encoded: bool) -> String {
        let mut s = input.to_string();
        loop {
            let mut next = s.clone();
            if url_encoded {
                next = self.encoded_low.replace_all(&next, "").into_owned();
                next = self.encoded_high.replace_all(&next, "").into_owned();
            }
            next = self.control_bytes.replace_all(&next, "").into_owned();
            if next == s {
                return s;
            }
            // every replacement shrinks the string, so this terminates
            s = next;
        }
    }

    /// Coarse markup strip used by the scalar pre-pass: removes comments,
    /// complete tags, and an unterminated trailing `<...` run.
    pub(crate) fn strip_tags(&self, input: &str) -> String {
        let s = self.comment.replace_all(input, "");
        self.tag.replace_all(&s, "").into_owned()
    }

    /// Percent-decodes until a fixed point is reached.
    ///
    /// After each decode, whitespace interleaved *inside* a percent-escape
    /// run is collapsed and the run decoded again, defeating payloads like
    /// `%3 C` that dodge a single-pass decoder. Returns `None` when the
    /// iteration cap is exhausted.
    pub(crate) fn percent_decode_repeated(&self, input: &str, limit: usize) -> Option<String> {
        if !input.contains('%') {
            return Some(input.to_string());
        }
        let mut s = input.to_string();
        for _ in 0..limit {
            let before = s.clone();
            s = rawurldecode(&s);
            s = self
                .percent_run
                .replace_all(&s, |caps: &regex::Captures<'_>| {
                    let run = &caps[0];
                    let packed: String = run.chars().filter(|c| !c.is_whitespace()).collect();
                    if packed == run {
                        run.to_string()
                    } else {
                        rawurldecode(&packed)
                    }
                })
                .into_owned();
            if s == before {
                return Some(s);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_raw_control_bytes() {
        let n = Normalizer::new();
        assert_eq!(n.strip_invisible("ab\x00cd\x1fef\x7f", true), "abcdef");
    }

    #[test]
    fn keeps_newline_carriage_return_and_tab() {
        let n = Normalizer::new();
        assert_eq!(n.strip_invisible("a\tb\nc\rd", true), "a\tb\nc\rd");
    }

    #[test]
    fn strips_percent_encoded_control_sequences() {
        let n = Normalizer::new();
        assert_eq!(n.strip_invisible("ja%0bvascript", true), "javascript");
        assert_eq!(n.strip_invisible("a%1fb%10c", true), "abc");
    }

    #[test]
    fn filename_mode_leaves_percent_escapes_alone() {
        let n = Normalizer::new();
        assert_eq!(n.strip_invisible("a%0bb", false), "a%0bb");
    }

    #[test]
    fn decodes_double_encoded_markup() {
        let n = Normalizer::new();
        assert_eq!(
            n.percent_decode_repeated("%253Cscript%253E", 32).unwrap(),
            "<script>"
        );
    }

    #[test]
    fn collapses_whitespace_inside_escape_runs() {
        let n = Normalizer::new();
        assert_eq!(
            n.percent_decode_repeated("%3 Cscript%3E", 32).unwrap(),
            "<script>"
        );
    }

    #[test]
    fn plus_signs_survive_decoding() {
        let n = Normalizer::new();
        assert_eq!(n.percent_decode_repeated("a+b%20c", 32).unwrap(), "a+b c");
    }

    #[test]
    fn exhausted_cap_reports_non_convergence() {
        let n = Normalizer::new();
        assert!(n.percent_decode_repeated("%253C", 1).is_none());
    }

    #[test]
    fn strip_tags_removes_complete_and_dangling_markup() {
        let n = Normalizer::new();
        assert_eq!(n.strip_tags("a<b>c</b>d"), "acd");
        assert_eq!(n.strip_tags("text <img src=x"), "text ");
        assert_eq!(n.strip_tags("x<!-- hidden -->y"), "xy");
    }
}
