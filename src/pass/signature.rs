//! The never-allowed signature catalog.
//!
//! An ordered set of literal and regex rules that are unconditionally
//! replaced wherever they appear. The catalog is append-only while the
//! engine is being configured and immutable afterwards; replacements are
//! chosen so no rule can reintroduce a byte sequence another rule would
//! have to re-filter.

use regex::Regex;

use super::compile;

/// Literal signatures and their replacements. Matching is
/// case-insensitive. Markup openers are entity-escaped rather than
/// deleted so surrounding fragments cannot join into a new opener.
const NEVER_ALLOWED_LITERALS: &[(&str, &str)] = &[
    ("document.cookie", ""),
    ("(document).cookie", ""),
    ("document.write", ""),
    ("(document).write", ""),
    (".parentNode", ""),
    (".innerHTML", ""),
    ("-moz-binding", ""),
    ("<!--", "&lt;!--"),
    ("-->", "--&gt;"),
    ("<![CDATA[", "&lt;![CDATA["),
    ("<comment>", "&lt;comment&gt;"),
    ("<%", "&lt;&#37;"),
];

/// Regex signatures, removed outright.
const NEVER_ALLOWED_PATTERNS: &[&str] = &[
    r"javascript\s*:",
    r"(\(?document\)?|\(?window\)?(\.document)?)\.(location|on\w*)",
    r"expression\s*(\(|&#40;)", // CSS and IE
    r"vbscript\s*:",            // IE, surprise!
    r"wscript\s*:",             // IE
    r"jscript\s*:",             // IE
    r"vbs\s*:",                 // IE
    r"Redirect\s+30\d",
    r#"(["'])?data\s*:.*?base64.*?,"#,
];

/// Ordered catalog of never-allowed rules, applied literal-first.
pub(crate) struct SignatureFilter {
    rules: Vec<(Regex, String)>,
}

impl SignatureFilter {
    pub(crate) fn new() -> Self {
        let mut rules: Vec<(Regex, String)> = NEVER_ALLOWED_LITERALS
            .iter()
            .map(|(needle, replacement)| {
                (
                    compile(&format!("(?i){}", regex::escape(needle))),
                    replacement.to_string(),
                )
            })
            .collect();
        rules.extend(NEVER_ALLOWED_PATTERNS.iter().map(|pattern| {
            (compile(&format!("(?is){pattern}")), String::new())
        }));
        Self { rules }
    }

    /// Appends a caller-supplied literal rule.
    pub(crate) fn push_literal(&mut self, needle: &str, replacement: &str) {
        self.rules.push((
            compile(&format!("(?i){}", regex::escape(needle))),
            replacement.to_string(),
        ));
    }

    /// Appends a caller-supplied, already validated regex rule.
    pub(crate) fn push_pattern(&mut self, pattern: Regex, replacement: &str) {
        self.rules.push((pattern, replacement.to_string()));
    }

    /// Applies every rule in order; each rule sees the previous rule's
    /// output.
    pub(crate) fn apply(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, replacement.as_str()).into_owned()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_property_access_literals() {
        let f = SignatureFilter::new();
        assert_eq!(f.apply("steal document.cookie now"), "steal  now");
        assert_eq!(f.apply("x.innerHTML=y"), "x=y");
    }

    #[test]
    fn literal_matching_is_case_insensitive() {
        let f = SignatureFilter::new();
        assert_eq!(f.apply("DOCUMENT.COOKIE"), "");
        assert_eq!(f.apply("Document.Write('x')"), "('x')");
    }

    #[test]
    fn escapes_markup_openers_instead_of_deleting() {
        let f = SignatureFilter::new();
        assert_eq!(f.apply("a<!--b-->c"), "a&lt;!--b--&gt;c");
        assert_eq!(f.apply("<%= x %>"), "&lt;&#37;= x %>");
    }

    #[test]
    fn removes_script_protocol_idioms() {
        let f = SignatureFilter::new();
        assert_eq!(f.apply("javascript:alert(1)"), "alert(1)");
        assert_eq!(f.apply("JAVASCRIPT  :alert(1)"), "alert(1)");
        assert_eq!(f.apply("vbscript:msgbox"), "msgbox");
    }

    #[test]
    fn removes_window_and_document_property_chains() {
        let f = SignatureFilter::new();
        assert_eq!(f.apply("window.location='x'"), "='x'");
        assert_eq!(f.apply("(document).onload=f"), "=f");
    }

    #[test]
    fn removes_base64_data_uris() {
        let f = SignatureFilter::new();
        let cleaned = f.apply(r#"<a href="data:text/html;base64,PHNjcmlwdD4=">"#);
        assert!(!cleaned.contains("base64,"));
        assert!(!cleaned.contains("data:"));
    }

    #[test]
    fn caller_supplied_rules_run_after_builtins() {
        let mut f = SignatureFilter::new();
        f.push_literal("INTERNAL_TOKEN", "[removed]");
        assert_eq!(f.apply("x internal_token y"), "x [removed] y");
    }

    #[test]
    fn inert_text_is_untouched() {
        let f = SignatureFilter::new();
        let text = "an ordinary sentence with no payload";
        assert_eq!(f.apply(text), text);
    }
}
