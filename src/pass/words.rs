//! Compaction of whitespace-exploded keywords.

use regex::Regex;

use super::compile;

/// Keywords that attackers split with whitespace (`j a v a s c r i p t`)
/// to dodge the literal filters. Compacted back to contiguous form before
/// the tag and signature passes run.
pub(crate) const EXPLODED_WORDS: &[&str] = &[
    "javascript",
    "expression",
    "vbscript",
    "jscript",
    "wscript",
    "vbs",
    "script",
    "base64",
    "applet",
    "alert",
    "document",
    "write",
    "cookie",
    "window",
    "confirm",
    "prompt",
    "eval",
];

pub(crate) struct WordCompactor {
    patterns: Vec<Regex>,
}

impl WordCompactor {
    pub(crate) fn new() -> Self {
        let patterns = EXPLODED_WORDS
            .iter()
            .map(|word| {
                let spaced: Vec<String> =
                    word.chars().map(|c| c.to_string()).collect();
                // only when followed by a non-word character, so valid text
                // like "dealer to" is not glued into "dealerto"
                compile(&format!(
                    r"(?is)({})([^0-9A-Za-z_])",
                    spaced.join(r"\s*")
                ))
            })
            .collect();
        Self { patterns }
    }

    /// Collapses the whitespace out of each exploded keyword occurrence.
    pub(crate) fn compact(&self, input: &str) -> String {
        self.patterns.iter().fold(input.to_string(), |acc, re| {
            re.replace_all(&acc, |caps: &regex::Captures<'_>| {
                let packed: String = caps[1]
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                format!("{packed}{}", &caps[2])
            })
            .into_owned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compacts_exploded_javascript() {
        let c = WordCompactor::new();
        assert_eq!(c.compact("j a v a s c r i p t:"), "javascript:");
    }

    #[test]
    fn compacts_mixed_case_and_tabs() {
        let c = WordCompactor::new();
        // the separator itself (here a space) is preserved
        assert_eq!(c.compact("E v A l('x')"), "EvAl('x')");
        assert_eq!(c.compact("e\tv\ta\tl('x')"), "eval('x')");
    }

    #[test]
    fn ordinary_prose_is_untouched() {
        let c = WordCompactor::new();
        assert_eq!(c.compact("dealer to"), "dealer to");
        assert_eq!(c.compact("a script runs"), "a script runs");
    }

    #[test]
    fn requires_a_trailing_separator() {
        let c = WordCompactor::new();
        // nothing follows the word, so nothing is compacted
        assert_eq!(c.compact("j a v a s c r i p t"), "j a v a s c r i p t");
    }
}
