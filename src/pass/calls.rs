//! Neutralization of dangerous function-call syntax.

use regex::Regex;

use super::compile;

/// Function names whose call syntax is defused. The name and arguments are
/// left as plain text; only the delimiters are entity-encoded, so
/// `eval('code')` becomes `eval&#40;'code'&#41;` and cannot execute if
/// re-rendered.
pub(crate) const DANGEROUS_CALLS: &[&str] = &[
    "alert", "prompt", "confirm", "cmd", "passthru", "eval", "exec",
    "expression", "system", "fopen", "fsockopen", "file",
    "file_get_contents", "readfile", "unlink",
];

pub(crate) struct CallNeutralizer {
    parens: Regex,
    backticks: Regex,
}

impl CallNeutralizer {
    pub(crate) fn new() -> Self {
        let names = DANGEROUS_CALLS.join("|");
        Self {
            parens: compile(&format!(r"(?is)({names})(\s*)\((.*?)\)")),
            // tag-function form: eval`some code`
            backticks: compile(&format!(r"(?is)({names})(\s*)`(.*?)`")),
        }
    }

    /// Entity-encodes the parentheses and backticks of each dangerous
    /// call.
    pub(crate) fn neutralize(&self, input: &str) -> String {
        let s = self
            .parens
            .replace_all(input, "${1}${2}&#40;${3}&#41;")
            .into_owned();
        self.backticks
            .replace_all(&s, "${1}${2}&#96;${3}&#96;")
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_parentheses_are_encoded() {
        let c = CallNeutralizer::new();
        assert_eq!(
            c.neutralize("eval('some code')"),
            "eval&#40;'some code'&#41;"
        );
        assert_eq!(c.neutralize("alert (1)"), "alert &#40;1&#41;");
    }

    #[test]
    fn template_literal_calls_are_encoded() {
        let c = CallNeutralizer::new();
        assert_eq!(c.neutralize("alert`1`"), "alert&#96;1&#96;");
    }

    #[test]
    fn longest_name_wins_over_its_prefix() {
        let c = CallNeutralizer::new();
        assert_eq!(
            c.neutralize("file_get_contents(p)"),
            "file_get_contents&#40;p&#41;"
        );
    }

    #[test]
    fn unrelated_calls_are_untouched() {
        let c = CallNeutralizer::new();
        assert_eq!(c.neutralize("max(1, 2)"), "max(1, 2)");
    }
}
