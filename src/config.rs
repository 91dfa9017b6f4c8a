//! Builder for configuring and constructing an [`XssScrubber`].

use regex::Regex;

use crate::engine::XssScrubber;
use crate::pass::signature::SignatureFilter;

/// Default trusted bypass marker.
const DEFAULT_SAFE_MARKER: &str = "_xss_safe_flag";

/// Default cap for every fixed-point loop in the pipeline.
const DEFAULT_CONVERGENCE_LIMIT: usize = 100;

/// Builder for configuring and constructing an [`XssScrubber`].
///
/// Provides a fluent API for setting the charset identifier, the trusted
/// safe marker, the fixed-point iteration cap, and for appending rules to
/// the never-allowed catalog. All catalogs are compiled by
/// [`build`](Self::build); the resulting engine is immutable.
///
/// # Example
///
/// ```rust
/// use xss_scrubber::XssScrubberBuilder;
///
/// let scrubber = XssScrubberBuilder::new()
///     .charset("utf-8")
///     .safe_marker("{{render_trusted}}")
///     .convergence_limit(64)
///     .deny_literal("INTERNAL_SESSION_TOKEN", "[removed]")
///     .deny_pattern(r"forbidden\s*word", "")
///     .build();
///
/// assert_eq!(scrubber.safe_marker(), "{{render_trusted}}");
/// ```
pub struct XssScrubberBuilder {
    charset: String,
    safe_marker: String,
    convergence_limit: usize,
    signatures: SignatureFilter,
}

impl XssScrubberBuilder {
    /// Create a new builder with sensible defaults.
    ///
    /// Defaults: charset `utf-8`, marker `_xss_safe_flag`, convergence
    /// limit 100, the built-in never-allowed catalog and nothing else.
    pub fn new() -> Self {
        Self {
            charset: "utf-8".to_string(),
            safe_marker: DEFAULT_SAFE_MARKER.to_string(),
            convergence_limit: DEFAULT_CONVERGENCE_LIMIT,
            signatures: SignatureFilter::new(),
        }
    }

    /// Charset identifier recorded on the engine, used for entity-decoding
    /// tables. The Rust decoding stack is UTF-8; the identifier exists for
    /// parity with a process-wide charset setting.
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// The trusted bypass marker. A scalar containing it is returned with
    /// the marker stripped and **no sanitization applied**, so it must
    /// only ever be inserted by trusted template-rendering code -- never
    /// derived from request data.
    pub fn safe_marker(mut self, marker: impl Into<String>) -> Self {
        self.safe_marker = marker.into();
        self
    }

    /// Cap applied to every fixed-point loop. Exhausting it surfaces
    /// [`XssScrubberError::DidNotConverge`](crate::XssScrubberError::DidNotConverge)
    /// instead of looping forever on pathological input.
    pub fn convergence_limit(mut self, limit: usize) -> Self {
        self.convergence_limit = limit;
        self
    }

    /// Appends a literal rule to the never-allowed catalog. Matching is
    /// case-insensitive; every occurrence is replaced with `replacement`.
    ///
    /// Rules run in the order they are added, after the built-in catalog.
    pub fn deny_literal(mut self, needle: &str, replacement: &str) -> Self {
        self.signatures.push_literal(needle, replacement);
        self
    }

    /// Appends a regex rule to the never-allowed catalog. Patterns are
    /// applied case-insensitively with `.` matching newlines.
    ///
    /// # Panics
    ///
    /// Panics if the pattern is invalid. Use
    /// [`try_deny_pattern`](Self::try_deny_pattern) for a fallible
    /// alternative.
    pub fn deny_pattern(mut self, pattern: &str, replacement: &str) -> Self {
        let re = Regex::new(&format!("(?is){pattern}")).expect("invalid regex pattern");
        self.signatures.push_pattern(re, replacement);
        self
    }

    /// Fallible counterpart of [`deny_pattern`](Self::deny_pattern) that
    /// returns a [`regex::Error`] for invalid patterns.
    pub fn try_deny_pattern(
        mut self,
        pattern: &str,
        replacement: &str,
    ) -> Result<Self, regex::Error> {
        let re = Regex::new(&format!("(?is){pattern}"))?;
        self.signatures.push_pattern(re, replacement);
        Ok(self)
    }

    /// Consume the builder and construct the engine, compiling every
    /// catalog and pattern once.
    pub fn build(self) -> XssScrubber {
        XssScrubber::from_config(
            self.charset,
            self.safe_marker,
            self.convergence_limit,
            self.signatures,
        )
    }
}

impl Default for XssScrubberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let scrubber = XssScrubberBuilder::new().build();
        assert_eq!(scrubber.charset(), "utf-8");
        assert_eq!(scrubber.safe_marker(), "_xss_safe_flag");
    }

    #[test]
    fn custom_marker_is_honored() {
        let scrubber = XssScrubberBuilder::new().safe_marker("{{ok}}").build();
        assert_eq!(scrubber.clean_text("{{ok}}<b>raw</b>").unwrap(), "<b>raw</b>");
    }

    #[test]
    fn custom_literal_rules_reach_the_pipeline() {
        let scrubber = XssScrubberBuilder::new()
            .deny_literal("SESSION_SECRET", "[redacted]")
            .build();
        assert_eq!(
            scrubber.clean_text("id=SESSION_SECRET;").unwrap(),
            "id=[redacted];"
        );
    }

    #[test]
    fn custom_pattern_rules_reach_the_pipeline() {
        let scrubber = XssScrubberBuilder::new()
            .deny_pattern(r"token-\d+", "token-?")
            .build();
        assert_eq!(
            scrubber.clean_text("got token-12345 here").unwrap(),
            "got token-? here"
        );
    }

    #[test]
    fn try_deny_pattern_rejects_bad_regexes() {
        assert!(
            XssScrubberBuilder::new()
                .try_deny_pattern("[unclosed", "")
                .is_err()
        );
        assert!(
            XssScrubberBuilder::new()
                .try_deny_pattern(r"\d+", "")
                .is_ok()
        );
    }
}
