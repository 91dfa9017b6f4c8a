//! The sanitization engine: sequences the transform passes over scalar
//! text and recurses through nested collections.

use regex::Regex;

use crate::error::{Result, XssScrubberError};
use crate::pass::attributes::EvilAttributeRemover;
use crate::pass::calls::CallNeutralizer;
use crate::pass::compile;
use crate::pass::decode::{EntityDecoder, decode_special_entities};
use crate::pass::normalize::{Normalizer, rawurldecode};
use crate::pass::signature::SignatureFilter;
use crate::pass::tags::TagSanitizer;
use crate::pass::words::WordCompactor;
use crate::value::InputValue;

/// Characters and sequences stripped from untrusted filenames.
const FILENAME_BAD_CHARS: &[&str] = &[
    "../", "<!--", "-->", "<", ">", "'", "\"", "&", "$", "#", "{", "}",
    "[", "]", "=", ";", "?", "%20", "%22",
    "%3c",   // <
    "%253c", // <
    "%3e",   // >
    "%0e",   // >
    "%28",   // (
    "%29",   // )
    "%2528", // (
    "%26",   // &
    "%24",   // $
    "%3f",   // ?
    "%3b",   // ;
    "%3d",   // =
];

/// Outcome of the destructive pipeline stages.
struct Cleaned {
    text: String,
    /// Whether anything after the snapshot point changed the string.
    dirty: bool,
}

/// The sanitization engine.
///
/// Built once via [`XssScrubberBuilder`](crate::XssScrubberBuilder) and
/// shared freely afterwards: every catalog and pattern is compiled at
/// construction and the engine holds no mutable state, so `clean` may run
/// on any number of threads concurrently.
///
/// # Example
///
/// ```
/// use xss_scrubber::XssScrubberBuilder;
///
/// let scrubber = XssScrubberBuilder::new().build();
/// let cleaned = scrubber.clean_text("eval('2+2')")?;
/// assert_eq!(cleaned, "eval&#40;'2+2'&#41;");
/// # Ok::<(), xss_scrubber::XssScrubberError>(())
/// ```
pub struct XssScrubber {
    charset: String,
    safe_marker: String,
    convergence_limit: usize,
    normalizer: Normalizer,
    entities: EntityDecoder,
    signatures: SignatureFilter,
    words: WordCompactor,
    tags: TagSanitizer,
    attributes: EvilAttributeRemover,
    calls: CallNeutralizer,
    img_quoted: Regex,
    img_unquoted: Regex,
}

impl XssScrubber {
    pub(crate) fn from_config(
        charset: String,
        safe_marker: String,
        convergence_limit: usize,
        signatures: SignatureFilter,
    ) -> Self {
        Self {
            charset,
            safe_marker,
            convergence_limit,
            normalizer: Normalizer::new(),
            entities: EntityDecoder::new(),
            signatures,
            words: WordCompactor::new(),
            tags: TagSanitizer::new(),
            attributes: EvilAttributeRemover::new(),
            calls: CallNeutralizer::new(),
            img_quoted: compile(
                r#"(?i)<img[\s/]+.*?src\s*=\s*(?:"([^"]+)"|'([^']+)').*?>"#,
            ),
            img_unquoted: compile(
                r#"(?i)<img[\s/]+.*?src\s*=\s*([^\s"'=<>`]+).*?>"#,
            ),
        }
    }

    /// The charset identifier the engine was configured with.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// The trusted bypass marker the engine was configured with.
    pub fn safe_marker(&self) -> &str {
        &self.safe_marker
    }

    /// Sanitizes an [`InputValue`] tree, returning a value of the same
    /// shape.
    ///
    /// Collection keys are validated before their values are touched: a
    /// key whose sanitized form differs from its percent-decoded form
    /// aborts the whole call with
    /// [`XssScrubberError::KeyInjection`] -- a key-channel injection marks
    /// the request as hostile, so no partial output is produced. Insertion
    /// order and key identity are preserved; non-string scalars pass
    /// through unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use xss_scrubber::{InputValue, XssScrubberBuilder};
    ///
    /// let scrubber = XssScrubberBuilder::new().build();
    /// let form = InputValue::Collection(vec![
    ///     ("comment".into(), InputValue::from("hello %3Cscript%3Eworld")),
    ///     ("count".into(), InputValue::Int(3)),
    /// ]);
    /// let cleaned = scrubber.clean(form)?;
    /// assert_eq!(
    ///     cleaned.get("comment").and_then(|v| v.as_str()),
    ///     Some("hello world"),
    /// );
    /// assert_eq!(cleaned.get("count"), Some(&InputValue::Int(3)));
    /// # Ok::<(), xss_scrubber::XssScrubberError>(())
    /// ```
    pub fn clean(&self, value: InputValue) -> Result<InputValue> {
        match value {
            InputValue::Collection(entries) => {
                let mut cleaned = Vec::with_capacity(entries.len());
                for (key, nested) in entries {
                    self.verify_key(&key)?;
                    cleaned.push((key, self.clean(nested)?));
                }
                Ok(InputValue::Collection(cleaned))
            }
            InputValue::Str(s) => Ok(InputValue::Str(self.clean_text(&s)?)),
            passthrough => Ok(passthrough),
        }
    }

    /// Sanitizes a single text scalar.
    ///
    /// A string carrying the safe marker is trusted: the marker is
    /// stripped and the remainder returned verbatim. Everything else is
    /// entity-decoded once, stripped of tag markup, and run through the
    /// full pipeline.
    pub fn clean_text(&self, input: &str) -> Result<String> {
        if input.is_empty() {
            return Ok(String::new());
        }
        if input.contains(self.safe_marker.as_str()) {
            return Ok(input.replace(self.safe_marker.as_str(), ""));
        }

        let decoded = decode_special_entities(input);
        let stripped = self.normalizer.strip_tags(&decoded);
        Ok(self.do_clean(&stripped, false)?.text)
    }

    /// Judges uploaded image metadata: `true` means the destructive
    /// pipeline stages changed nothing and the metadata is safe to keep
    /// as-is; `false` means dangerous content was found and the upload
    /// should be rejected. The input is never rewritten for the caller.
    ///
    /// # Example
    ///
    /// ```
    /// use xss_scrubber::XssScrubberBuilder;
    ///
    /// let scrubber = XssScrubberBuilder::new().build();
    /// assert!(scrubber.is_image_clean("just a caption")?);
    /// assert!(!scrubber.is_image_clean("<script>alert(1)</script>")?);
    /// # Ok::<(), xss_scrubber::XssScrubberError>(())
    /// ```
    pub fn is_image_clean(&self, metadata: &str) -> Result<bool> {
        let cleaned = self.do_clean(metadata, true)?;
        if cleaned.dirty {
            tracing::debug!("image metadata was altered by sanitization, judging it dirty");
        }
        Ok(!cleaned.dirty)
    }

    /// Decodes named and numeric HTML character entities, with or without
    /// trailing semicolons, to a fixed point. Already-decoded text passes
    /// through unchanged.
    pub fn entity_decode(&self, input: &str) -> String {
        self.entities.decode(input, self.convergence_limit)
    }

    /// Sanitizes a filename by stripping traversal sequences, markup
    /// characters, and their common percent-encoded spellings to a fixed
    /// point. With `relative_path` set, `/` and `./` survive so the value
    /// can still address a subdirectory.
    pub fn sanitize_filename(&self, filename: &str, relative_path: bool) -> String {
        let mut s = self.normalizer.strip_invisible(filename, false);
        loop {
            let mut next = s.clone();
            for bad in FILENAME_BAD_CHARS {
                next = next.replace(bad, "");
            }
            if !relative_path {
                next = next.replace("./", "").replace('/', "");
            }
            if next == s {
                break;
            }
            s = next;
        }
        strip_backslashes(&s)
    }

    /// Replaces `<img>` tags with their bare `src` value, covering quoted
    /// and unquoted attribute forms.
    pub fn strip_image_tags(&self, input: &str) -> String {
        let s = self
            .img_quoted
            .replace_all(input, |caps: &regex::Captures<'_>| {
                caps.get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            });
        self.img_unquoted.replace_all(&s, "${1}").into_owned()
    }

    /// A collection key is trusted only when sanitizing it is a no-op
    /// beyond percent decoding; any other difference means the key channel
    /// itself carried a payload.
    fn verify_key(&self, key: &str) -> Result<()> {
        let cleaned = self.clean_text(key)?;
        if cleaned != rawurldecode(key) {
            tracing::error!(
                "collection key {key:?} carries an injection payload (sanitized to {cleaned:?})"
            );
            return Err(XssScrubberError::KeyInjection {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// The convergence pipeline. Order matters: each step's output is the
    /// next step's input, and the snapshot taken before the destructive
    /// stages drives the image-mode verdict.
    fn do_clean(&self, input: &str, is_image: bool) -> Result<Cleaned> {
        let limit = self.convergence_limit;

        // invisible characters, raw and percent-encoded
        let mut s = self.normalizer.strip_invisible(input, true);

        // url-decode until obfuscated payloads stop surfacing
        s = self
            .normalizer
            .percent_decode_repeated(&s, limit)
            .ok_or_else(|| self.did_not_converge(input))?;

        // keep attribute values inside their quotes, then make
        // entity-obfuscated keywords inside tags visible
        s = self.entities.protect_attribute_quotes(&s);
        s = self.entities.decode_in_tags(&s, limit);

        // decoding can reintroduce control characters
        s = self.normalizer.strip_invisible(&s, true);

        // tabs would otherwise split keywords: ja<tab>vascript
        s = s.replace('\t', " ");

        let snapshot = s.clone();

        s = self.signatures.apply(&s);

        // processing-instruction markers; <?xml is caught too, which has
        // never been a problem in practice
        s = s.replace("<?", "&lt;?").replace("?>", "?&gt;");

        s = self.words.compact(&s);

        s = self
            .tags
            .strip_dangerous(&s, limit)
            .ok_or_else(|| self.did_not_converge(input))?;

        s = self
            .attributes
            .remove(&s, is_image, limit)
            .ok_or_else(|| self.did_not_converge(input))?;

        s = self.tags.encode_naughty(&s);
        s = self.calls.neutralize(&s);

        // backstop for anything the passes above re-assembled
        s = self.signatures.apply(&s);

        Ok(Cleaned {
            dirty: s != snapshot,
            text: s,
        })
    }

    fn did_not_converge(&self, input: &str) -> XssScrubberError {
        let input_prefix: String = input.chars().take(128).collect();
        tracing::warn!(
            "sanitization did not converge after {} passes (input prefix {input_prefix:?})",
            self.convergence_limit
        );
        XssScrubberError::DidNotConverge {
            limit: self.convergence_limit,
            input_prefix,
        }
    }
}

/// Removes one level of backslash escaping.
fn strip_backslashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::XssScrubberBuilder;

    fn scrubber() -> XssScrubber {
        XssScrubberBuilder::new().build()
    }

    #[test]
    fn safe_marker_bypasses_sanitization() {
        let s = scrubber();
        assert_eq!(
            s.clean_text("_xss_safe_flag<b>trusted</b>").unwrap(),
            "<b>trusted</b>"
        );
        assert_eq!(s.clean_text("_xss_safe_flag").unwrap(), "");
    }

    #[test]
    fn empty_string_short_circuits() {
        assert_eq!(scrubber().clean_text("").unwrap(), "");
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let s = scrubber();
        assert_eq!(s.clean(InputValue::Int(-3)).unwrap(), InputValue::Int(-3));
        assert_eq!(
            s.clean(InputValue::Bool(true)).unwrap(),
            InputValue::Bool(true)
        );
        assert_eq!(s.clean(InputValue::Null).unwrap(), InputValue::Null);
    }

    #[test]
    fn markup_is_stripped_before_the_pipeline() {
        let s = scrubber();
        assert_eq!(
            s.clean_text(r#"<a href="javascript:alert(1)">x</a>"#).unwrap(),
            "x"
        );
    }

    #[test]
    fn percent_encoded_keys_are_legitimate() {
        let s = scrubber();
        let v = InputValue::Collection(vec![(
            "first%20name".to_string(),
            InputValue::from("alice"),
        )]);
        assert!(s.clean(v).is_ok());
    }

    #[test]
    fn injected_key_aborts_the_whole_call() {
        let s = scrubber();
        let v = InputValue::Collection(vec![
            ("fine".to_string(), InputValue::from("a")),
            ("<script>".to_string(), InputValue::from("b")),
        ]);
        match s.clean(v) {
            Err(XssScrubberError::KeyInjection { key }) => {
                assert_eq!(key, "<script>");
            }
            other => panic!("expected KeyInjection, got {other:?}"),
        }
    }

    #[test]
    fn convergence_cap_is_enforced() {
        let s = XssScrubberBuilder::new().convergence_limit(1).build();
        match s.clean_text("%253Cscript%253E") {
            Err(XssScrubberError::DidNotConverge { limit, .. }) => {
                assert_eq!(limit, 1);
            }
            other => panic!("expected DidNotConverge, got {other:?}"),
        }
    }

    #[test]
    fn entity_decode_is_exposed() {
        assert_eq!(scrubber().entity_decode("&lt;b&gt;"), "<b>");
    }

    #[test]
    fn filename_traversal_is_removed() {
        let s = scrubber();
        assert_eq!(s.sanitize_filename("../../etc/passwd", false), "etcpasswd");
        assert_eq!(
            s.sanitize_filename("../../etc/passwd", true),
            "etc/passwd"
        );
    }

    #[test]
    fn filename_markup_and_escapes_are_removed() {
        let s = scrubber();
        assert_eq!(s.sanitize_filename("a<b>%3cc%3e.txt", false), "abc.txt");
        assert_eq!(s.sanitize_filename(r"re\port.txt", false), "report.txt");
    }

    #[test]
    fn image_tags_reduce_to_their_source() {
        let s = scrubber();
        assert_eq!(
            s.strip_image_tags(r#"see <img src="http://example.com/x.gif"> here"#),
            "see http://example.com/x.gif here"
        );
        assert_eq!(
            s.strip_image_tags("<img src=pic.png alt=x>"),
            "pic.png"
        );
    }

    #[test]
    fn image_mode_judges_without_rewriting() {
        let s = scrubber();
        assert!(s.is_image_clean("GIF89a plain caption").unwrap());
        assert!(!s.is_image_clean("GIF89a<script>alert('x')</script>").unwrap());
    }
}
