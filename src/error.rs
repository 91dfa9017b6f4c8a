//! Error types for the `xss_scrubber` crate.

/// All errors that can occur while sanitizing untrusted input.
///
/// Both variants are fatal for the value being cleaned: sanitization is a
/// pure deterministic function, so retrying reproduces the same outcome.
/// Malformed encodings, unknown entities, and unmatched tags are *not*
/// errors -- the pipeline leaves anything it cannot interpret as literal
/// text.
#[derive(Debug, thiserror::Error)]
pub enum XssScrubberError {
    /// A collection key carried an injection payload.
    ///
    /// The key's sanitized form differed from its percent-decoded form,
    /// which means the key channel itself was used to smuggle script. This
    /// indicates a hostile request rather than a malformed one and aborts
    /// the whole `clean` call.
    #[error("Injection payload detected in collection key {key:?}")]
    KeyInjection {
        /// The offending raw key.
        key: String,
    },

    /// A fixed-point loop exceeded its defensive iteration cap.
    #[error("Sanitization did not converge after {limit} passes")]
    DidNotConverge {
        /// The configured convergence limit that was exhausted.
        limit: usize,
        /// A truncated prefix of the offending input, kept for forensics.
        input_prefix: String,
    },
}

/// A type alias for `Result<T, XssScrubberError>`.
pub type Result<T> = std::result::Result<T, XssScrubberError>;
