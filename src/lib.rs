//! # xss_scrubber
//!
//! An adversarial-input sanitization library that scrubs untrusted text --
//! and, recursively, untrusted nested key/value structures -- of HTML and
//! script injection payloads before a value is stored, logged, or
//! re-rendered.
//!
//! ## Overview
//!
//! The engine runs a multi-pass, fixed-point pipeline modeled on a widely
//! deployed legacy filter: entity and URL decoding, invisible-character
//! stripping, keyword de-obfuscation, attribute and tag neutralization,
//! and a never-allowed signature catalog. It deliberately does *not* parse
//! HTML into a DOM or validate well-formedness; it neutralizes a fixed
//! catalog of known attack vectors with textual transforms, leaving inert
//! content byte-for-byte intact.
//!
//! Every catalog is compiled once by [`XssScrubberBuilder::build`]; the
//! resulting [`XssScrubber`] is immutable, does no I/O, and can be shared
//! across threads without locking.
//!
//! ## Quick start
//!
//! ```rust
//! use xss_scrubber::{InputValue, XssScrubberBuilder};
//!
//! let scrubber = XssScrubberBuilder::new().build();
//!
//! // scalar text
//! let cleaned = scrubber.clean_text("Hi %3Cscript%3Ealert('xss')%3C/script%3E!")?;
//! assert!(!cleaned.contains("<script"));
//! assert!(!cleaned.contains("alert("));
//!
//! // nested request data; keys are validated too
//! let form = InputValue::Collection(vec![
//!     ("title".into(), InputValue::from("hello")),
//! ]);
//! let form = scrubber.clean(form)?;
//! assert_eq!(form.get("title").and_then(|v| v.as_str()), Some("hello"));
//! # Ok::<(), xss_scrubber::XssScrubberError>(())
//! ```
//!
//! ## Image mode
//!
//! Uploaded image metadata is judged rather than rewritten:
//! [`XssScrubber::is_image_clean`] returns `false` when the pipeline had
//! to alter anything, signalling that the upload should be rejected.
//!
//! ## Errors
//!
//! Two conditions are fatal and surface as typed errors: a collection key
//! that fails the injection guard ([`XssScrubberError::KeyInjection`]) and
//! a fixed-point loop exceeding its iteration cap
//! ([`XssScrubberError::DidNotConverge`]). Everything else -- malformed
//! escapes, unknown entities, unmatched tags -- degrades to literal text
//! by design.

pub mod config;
pub mod engine;
pub mod error;
pub mod value;

mod pass;

pub use config::XssScrubberBuilder;
pub use engine::XssScrubber;
pub use error::{Result, XssScrubberError};
pub use value::InputValue;

use std::sync::OnceLock;

// Global state for the optional singleton pattern
static GLOBAL: OnceLock<XssScrubber> = OnceLock::new();

/// Initialize the global [`XssScrubber`] singleton.
///
/// Call once at application startup; afterwards any part of the
/// application can obtain the engine via [`global()`]. The engine is
/// stateless, so sharing one instance process-wide is safe.
///
/// # Panics
///
/// Panics if called more than once.
pub fn init(builder: XssScrubberBuilder) -> &'static XssScrubber {
    GLOBAL
        .set(builder.build())
        .unwrap_or_else(|_| panic!("Global XssScrubber already initialized"));

    GLOBAL.get().expect("initialized on the previous line")
}

/// Retrieve the global [`XssScrubber`] previously registered with
/// [`init()`].
///
/// Returns `None` if [`init()`] has not been called.
pub fn global() -> Option<&'static XssScrubber> {
    GLOBAL.get()
}
