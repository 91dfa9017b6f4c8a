//! The individual transform passes of the sanitization pipeline.
//!
//! Each file holds one focused concern with its own compiled patterns:
//!
//! - [`normalize`] -- control-character stripping and percent-decoding.
//! - [`decode`] -- HTML entity decoding and attribute-quote protection.
//! - [`signature`] -- the never-allowed literal/regex catalog.
//! - [`words`] -- compaction of whitespace-exploded keywords.
//! - [`tags`] -- link/img scrubbing, script-tag stripping, naughty tags.
//! - [`attributes`] -- evil event-handler attribute removal.
//! - [`calls`] -- dangerous function-call neutralization.
//!
//! The passes are internal; the engine sequences them. Every pattern is
//! compiled once at engine construction.

pub(crate) mod attributes;
pub(crate) mod calls;
pub(crate) mod decode;
pub(crate) mod normalize;
pub(crate) mod signature;
pub(crate) mod tags;
pub(crate) mod words;

use regex::Regex;

/// Compiles a built-in pattern, panicking on programmer error.
///
/// Only ever called with patterns fixed at compile time (or assembled from
/// `regex::escape`d fragments), so a failure here is a bug, not bad input.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}
