//! The [`InputValue`] tree that sanitization operates on.

/// An untrusted input value: either a scalar or an ordered collection of
/// key/value pairs nested to arbitrary depth.
///
/// This mirrors the shape of decoded request data (form fields, query
/// parameters, JSON-ish payloads). Only [`Str`](InputValue::Str) scalars
/// and collection keys are sanitized; numbers, booleans, and nulls pass
/// through [`XssScrubber::clean`](crate::XssScrubber::clean) unchanged.
///
/// Collections preserve insertion order and key identity exactly, so a
/// cleaned value has the same shape as the input.
///
/// # Example
///
/// ```
/// use xss_scrubber::InputValue;
///
/// let form = InputValue::Collection(vec![
///     ("username".into(), InputValue::from("alice")),
///     ("age".into(), InputValue::Int(42)),
/// ]);
/// assert!(form.get("username").is_some());
/// assert_eq!(form.get("age"), Some(&InputValue::Int(42)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// An absent or null value.
    Null,
    /// A boolean scalar; passes through sanitization unchanged.
    Bool(bool),
    /// An integer scalar; passes through sanitization unchanged.
    Int(i64),
    /// A floating-point scalar; passes through sanitization unchanged.
    Float(f64),
    /// A text scalar; the only scalar kind the pipeline rewrites.
    Str(String),
    /// An ordered mapping from untrusted key to nested value.
    Collection(Vec<(String, InputValue)>),
}

impl InputValue {
    /// Returns the inner string slice for `Str` values, `None` otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            InputValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up the first entry with the given key in a `Collection`.
    ///
    /// Returns `None` for scalars and for missing keys.
    pub fn get(&self, key: &str) -> Option<&InputValue> {
        match self {
            InputValue::Collection(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns `true` for the `Collection` variant.
    pub fn is_collection(&self) -> bool {
        matches!(self, InputValue::Collection(_))
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::Str(s.to_string())
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        InputValue::Str(s)
    }
}

impl From<bool> for InputValue {
    fn from(b: bool) -> Self {
        InputValue::Bool(b)
    }
}

impl From<i64> for InputValue {
    fn from(n: i64) -> Self {
        InputValue::Int(n)
    }
}

impl From<f64> for InputValue {
    fn from(n: f64) -> Self {
        InputValue::Float(n)
    }
}

impl FromIterator<(String, InputValue)> for InputValue {
    fn from_iter<I: IntoIterator<Item = (String, InputValue)>>(iter: I) -> Self {
        InputValue::Collection(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_preserves_insertion_order() {
        let v: InputValue = vec![
            ("z".to_string(), InputValue::from("last?")),
            ("a".to_string(), InputValue::from("first?")),
        ]
        .into_iter()
        .collect();

        match v {
            InputValue::Collection(entries) => {
                assert_eq!(entries[0].0, "z");
                assert_eq!(entries[1].0, "a");
            }
            _ => panic!("expected a collection"),
        }
    }

    #[test]
    fn get_on_scalar_is_none() {
        assert_eq!(InputValue::from("text").get("key"), None);
    }

    #[test]
    fn as_str_only_for_strings() {
        assert_eq!(InputValue::from("hi").as_str(), Some("hi"));
        assert_eq!(InputValue::Int(7).as_str(), None);
        assert_eq!(InputValue::Null.as_str(), None);
    }
}
