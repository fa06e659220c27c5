//! Input normalization.
//!
//! Collapses layered percent-encoding and HTML character references so the
//! pattern catalog sees canonical text. Decoding is fail-soft: a malformed
//! escape stops percent-decoding and the last good value is kept.

use crate::config::DEFAULT_MAX_DECODE_PASSES;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};
use std::borrow::Cow;

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)&(?:(lt|gt|quot|apos|amp)|#x([0-9a-f]+)|#([0-9]+));").unwrap()
});

/// Decodes percent-escapes and HTML entities to a fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    max_passes: usize,
}

impl Normalizer {
    pub fn new(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
        }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Normalize one string value.
    ///
    /// Each pass percent-decodes once (when every escape is well formed) and
    /// then decodes entities once. Passes repeat until nothing changes.
    pub fn normalize<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(input);

        for _ in 0..self.max_passes {
            let decoded = match percent_decode_once(&current) {
                Some(decoded) => decoded,
                None => current.to_string(),
            };
            let decoded = match decode_entities(&decoded) {
                Cow::Borrowed(_) => decoded,
                Cow::Owned(owned) => owned,
            };

            if decoded == *current {
                break;
            }
            current = Cow::Owned(decoded);
        }

        current
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECODE_PASSES)
    }
}

/// One round of percent-decoding. `None` when there is nothing to decode or
/// the input is malformed.
fn percent_decode_once(input: &str) -> Option<String> {
    if !input.contains('%') || !escapes_well_formed(input) {
        return None;
    }
    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

fn escapes_well_formed(input: &str) -> bool {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// Decode the five named entities and numeric references in one pass.
/// References that do not denote a Unicode scalar value stay as written.
fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    ENTITY.replace_all(input, |caps: &Captures<'_>| {
        if let Some(name) = caps.get(1) {
            return match name.as_str().to_ascii_lowercase().as_str() {
                "lt" => "<",
                "gt" => ">",
                "quot" => "\"",
                "apos" => "'",
                _ => "&",
            }
            .to_string();
        }

        let code = match (caps.get(2), caps.get(3)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };

        match code.and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(input: &str) -> String {
        Normalizer::default().normalize(input).into_owned()
    }

    #[test]
    fn test_plain_text_unchanged() {
        let normalizer = Normalizer::default();
        assert!(matches!(normalizer.normalize("hello world"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_double_percent_encoding() {
        assert_eq!(norm("%253Cscript%253E"), "<script>");
        assert_eq!(norm("%3Cb%3E"), "<b>");
    }

    #[test]
    fn test_malformed_percent_stops_decoding() {
        assert_eq!(norm("100%"), "100%");
        assert_eq!(norm("%zz%3C"), "%zz%3C");
        assert_eq!(norm("%2541%"), "%2541%");
        // Decodes to invalid UTF-8
        assert_eq!(norm("%ff"), "%ff");
    }

    #[test]
    fn test_named_entities() {
        assert_eq!(norm("&lt;script&gt;"), "<script>");
        assert_eq!(norm("&QUOT;&apos;&Amp;"), "\"'&");
    }

    #[test]
    fn test_numeric_entities() {
        assert_eq!(norm("&#60;&#x3c;&#X3E;"), "<<>");
        assert_eq!(norm("&#xD800;"), "&#xD800;");
        assert_eq!(norm("&#99999999999;"), "&#99999999999;");
    }

    #[test]
    fn test_layers_mixed() {
        assert_eq!(norm("&amp;lt;img&amp;gt;"), "<img>");
        assert_eq!(norm("%26lt%3Bscript%26gt%3B"), "<script>");
    }

    #[test]
    fn test_idempotent() {
        for input in ["%253Cscript%253E", "&amp;amp;lt;", "a%2", "&#x110000;", "plain"] {
            let once = norm(input);
            assert_eq!(norm(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn test_pass_limit() {
        let normalizer = Normalizer::new(1);
        assert_eq!(normalizer.normalize("%253C"), "%3C");
        assert_eq!(Normalizer::new(0).max_passes(), 1);
    }
}
