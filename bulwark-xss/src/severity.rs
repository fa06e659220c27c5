//! Severity grading of a detection result.

use crate::result::{Context, Severity};
use std::collections::BTreeSet;

/// Map accumulated contexts and match count to a severity.
///
/// First matching rule wins:
/// 1. critical: javascript context and more than 5 matches
/// 2. high: javascript context, or more than 10 matches
/// 3. medium: html context and more than 3 matches
/// 4. low
pub fn classify(contexts: &BTreeSet<Context>, count: usize) -> Severity {
    let javascript = contexts.contains(&Context::Javascript);

    if javascript && count > 5 {
        Severity::Critical
    } else if javascript || count > 10 {
        Severity::High
    } else if contexts.contains(&Context::Html) && count > 3 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(contexts: &[Context]) -> BTreeSet<Context> {
        contexts.iter().copied().collect()
    }

    #[test]
    fn test_ladder() {
        let js = set(&[Context::Javascript]);
        assert_eq!(classify(&js, 6), Severity::Critical);
        assert_eq!(classify(&js, 5), Severity::High);
        assert_eq!(classify(&js, 0), Severity::High);

        assert_eq!(classify(&set(&[Context::Url]), 11), Severity::High);
        assert_eq!(classify(&set(&[Context::Url]), 10), Severity::Low);

        let html = set(&[Context::Html]);
        assert_eq!(classify(&html, 4), Severity::Medium);
        assert_eq!(classify(&html, 3), Severity::Low);
        assert_eq!(classify(&html, 11), Severity::High);
    }

    #[test]
    fn test_empty_is_low() {
        assert_eq!(classify(&BTreeSet::new(), 0), Severity::Low);
        assert_eq!(classify(&set(&[Context::Sensitive, Context::Css]), 10), Severity::Low);
    }
}
