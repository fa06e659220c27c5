//! Compiled XSS pattern catalog.
//!
//! Every pattern runs on the linear-time `regex` engine. The few detectors
//! that need a negative lookahead are split into a match regex plus a
//! [`Guard`] that inspects the match afterwards.

use crate::error::{XssError, XssResult};
use crate::result::Context;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::ops::Range;

/// Longest accepted custom pattern source, in bytes.
pub const MAX_CUSTOM_PATTERN_LEN: usize = 2048;

/// Compiled program size limit for custom patterns.
const CUSTOM_PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Pattern groups, each enabled by one configuration toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Html,
    Javascript,
    Url,
    Css,
    Evasion,
    Form,
    Polyglot,
    Custom,
}

impl Category {
    /// Prefix of the vector identifiers produced by this category.
    pub fn prefix(&self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Javascript => "js",
            Category::Url => "url",
            Category::Css => "css",
            Category::Evasion => "evasion",
            Category::Form => "form",
            Category::Polyglot => "advanced",
            Category::Custom => "custom",
        }
    }

    /// Context recorded when any pattern of this category fires.
    pub fn context(&self) -> Option<Context> {
        match self {
            Category::Html | Category::Form => Some(Context::Html),
            Category::Javascript => Some(Context::Javascript),
            Category::Url => Some(Context::Url),
            Category::Css => Some(Context::Css),
            Category::Evasion | Category::Polyglot | Category::Custom => None,
        }
    }

    /// Check-only categories count matches but never strip them.
    pub fn is_check_only(&self) -> bool {
        matches!(self, Category::Evasion)
    }
}

/// Post-match filter standing in for a lookahead.
#[derive(Debug, Clone)]
pub enum Guard {
    /// Reject the match when its first participating capture group matches
    /// this regex.
    ValueNotPrefixed(Regex),
    /// Reject the match when the text right after it matches this regex.
    NotFollowedBy(Regex),
}

/// One named detector.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    vector: String,
    regex: Regex,
    guard: Option<Guard>,
}

impl Pattern {
    fn builtin(category: Category, name: &str, source: &str) -> Self {
        let regex = Regex::new(source)
            .unwrap_or_else(|e| panic!("built-in pattern {name} failed to compile: {e}"));
        Self {
            vector: format!("{}-{}", category.prefix(), name),
            name: name.to_string(),
            regex,
            guard: None,
        }
    }

    fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Compile a caller-supplied, case-insensitive pattern.
    pub fn custom(index: usize, source: &str) -> XssResult<Self> {
        if source.len() > MAX_CUSTOM_PATTERN_LEN {
            return Err(XssError::PatternTooLong {
                index,
                len: source.len(),
                max: MAX_CUSTOM_PATTERN_LEN,
            });
        }

        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .size_limit(CUSTOM_PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|source_err| XssError::InvalidPattern {
                index,
                pattern: source.to_string(),
                source: source_err,
            })?;

        Ok(Self {
            name: format!("pattern-{index}"),
            vector: format!("{}-pattern-{index}", Category::Custom.prefix()),
            regex,
            guard: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier reported when this pattern fires.
    pub fn vector(&self) -> &str {
        &self.vector
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Byte ranges of every non-overlapping, non-empty accepted match.
    pub fn find_spans(&self, haystack: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut pos = 0;

        while pos <= haystack.len() {
            let (range, accepted) = match &self.guard {
                None => match self.regex.find_at(haystack, pos) {
                    Some(m) => (m.range(), true),
                    None => break,
                },
                Some(Guard::NotFollowedBy(rest)) => match self.regex.find_at(haystack, pos) {
                    Some(m) => (m.range(), !rest.is_match(&haystack[m.end()..])),
                    None => break,
                },
                Some(Guard::ValueNotPrefixed(safe)) => {
                    let Some(caps) = self.regex.captures_at(haystack, pos) else {
                        break;
                    };
                    let Some(whole) = caps.get(0) else {
                        break;
                    };
                    let value = caps
                        .iter()
                        .skip(1)
                        .flatten()
                        .next()
                        .map_or("", |group| group.as_str());
                    (whole.range(), !safe.is_match(value))
                }
            };

            if range.is_empty() || !accepted {
                pos = next_char_boundary(haystack, range.start);
                continue;
            }
            pos = range.end;
            spans.push(range);
        }

        spans
    }

    /// Number of accepted matches.
    pub fn count(&self, haystack: &str) -> usize {
        self.find_spans(haystack).len()
    }
}

fn next_char_boundary(s: &str, at: usize) -> usize {
    at + s[at..].chars().next().map_or(1, char::len_utf8)
}

/// Remove `spans` (sorted, non-overlapping) from `haystack`.
pub fn remove_spans(haystack: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for span in spans {
        out.push_str(&haystack[last..span.start]);
        last = span.end;
    }
    out.push_str(&haystack[last..]);
    out
}

/// Compile every custom payload pattern, failing on the first bad one.
pub fn compile_custom(sources: &[String]) -> XssResult<Vec<Pattern>> {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| Pattern::custom(index, source))
        .collect()
}

// Any tag-like run, used by the sensitive parameter pass
pub(crate) static TAG_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

pub(crate) static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static SAFE_ATTRIBUTE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://|//|/|#|mailto:|tel:|about:|data:image)").unwrap()
});

static IMAGE_MEDIA_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^image/").unwrap());

static SAFE_CSS_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:data:image/|https?://|//|/)").unwrap());

const INLINE_EVENT: &str = r#"(?is)<[^>]+\s+on\w+\s*=\s*(?:"[^"]*"|'[^']*'|`[^`]*`)?[^>]*>"#;

const ENCODED_JAVASCRIPT_URI: &str = r"(?i)(?:%(?:25)?(?:22)?%(?:25)?(?:27)?)?%(?:25)?(?:6A|4A)(?:%25)?(?:61|41)(?:%25)?(?:76|56)(?:%25)?(?:61|41)(?:%25)?(?:73|53)(?:%25)?(?:63|43)(?:%25)?(?:72|52)(?:%25)?(?:69|49)(?:%25)?(?:70|50)(?:%25)?(?:74|54)(?:%25)?(?:3A|%3a)";

static BUILTIN: Lazy<Catalog> = Lazy::new(Catalog::compile);

/// The built-in pattern table, compiled once per process.
#[derive(Debug)]
pub struct Catalog {
    html: Vec<Pattern>,
    javascript: Vec<Pattern>,
    url: Vec<Pattern>,
    css: Vec<Pattern>,
    evasion: Vec<Pattern>,
    form: Vec<Pattern>,
    polyglot: Vec<Pattern>,
}

impl Catalog {
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Patterns of one category in evaluation order. Custom patterns live
    /// on each module, so `Category::Custom` is always empty here.
    pub fn compiled_patterns_for(&self, category: Category) -> &[Pattern] {
        match category {
            Category::Html => &self.html,
            Category::Javascript => &self.javascript,
            Category::Url => &self.url,
            Category::Css => &self.css,
            Category::Evasion => &self.evasion,
            Category::Form => &self.form,
            Category::Polyglot => &self.polyglot,
            Category::Custom => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.html.len()
            + self.javascript.len()
            + self.url.len()
            + self.css.len()
            + self.evasion.len()
            + self.form.len()
            + self.polyglot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compile() -> Self {
        use Category::*;
        let p = Pattern::builtin;

        let html = vec![
            p(Html, "svg-payload", r"(?i)<svg[^>]*on\w+\s*=\s*[^>]*(?:alert|prompt|confirm|eval|function|\()"),
            p(Html, "xmp-breakout", r"(?i)<xmp[^>]*>.*?</xmp><[^>]*on\w+\s*=\s*[^>]*(?:alert|prompt|confirm|eval|function|\()"),
            p(Html, "scriptTags", r"(?is)<script\b.*?</script>|<script\b[^>]*>"),
            p(Html, "dangerousTags", r"(?i)<(?:iframe|object|embed|form|applet|meta|base|link)\b[^>]*>"),
            p(
                Html,
                "dangerousAttributes",
                r#"(?i)\b(?:href|src|style|lowsrc|ping|formaction|action|data|codebase|dynsrc|formmethod|rel)\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)'|`([^`\n]*)`)"#,
            )
            .guarded(Guard::ValueNotPrefixed(SAFE_ATTRIBUTE_VALUE.clone())),
            p(Html, "svgEvents", r"(?is)<svg\b[^>]*>(?:<script\b.*?</script>|</svg>)"),
            p(Html, "svgContent", r"(?is)<svg.*?>.*?</svg>"),
            p(Html, "selfClosingSvg", r"(?i)<svg\s*/[^>]*on\w+\s*=\s*[^>]*>"),
            p(Html, "noSpaceSvg", r"(?i)<svg/[^>]*on\w+\s*=\s*[^>]*>"),
            p(Html, "xmpBreakout", r"(?i)<xmp\b[^>]*>[^<]*</xmp><[^>]*on\w+\s*=\s*[^>]*>"),
            p(Html, "mixedCaseEvents", INLINE_EVENT),
            p(Html, "mathMLContent", r"(?is)<math.*?>.*?</math>"),
            p(Html, "inlineEvent", INLINE_EVENT),
        ];

        let javascript = vec![
            p(Javascript, "eventHandlers", r#"(?i)\s+on\w+\s*=\s*(?:"[^>]*"|'[^>]*'|`[^>]*`|[^>]*)"#),
            p(Javascript, "genericEvent", r"(?i)on\w+\s*="),
            p(Javascript, "unquotedEventHandlers", r#"(?i)<[^>]*\s+on\w+\s*=\s*[^'"` >][^>]*"#),
            p(
                Javascript,
                "jsUris",
                r#"(?i)\b(?:href|src|action|data)\s*=\s*(?:"\s*javascript:[^"\n]*"|'\s*javascript:[^'\n]*'|`\s*javascript:[^`\n]*`)"#,
            ),
            p(Javascript, "directEval", r"(?i)\beval\s*\("),
            p(Javascript, "newFunction", r"(?i)\bnew\s+Function\s*\("),
            p(Javascript, "functionConstructor", r"(?i)\bFunction\s*\("),
            p(Javascript, "documentWrite", r"(?i)\bdocument\.(?:write|writeln)\s*\("),
            p(Javascript, "innerHtml", r"(?i)\.(?:innerHTML|outerHTML)\s*=\s*"),
            p(Javascript, "documentCookie", r"(?i)\bdocument\.cookie\b"),
            p(Javascript, "windowLocation", r"(?i)\blocation\b\s*=\s*"),
            p(Javascript, "setTimeout", r#"(?i)\bsetTimeout\s*\(\s*['"`]"#),
            p(Javascript, "setInterval", r#"(?i)\bsetInterval\s*\(\s*['"`]"#),
            p(Javascript, "backtick", r"`"),
        ];

        let url = vec![
            p(Url, "dataUri", r"(?i)data:")
                .guarded(Guard::NotFollowedBy(IMAGE_MEDIA_TYPE.clone())),
            p(Url, "javascriptUri", r"(?i)javascript:"),
            p(Url, "vbscriptUri", r"(?i)vbscript:"),
            p(Url, "dataImageSvg", r"(?i)data:image/svg"),
            p(Url, "encodedJavaScriptUri", ENCODED_JAVASCRIPT_URI),
        ];

        let css = vec![
            p(Css, "cssExpression", r"(?i)expression\s*\("),
            p(Css, "cssUrl", r#"(?i)url\s*\(\s*['"]?"#)
                .guarded(Guard::NotFollowedBy(SAFE_CSS_URL.clone())),
            p(Css, "cssImport", r#"(?i)@import\s+['"]"#),
        ];

        let evasion = vec![
            p(Evasion, "hexEncoding", r"(?i)&#x[0-9a-f]{2,6};"),
            p(Evasion, "decimalEncoding", r"&#[0-9]{2,6};"),
            p(Evasion, "nullByte", r"(?i)\\x00"),
            p(Evasion, "unicodeEvasion", r"(?i)\\u[0-9a-f]{4}"),
            p(Evasion, "commentedCode", r"/\*.*?\*/"),
            p(Evasion, "multipleEncodings", r"(?i)%(?:[0-9a-f]{2}|u[0-9a-f]{4})"),
        ];

        let form = vec![
            p(Form, "iframe", r"(?i)<iframe\b[^>]*>"),
            p(Form, "object", r"(?i)<object\b[^>]*>"),
            p(Form, "embed", r"(?i)<embed\b[^>]*>"),
            p(Form, "tag", r"(?i)<form\b[^>]*>"),
            p(Form, "button", r"(?i)<button\b[^>]*>"),
            p(Form, "input", r"(?i)<input\b[^>]*>"),
        ];

        let polyglot_literal = |literal: &str| {
            p(Polyglot, "polyglot", &format!("(?i){}", regex::escape(literal)))
        };
        let polyglot = vec![
            polyglot_literal("javascript:/*-/*`/*`/*`/*`/*`/*`*/"),
            polyglot_literal(r#"">'><script>alert("XSS")</script>"#),
            p(
                Polyglot,
                "polyglot",
                r#"(?i)javascript:/\*-/\*`/\*'/\*"/\*\*/\(/* \*/onerror=alert\('1'\)\)//%0D%0A%0d%0a//"#,
            ),
        ];

        Self {
            html,
            javascript,
            url,
            css,
            evasion,
            form,
            polyglot,
        }
    }
}
