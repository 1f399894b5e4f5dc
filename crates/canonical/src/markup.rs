//! Minimal markup-to-text fallback.
//!
//! Used only when the extractor hands over raw HTML instead of visible text.
//! Boilerplate regions are dropped, the `<main>` or `<article>` region is
//! preferred when present, and remaining tags are stripped. This is not an
//! HTML parser: malformed markup degrades to "strip every tag".

use std::sync::OnceLock;

use regex::Regex;

use crate::whitespace::collapse_whitespace;

static RE_COMMENT: OnceLock<Regex> = OnceLock::new();
static RE_BOILERPLATE: OnceLock<Vec<Regex>> = OnceLock::new();
static RE_MAIN: OnceLock<Regex> = OnceLock::new();
static RE_ARTICLE: OnceLock<Regex> = OnceLock::new();
static RE_BODY: OnceLock<Regex> = OnceLock::new();
static RE_TAG: OnceLock<Regex> = OnceLock::new();

/// Elements whose content is never visible page text.
const BOILERPLATE_TAGS: [&str; 7] = [
    "script", "style", "noscript", "nav", "header", "footer", "aside",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static markup pattern compiles")
}

/// Extract visible text from raw HTML.
///
/// ```rust
/// use canonical::visible_text;
///
/// let html = "<html><nav>Home | About</nav><main><p>Real&nbsp;content</p></main></html>";
/// assert_eq!(visible_text(html), "Real content");
/// ```
pub fn visible_text(html: &str) -> String {
    let comment = RE_COMMENT.get_or_init(|| compile(r"(?s)<!--.*?-->"));
    let mut text = comment.replace_all(html, " ").into_owned();

    let boilerplate = RE_BOILERPLATE.get_or_init(|| {
        BOILERPLATE_TAGS
            .iter()
            .map(|tag| compile(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
            .collect()
    });
    for re in boilerplate {
        text = re.replace_all(&text, " ").into_owned();
    }

    let main = RE_MAIN.get_or_init(|| compile(r"(?is)<main\b[^>]*>(.*?)</main\s*>"));
    let article = RE_ARTICLE.get_or_init(|| compile(r"(?is)<article\b[^>]*>(.*?)</article\s*>"));
    let body = RE_BODY.get_or_init(|| compile(r"(?is)<body\b[^>]*>(.*?)</body\s*>"));
    let region = [main, article, body]
        .into_iter()
        .find_map(|re| re.captures(&text).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .unwrap_or(text);

    let tag = RE_TAG.get_or_init(|| compile(r"(?s)<[^>]*>"));
    let stripped = tag.replace_all(&region, " ");
    collapse_whitespace(&decode_entities(&stripped))
}

/// Decode the handful of entities that commonly carry visible text.
///
/// Anything else is left for the normalizer's entity stripping.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
