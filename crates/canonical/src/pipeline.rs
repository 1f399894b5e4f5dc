use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::NormalizeConfig;
use crate::document::NormalizedText;
use crate::error::NormalizeError;
use crate::hash::hash_normalized_bytes;
use crate::markup::visible_text;
use crate::stopwords::is_stopword;

static RE_ENTITY: OnceLock<Regex> = OnceLock::new();

/// Normalize extracted page text into a token sequence and content hash.
///
/// Fails with [`NormalizeError::EmptyInput`] when nothing survives
/// normalization (empty page, markup only, or only stopwords).
pub fn normalize(input: &str, cfg: &NormalizeConfig) -> Result<NormalizedText, NormalizeError> {
    cfg.validate()?;

    let unicode: Cow<str> = if cfg.normalize_unicode {
        Cow::Owned(input.nfkc().collect::<String>())
    } else {
        Cow::Borrowed(input)
    };

    let cleaned: Cow<str> = if cfg.strip_entities && unicode.contains('&') {
        let re = RE_ENTITY.get_or_init(|| {
            Regex::new(r"(?i)&(?:[a-z]+|#\d+);").expect("static entity pattern compiles")
        });
        Cow::Owned(re.replace_all(&unicode, " ").into_owned())
    } else {
        unicode
    };

    let mut sink = TokenSink::new(cfg, cleaned.len());
    for grapheme in cleaned.graphemes(true) {
        // Lowercasing can expand one character into several.
        if cfg.lowercase {
            for ch in grapheme.to_lowercase().chars() {
                sink.dispatch(ch);
            }
        } else {
            for ch in grapheme.chars() {
                sink.dispatch(ch);
            }
        }
    }
    sink.finalize_token();

    if sink.tokens.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let text = sink.tokens.join(" ");
    let content_hash = hash_normalized_bytes(cfg.version, text.as_bytes());

    Ok(NormalizedText {
        text,
        tokens: sink.tokens,
        content_hash,
        version: cfg.version,
    })
}

/// Normalize raw HTML by extracting its visible text first.
pub fn normalize_markup(
    html: &str,
    cfg: &NormalizeConfig,
) -> Result<NormalizedText, NormalizeError> {
    normalize(&visible_text(html), cfg)
}

/// Accumulates characters into tokens and applies the token filters.
struct TokenSink<'a> {
    cfg: &'a NormalizeConfig,
    current: String,
    tokens: Vec<String>,
}

impl<'a> TokenSink<'a> {
    fn new(cfg: &'a NormalizeConfig, input_len: usize) -> Self {
        Self {
            cfg,
            current: String::new(),
            tokens: Vec::with_capacity((input_len / 6).saturating_add(1)),
        }
    }

    fn dispatch(&mut self, ch: char) {
        if self.is_delimiter(ch) {
            self.finalize_token();
        } else {
            self.current.push(ch);
        }
    }

    fn is_delimiter(&self, ch: char) -> bool {
        if ch.is_whitespace() {
            return true;
        }
        self.cfg.strip_punctuation && !(ch.is_alphanumeric() || ch == '_' || ch.is_mark())
    }

    fn finalize_token(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let token = std::mem::take(&mut self.current);
        if self.cfg.min_token_chars > 1 && token.chars().count() < self.cfg.min_token_chars {
            return;
        }
        if self.cfg.remove_stopwords && is_stopword(&token) {
            return;
        }
        self.tokens.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep_all() -> NormalizeConfig {
        NormalizeConfig::new()
            .with_stopwords(false)
            .with_min_token_chars(0)
    }

    #[test]
    fn lowercases_and_strips_punctuation() {
        let out = normalize("Hello, World! It's 100% FUN.", &keep_all()).unwrap();
        assert_eq!(out.tokens, vec!["hello", "world", "it", "s", "100", "fun"]);
        assert_eq!(out.text, "hello world it s 100 fun");
    }

    #[test]
    fn symbols_are_delimiters() {
        let out = normalize("price$42+tax=total", &keep_all()).unwrap();
        assert_eq!(out.tokens, vec!["price", "42", "tax", "total"]);
    }

    #[test]
    fn underscores_stay_inside_tokens() {
        let out = normalize("snake_case value", &keep_all()).unwrap();
        assert_eq!(out.tokens, vec!["snake_case", "value"]);
    }

    #[test]
    fn stopwords_and_short_tokens_removed_by_default() {
        let out = normalize("The cat is on the big mat of ours", &NormalizeConfig::default()).unwrap();
        // "cat", "mat" pass the length filter; "big" is a stopword.
        assert_eq!(out.tokens, vec!["cat", "mat", "ours"]);
    }

    #[test]
    fn entities_are_stripped() {
        let out = normalize("fish&amp;chips &#169; shop", &keep_all()).unwrap();
        assert_eq!(out.tokens, vec!["fish", "chips", "shop"]);
    }

    #[test]
    fn whitespace_only_is_empty_input() {
        assert_eq!(
            normalize(" \n\t ", &NormalizeConfig::default()),
            Err(NormalizeError::EmptyInput)
        );
    }

    #[test]
    fn only_stopwords_is_empty_input() {
        assert_eq!(
            normalize("the and of it", &NormalizeConfig::default()),
            Err(NormalizeError::EmptyInput)
        );
    }

    #[test]
    fn nfkc_makes_compatibility_forms_equal() {
        let cfg = keep_all();
        let composed = normalize("Caf\u{00E9} \u{FB01}ne", &cfg).unwrap();
        let decomposed = normalize("Cafe\u{0301} fine", &cfg).unwrap();
        assert_eq!(composed.text, decomposed.text);
        assert_eq!(composed.content_hash, decomposed.content_hash);
    }

    #[test]
    fn formatting_differences_hash_identically() {
        let cfg = NormalizeConfig::default();
        let a = normalize("Duplicate   content\n\nacross  PAGES", &cfg).unwrap();
        let b = normalize("duplicate content, across pages!", &cfg).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn hash_depends_on_version() {
        let v1 = NormalizeConfig::default();
        let v2 = NormalizeConfig {
            version: 2,
            ..Default::default()
        };
        let a = normalize("same text here", &v1).unwrap();
        let b = normalize("same text here", &v2).unwrap();
        assert_eq!(a.text, b.text);
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn markup_input_uses_visible_text() {
        let html = "<html><body><nav>menu links</nav><p>Shingles &amp; signatures</p>\
                    <script>tracking()</script></body></html>";
        let out = normalize_markup(html, &NormalizeConfig::default()).unwrap();
        assert_eq!(out.tokens, vec!["shingles", "signatures"]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = NormalizeConfig {
            version: 0,
            ..Default::default()
        };
        assert!(matches!(
            normalize("content", &cfg),
            Err(NormalizeError::InvalidConfig(_))
        ));
    }
}
