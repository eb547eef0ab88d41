//! Highlighted code transformer
//!
//! Highlighting is done by `syntect` with inline styles. Source whose
//! language cannot be determined falls back to an unstyled block instead
//! of failing.

use std::sync::LazyLock;

use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use tracing::warn;

use crate::attr::Value;
use crate::error::ViewResult;
use crate::hash::StableHasher;
use crate::node::Fragment;
use crate::render::{escape_attr, escape_html};

use super::core::option_text;
use super::markup::parse_fragment;
use super::Transformer;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(|| SyntaxSet::load_defaults_newlines());
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(|| ThemeSet::load_defaults());

/// Theme used when none is configured or the configured one is unknown.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Class of the wrapping `<div>`.
pub const DEFAULT_CSS_CLASS: &str = "highlight";

/// Syntax-highlighted code block.
#[derive(Debug, Clone, Default)]
pub struct Code {
    /// Language token; empty means detect from the first line
    pub language: String,
    /// Theme name; empty means [`DEFAULT_THEME`]
    pub highlight_style: String,
}

impl Code {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            highlight_style: String::new(),
        }
    }
}

impl Transformer for Code {
    fn name(&self) -> &'static str {
        "code"
    }

    fn set_option(&mut self, key: &str, value: &Value) -> ViewResult<bool> {
        match key {
            "language" => self.language = option_text(self.name(), key, value)?,
            "highlight_style" => self.highlight_style = option_text(self.name(), key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn transform(&self, source: &str) -> ViewResult<Fragment> {
        let language = (!self.language.is_empty()).then_some(self.language.as_str());
        let html = render_block(source, language, &self.highlight_style, DEFAULT_CSS_CLASS);
        parse_fragment(&html)
    }

    fn fingerprint(&self, hasher: StableHasher) -> StableHasher {
        hasher.update_str(&self.language).update_str(&self.highlight_style)
    }
}

/// Render `source` as `<div class="{css_class}"><pre>…</pre></div>`.
pub(crate) fn render_block(source: &str, language: Option<&str>, style: &str, css_class: &str) -> String {
    let pre = find_syntax(source, language)
        .zip(theme(style))
        .and_then(|(syntax, theme)| {
            highlighted_html_for_string(source, &SYNTAX_SET, syntax, theme)
                .inspect_err(|err| warn!(%err, "highlighting failed, emitting plain block"))
                .ok()
        })
        .unwrap_or_else(|| plain_block(source));

    format!("<div class=\"{}\">{pre}</div>", escape_attr(css_class))
}

fn find_syntax(source: &str, language: Option<&str>) -> Option<&'static SyntaxReference> {
    match language {
        Some(token) => {
            let found = SYNTAX_SET.find_syntax_by_token(token);
            if found.is_none() {
                warn!(language = token, "unknown language, emitting plain block");
            }
            found
        }
        None => source
            .lines()
            .next()
            .and_then(|line| SYNTAX_SET.find_syntax_by_first_line(line)),
    }
}

fn theme(name: &str) -> Option<&'static Theme> {
    let name = if name.is_empty() { DEFAULT_THEME } else { name };
    THEME_SET.themes.get(name).or_else(|| {
        warn!(theme = name, fallback = DEFAULT_THEME, "unknown highlight style");
        THEME_SET.themes.get(DEFAULT_THEME)
    })
}

fn plain_block(source: &str) -> String {
    format!("<pre>{}</pre>", escape_html(source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_language() {
        let code = Code::new("python");
        let frag = code.transform("def f():\n    return 1\n").unwrap();
        let div = &frag.nodes[0];
        assert_eq!(div.tag, "div");
        assert_eq!(div.attrs[0], ("class".to_string(), "highlight".to_string()));
        assert_eq!(div.children[0].tag, "pre");
        // Highlighted output carries inline styles.
        assert!(!div.children[0].children.is_empty());
    }

    #[test]
    fn test_unrecognized_falls_back_to_plain_block() {
        let frag = Code::default().transform("just words <here>").unwrap();
        let pre = &frag.nodes[0].children[0];
        assert_eq!(pre.tag, "pre");
        assert_eq!(pre.text.as_deref(), Some("just words <here>"));
        assert!(pre.children.is_empty());

        let frag = Code::new("no-such-language").transform("x").unwrap();
        assert_eq!(frag.nodes[0].children[0].tag, "pre");
    }

    #[test]
    fn test_first_line_detection() {
        let frag = Code::default().transform("#!/bin/bash\necho hi\n").unwrap();
        assert!(!frag.nodes[0].children[0].children.is_empty());
    }

    #[test]
    fn test_options() {
        let mut code = Code::default();
        assert!(code.set_option("language", &"rust".into()).unwrap());
        assert!(code.set_option("highlight_style", &"base16-ocean.dark".into()).unwrap());
        assert!(!code.set_option("id", &"x".into()).unwrap());
        assert!(code.set_option("language", &true.into()).is_err());

        let a = code.fingerprint(StableHasher::new()).finish();
        code.highlight_style.clear();
        assert_ne!(a, code.fingerprint(StableHasher::new()).finish());
    }

    #[test]
    fn test_unknown_theme_still_renders() {
        let mut code = Code::new("rust");
        code.highlight_style = "nope".into();
        assert!(code.transform("fn main() {}").is_ok());
    }
}
