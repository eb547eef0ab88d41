//! Markdown transformer
//!
//! Conversion is done by `pulldown-cmark`. Extensions are named the way
//! the declarative layer names them (`tables`, `markdown.extensions.tables`,
//! ...) and mapped onto parser options; `codehilite` routes fenced code
//! through the code highlighter when the `highlight` feature is enabled.

use compact_str::CompactString;
use pulldown_cmark::{html, CowStr, Event, Options, Parser};
use tracing::{debug, warn};

use crate::attr::Value;
use crate::error::{ViewError, ViewResult};
use crate::hash::StableHasher;
use crate::node::Fragment;

use super::core::{option_bool, option_int, option_list, option_text};
use super::markup::parse_fragment;
use super::Transformer;

const EXTENSION_PREFIX: &str = "markdown.extensions.";

/// Markdown extension names understood by [`Markdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Tables,
    /// Fenced code blocks are part of CommonMark and always recognized.
    FencedCode,
    CodeHilite,
    Footnotes,
    Strikethrough,
    TaskLists,
    Smarty,
    AttrList,
}

impl Extension {
    /// Parse a bare or `markdown.extensions.`-prefixed name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix(EXTENSION_PREFIX).unwrap_or(name);
        Some(match name {
            "tables" => Self::Tables,
            "fenced_code" => Self::FencedCode,
            "codehilite" => Self::CodeHilite,
            "footnotes" => Self::Footnotes,
            "strikethrough" | "del" => Self::Strikethrough,
            "tasklists" => Self::TaskLists,
            "smarty" => Self::Smarty,
            "attr_list" => Self::AttrList,
            _ => return None,
        })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tables => "tables",
            Self::FencedCode => "fenced_code",
            Self::CodeHilite => "codehilite",
            Self::Footnotes => "footnotes",
            Self::Strikethrough => "strikethrough",
            Self::TaskLists => "tasklists",
            Self::Smarty => "smarty",
            Self::AttrList => "attr_list",
        }
    }

    fn options(&self) -> Options {
        match self {
            Self::Tables => Options::ENABLE_TABLES,
            Self::Footnotes => Options::ENABLE_FOOTNOTES,
            Self::Strikethrough => Options::ENABLE_STRIKETHROUGH,
            Self::TaskLists => Options::ENABLE_TASKLISTS,
            Self::Smarty => Options::ENABLE_SMART_PUNCTUATION,
            Self::AttrList => Options::ENABLE_HEADING_ATTRIBUTES,
            Self::FencedCode | Self::CodeHilite => Options::empty(),
        }
    }
}

/// Output flavour requested by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Html5,
    Xhtml,
}

impl OutputFormat {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "html5" | "html" | "" => Some(Self::Html5),
            "xhtml" | "xhtml1" => Some(Self::Xhtml),
            _ => None,
        }
    }
}

/// Markdown converted to HTML.
#[derive(Debug, Clone)]
pub struct Markdown {
    pub extensions: Vec<Extension>,
    /// Flat extension configuration, `"<extension>.<key>"` to value
    pub extensions_config: Vec<(CompactString, CompactString)>,
    /// Escape raw HTML instead of passing it through
    pub safe_mode: bool,
    /// Accepted and validated only; markup style comes from the target's
    /// [`RenderConfig`](crate::render::RenderConfig).
    pub output_format: OutputFormat,
    pub tab_length: usize,
}

impl Default for Markdown {
    fn default() -> Self {
        Self {
            extensions: vec![Extension::CodeHilite, Extension::FencedCode, Extension::Tables],
            extensions_config: vec![("codehilite.css_class".into(), "highlight".into())],
            safe_mode: false,
            output_format: OutputFormat::Html5,
            tab_length: 4,
        }
    }
}

impl Markdown {
    fn has(&self, ext: Extension) -> bool {
        self.extensions.contains(&ext)
    }

    /// Extension configuration entry.
    pub fn config(&self, key: &str) -> Option<&str> {
        self.extensions_config
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn parser_options(&self) -> Options {
        self.extensions
            .iter()
            .fold(Options::empty(), |opts, ext| opts | ext.options())
    }

    /// Convert to an HTML string.
    pub fn to_html(&self, source: &str) -> String {
        let source = expand_tabs(source, self.tab_length);
        let parser = Parser::new_ext(&source, self.parser_options());

        let safe = self.safe_mode;
        let events = parser.map(move |event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) if safe => Event::Text(raw),
            other => other,
        });

        let mut output = String::with_capacity(source.len() * 3 / 2);
        if self.has(Extension::CodeHilite) {
            html::push_html(&mut output, self.highlight_fences(events));
        } else {
            html::push_html(&mut output, events);
        }
        output
    }

    #[cfg(feature = "highlight")]
    fn highlight_fences<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> impl Iterator<Item = Event<'a>> {
        use pulldown_cmark::{CodeBlockKind, Tag, TagEnd};

        let css_class = self.config("codehilite.css_class").unwrap_or("highlight").to_string();
        let style = self.config("codehilite.pygments_style").unwrap_or("").to_string();

        let mut fence: Option<(String, String)> = None;
        events.filter_map(move |event| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                fence = Some((lang.to_string(), String::new()));
                None
            }
            Event::Text(text) if fence.is_some() => {
                if let Some((_, code)) = fence.as_mut() {
                    code.push_str(&text);
                }
                None
            }
            Event::End(TagEnd::CodeBlock) if fence.is_some() => {
                let (lang, code) = fence.take()?;
                let lang = lang.split_whitespace().next();
                let block = super::code::render_block(&code, lang, &style, &css_class);
                Some(Event::Html(CowStr::from(block)))
            }
            other => Some(other),
        })
    }

    #[cfg(not(feature = "highlight"))]
    fn highlight_fences<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> impl Iterator<Item = Event<'a>> {
        events
    }
}

impl Transformer for Markdown {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn set_option(&mut self, key: &str, value: &Value) -> ViewResult<bool> {
        let name = self.name();
        match key {
            "extensions" => {
                self.extensions = option_list(name, key, value)?
                    .iter()
                    .filter_map(|ext| {
                        let parsed = Extension::from_name(ext);
                        if parsed.is_none() {
                            warn!(extension = %ext, "ignoring unknown markdown extension");
                        }
                        parsed
                    })
                    .collect();
            }
            "extensions_config" => {
                let entries = match value {
                    Value::Unset => &[][..],
                    Value::Map(entries) => entries.as_slice(),
                    other => {
                        return Err(ViewError::invalid_option(
                            name,
                            key,
                            format!("expected map, found {}", other.shape()),
                        ));
                    }
                };
                self.extensions_config = entries.to_vec();
            }
            "safe_mode" => self.safe_mode = option_bool(name, key, value)?,
            "output_format" => {
                let text = option_text(name, key, value)?;
                self.output_format = OutputFormat::parse(&text)
                    .ok_or_else(|| ViewError::invalid_option(name, key, format!("unknown format `{text}`")))?;
            }
            "tab_length" => {
                let n = option_int(name, key, value)?;
                self.tab_length = usize::try_from(n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ViewError::invalid_option(name, key, "must be positive"))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn transform(&self, source: &str) -> ViewResult<Fragment> {
        let html = self.to_html(source);
        debug!(bytes = html.len(), "converted markdown");
        parse_fragment(&html)
    }

    fn fingerprint(&self, hasher: StableHasher) -> StableHasher {
        let hasher = self
            .extensions
            .iter()
            .fold(hasher.update_usize(self.extensions.len()), |h, ext| h.update_str(ext.name()));
        self.extensions_config
            .iter()
            .fold(hasher.update_usize(self.extensions_config.len()), |h, (k, v)| {
                h.update_str(k).update_str(v)
            })
            .update_bool(self.safe_mode)
            .update_usize(self.tab_length)
    }
}

/// Expand tabs to the next multiple of `width`, line by line.
fn expand_tabs(source: &str, width: usize) -> String {
    if !source.contains('\t') {
        return source.to_string();
    }
    let mut out = String::with_capacity(source.len() + 16);
    let mut column = 0;
    for c in source.chars() {
        match c {
            '\t' => {
                let pad = width - column % width;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\n' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heading_and_list() {
        let frag = Markdown::default().transform("# Title\n\n* one\n* two\n").unwrap();
        let tags: Vec<_> = frag.nodes.iter().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["h1", "ul"]);
        assert_eq!(frag.nodes[1].children.len(), 2);
    }

    #[test]
    fn test_safe_mode_escapes_html() {
        let mut md = Markdown::default();
        assert!(md.to_html("<b>x</b>\n").contains("<b>x</b>"));
        md.set_option("safe_mode", &true.into()).unwrap();
        let html = md.to_html("<b>x</b>\n");
        assert!(html.contains("&lt;b&gt;"), "{html}");
    }

    #[test]
    fn test_extension_names() {
        let mut md = Markdown::default();
        md.set_option(
            "extensions",
            &Value::from(vec!["markdown.extensions.tables", "footnotes", "nope"]),
        )
        .unwrap();
        assert_eq!(md.extensions, vec![Extension::Tables, Extension::Footnotes]);
        assert!(md.parser_options().contains(Options::ENABLE_TABLES));
    }

    #[test]
    fn test_tables_need_extension() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert!(Markdown::default().to_html(table).contains("<table>"));

        let mut md = Markdown::default();
        md.set_option("extensions", &Value::List(vec![])).unwrap();
        assert!(!md.to_html(table).contains("<table>"));
    }

    #[cfg(feature = "highlight")]
    #[test]
    fn test_codehilite_wraps_fences() {
        let frag = Markdown::default().transform("```rust\nfn main() {}\n```\n").unwrap();
        let div = &frag.nodes[0];
        assert_eq!(div.tag, "div");
        assert_eq!(div.attrs[0].1, "highlight");
        assert_eq!(div.children[0].tag, "pre");
    }

    #[test]
    fn test_options_validation() {
        let mut md = Markdown::default();
        assert!(md.set_option("tab_length", &0.into()).is_err());
        assert!(md.set_option("output_format", &"pdf".into()).is_err());
        assert!(md.set_option("output_format", &"xhtml".into()).unwrap());
        assert_eq!(md.output_format, OutputFormat::Xhtml);
        assert!(!md.set_option("class", &"x".into()).unwrap());
        md.set_option("extensions_config", &Value::from([("codehilite.css_class", "code")]))
            .unwrap();
        assert_eq!(md.config("codehilite.css_class"), Some("code"));
    }

    #[test]
    fn test_expand_tabs() {
        assert_eq!(expand_tabs("a\tb\n\tc", 4), "a   b\n    c");
        assert_eq!(expand_tabs("no tabs", 4), "no tabs");
    }

    #[test]
    fn test_fingerprint_tracks_config() {
        let a = Markdown::default();
        let mut b = Markdown::default();
        assert_eq!(
            a.fingerprint(StableHasher::new()).finish(),
            b.fingerprint(StableHasher::new()).finish()
        );
        b.tab_length = 8;
        assert_ne!(
            a.fingerprint(StableHasher::new()).finish(),
            b.fingerprint(StableHasher::new()).finish()
        );
    }

    #[test]
    fn test_output_format_leaves_output_alone() {
        let a = Markdown::default();
        let mut b = Markdown::default();
        b.set_option("output_format", &"xhtml".into()).unwrap();
        assert_eq!(
            a.fingerprint(StableHasher::new()).finish(),
            b.fingerprint(StableHasher::new()).finish()
        );
        let source = "line one  \nline two\n\n---\n";
        assert_eq!(a.transform(source).unwrap(), b.transform(source).unwrap());
    }
}
