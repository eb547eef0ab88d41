//! Notebook transformer
//!
//! Renders an `.ipynb` document (format major version 4) to HTML:
//! markdown cells through the markdown converter, code cells through the
//! code highlighter followed by their outputs, raw cells verbatim.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::attr::Value;
use crate::error::{ViewError, ViewResult};
use crate::hash::StableHasher;
use crate::node::Fragment;
use crate::render::{escape_attr, escape_html};

use super::core::option_int;
use super::markup::parse_fragment;
use super::Transformer;

/// Notebook format major versions this transformer renders.
pub const SUPPORTED_VERSIONS: &[u32] = &[4];

/// Notebook document rendered to HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notebook {
    /// Expected notebook format major version
    pub version: u32,
}

impl Default for Notebook {
    fn default() -> Self {
        Self { version: 4 }
    }
}

// =============================================================================
// Document model
// =============================================================================

/// Only the header, so a version mismatch is reported before the body is
/// validated against the version-4 schema.
#[derive(Deserialize)]
struct Header {
    nbformat: u32,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    cells: Vec<Cell>,
}

#[derive(Deserialize, Default)]
struct Metadata {
    #[serde(default)]
    language_info: Option<LanguageInfo>,
    #[serde(default)]
    kernelspec: Option<KernelSpec>,
}

#[derive(Deserialize)]
struct LanguageInfo {
    name: String,
}

#[derive(Deserialize)]
struct KernelSpec {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
enum Cell {
    Markdown {
        source: MultiLine,
    },
    Code {
        source: MultiLine,
        #[serde(default)]
        execution_count: Option<u32>,
        #[serde(default)]
        outputs: Vec<Output>,
    },
    Raw {
        source: MultiLine,
    },
}

#[derive(Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum Output {
    Stream {
        name: String,
        text: MultiLine,
    },
    ExecuteResult {
        data: BTreeMap<String, serde_json::Value>,
        #[serde(default)]
        execution_count: Option<u32>,
    },
    DisplayData {
        data: BTreeMap<String, serde_json::Value>,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

/// Notebook text: a single string or a list of lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum MultiLine {
    One(String),
    Many(Vec<String>),
}

impl MultiLine {
    fn join(&self) -> String {
        match self {
            Self::One(s) => s.clone(),
            Self::Many(lines) => lines.concat(),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

impl Notebook {
    fn check_version(&self) -> ViewResult<()> {
        if SUPPORTED_VERSIONS.contains(&self.version) {
            Ok(())
        } else {
            Err(ViewError::FormatVersion {
                expected: SUPPORTED_VERSIONS[SUPPORTED_VERSIONS.len() - 1],
                found: self.version,
            })
        }
    }

    /// Convert a notebook document to an HTML string.
    pub fn to_html(&self, source: &str) -> ViewResult<String> {
        self.check_version()?;

        let header: Header = serde_json::from_str(source)?;
        if header.nbformat != self.version {
            return Err(ViewError::FormatVersion {
                expected: self.version,
                found: header.nbformat,
            });
        }

        let doc: Document = serde_json::from_str(source)?;
        let language = doc
            .metadata
            .language_info
            .map(|info| info.name)
            .or_else(|| doc.metadata.kernelspec.and_then(|k| k.language))
            .unwrap_or_else(|| "python".to_string());

        let mut html = String::from("<div class=\"notebook\">");
        for cell in &doc.cells {
            render_cell(cell, &language, &mut html);
        }
        html.push_str("</div>");

        debug!(cells = doc.cells.len(), %language, "rendered notebook");
        Ok(html)
    }
}

fn render_cell(cell: &Cell, language: &str, html: &mut String) {
    match cell {
        Cell::Markdown { source } => {
            html.push_str("<div class=\"cell markdown-cell\">");
            html.push_str(&markdown(&source.join()));
            html.push_str("</div>");
        }
        Cell::Code {
            source,
            execution_count,
            outputs,
        } => {
            html.push_str("<div class=\"cell code-cell\"><div class=\"input\">");
            html.push_str(&prompt("In", *execution_count));
            html.push_str(&code(&source.join(), language));
            html.push_str("</div>");
            if !outputs.is_empty() {
                html.push_str("<div class=\"outputs\">");
                for output in outputs {
                    render_output(output, html);
                }
                html.push_str("</div>");
            }
            html.push_str("</div>");
        }
        Cell::Raw { source } => {
            html.push_str("<div class=\"cell raw-cell\">");
            html.push_str(&source.join());
            html.push_str("</div>");
        }
    }
}

fn render_output(output: &Output, html: &mut String) {
    match output {
        Output::Stream { name, text } => {
            html.push_str(&format!(
                "<pre class=\"output-stream output-{}\">{}</pre>",
                escape_attr(name),
                escape_html(&text.join())
            ));
        }
        Output::ExecuteResult { data, execution_count } => {
            html.push_str("<div class=\"output\">");
            html.push_str(&prompt("Out", *execution_count));
            render_data(data, html);
            html.push_str("</div>");
        }
        Output::DisplayData { data } => {
            html.push_str("<div class=\"output\">");
            render_data(data, html);
            html.push_str("</div>");
        }
        Output::Error {
            ename,
            evalue,
            traceback,
        } => {
            let trace = traceback.iter().map(|line| strip_ansi(line)).collect::<Vec<_>>().join("\n");
            html.push_str(&format!(
                "<pre class=\"output-error\">{}: {}\n{}</pre>",
                escape_html(ename),
                escape_html(evalue),
                escape_html(&trace)
            ));
        }
    }
}

/// Richest representation first.
fn render_data(data: &BTreeMap<String, serde_json::Value>, html: &mut String) {
    let text = |mime: &str| data.get(mime).and_then(mime_text);

    if let Some(markup) = text("text/html") {
        html.push_str(&markup);
    } else if let Some(svg) = text("image/svg+xml") {
        html.push_str(&svg);
    } else if let Some((mime, image)) = ["image/png", "image/jpeg"]
        .into_iter()
        .find_map(|mime| text(mime).map(|d| (mime, d)))
    {
        let payload: String = image.split_whitespace().collect();
        html.push_str(&format!("<img src=\"data:{mime};base64,{}\">", escape_attr(&payload)));
    } else if let Some(plain) = text("text/plain") {
        html.push_str(&format!("<pre>{}</pre>", escape_html(&plain)));
    }
}

/// Text payload of a mime bundle entry: a string or a list of lines.
fn mime_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(lines) => lines.iter().map(|l| l.as_str()).collect::<Option<Vec<_>>>().map(|l| l.concat()),
        _ => None,
    }
}

fn prompt(kind: &str, count: Option<u32>) -> String {
    let count = count.map(|c| c.to_string()).unwrap_or_else(|| " ".to_string());
    format!("<div class=\"prompt\">{kind} [{count}]:</div>")
}

#[cfg(feature = "markdown")]
fn markdown(source: &str) -> String {
    super::Markdown::default().to_html(source)
}

#[cfg(not(feature = "markdown"))]
fn markdown(source: &str) -> String {
    format!("<pre>{}</pre>", escape_html(source))
}

#[cfg(feature = "highlight")]
fn code(source: &str, language: &str) -> String {
    super::code::render_block(source, Some(language), "", super::code::DEFAULT_CSS_CLASS)
}

#[cfg(not(feature = "highlight"))]
fn code(source: &str, _language: &str) -> String {
    format!("<div class=\"highlight\"><pre>{}</pre></div>", escape_html(source))
}

/// Remove ANSI colour sequences (`ESC [ ... m`) from traceback lines.
fn strip_ansi(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl Transformer for Notebook {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn set_option(&mut self, key: &str, value: &Value) -> ViewResult<bool> {
        match key {
            "version" => {
                let version = option_int(self.name(), key, value)?;
                self.version = u32::try_from(version)
                    .map_err(|_| ViewError::invalid_option(self.name(), key, "out of range"))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn transform(&self, source: &str) -> ViewResult<Fragment> {
        if source.trim().is_empty() {
            self.check_version()?;
            return Ok(Fragment::empty());
        }
        parse_fragment(&self.to_html(source)?)
    }

    fn fingerprint(&self, hasher: StableHasher) -> StableHasher {
        hasher.update_u64(self.version.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTEBOOK: &str = r##"{
        "nbformat": 4,
        "nbformat_minor": 2,
        "metadata": {"language_info": {"name": "python"}},
        "cells": [
            {"cell_type": "markdown", "metadata": {}, "source": ["# Cell magics\n", "Some *text*"]},
            {"cell_type": "code", "metadata": {}, "execution_count": 1,
             "source": "%%bash\necho hi",
             "outputs": [
                {"output_type": "stream", "name": "stdout", "text": ["hi\n"]},
                {"output_type": "execute_result", "execution_count": 1, "metadata": {},
                 "data": {"text/plain": ["42"]}},
                {"output_type": "display_data", "metadata": {},
                 "data": {"image/png": "iVBORw0KGgo=\n", "text/plain": "<Figure>"}},
                {"output_type": "error", "ename": "ValueError", "evalue": "bad",
                 "traceback": ["\u001b[0;31mValueError\u001b[0m: bad"]}
             ]},
            {"cell_type": "raw", "metadata": {}, "source": "<p class=\"raw\">raw</p>"}
        ]
    }"##;

    #[test]
    fn test_renders_cells() {
        let frag = Notebook::default().transform(NOTEBOOK).unwrap();
        let root = &frag.nodes[0];
        assert_eq!(root.attrs[0].1, "notebook");
        assert_eq!(root.children.len(), 3);

        let html = Notebook::default().to_html(NOTEBOOK).unwrap();
        assert!(html.contains("<h1>Cell magics</h1>"));
        assert!(html.contains("output-stdout"));
        assert!(html.contains("In [1]:"));
        assert!(html.contains("Out [1]:"));
        assert!(html.contains("data:image/png;base64,iVBORw0KGgo="));
        assert!(html.contains("ValueError: bad"));
        assert!(!html.contains('\u{1b}'));
        assert!(html.contains("<p class=\"raw\">raw</p>"));
    }

    #[test]
    fn test_unsupported_version() {
        let mut nb = Notebook::default();
        nb.set_option("version", &3.into()).unwrap();
        let err = nb.transform(NOTEBOOK).unwrap_err();
        assert!(matches!(err, ViewError::FormatVersion { expected: 4, found: 3 }));

        // Not silently empty either.
        assert!(matches!(nb.transform(""), Err(ViewError::FormatVersion { .. })));
    }

    #[test]
    fn test_source_version_mismatch() {
        let old = r#"{"nbformat": 3, "nbformat_minor": 0, "worksheets": []}"#;
        let err = Notebook::default().transform(old).unwrap_err();
        assert!(matches!(err, ViewError::FormatVersion { expected: 4, found: 3 }));
    }

    #[test]
    fn test_invalid_json() {
        let err = Notebook::default().transform("{not json").unwrap_err();
        assert!(matches!(err, ViewError::Notebook(_)));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[0;31mError\u{1b}[0m!"), "Error!");
    }

    #[test]
    fn test_version_option() {
        let mut nb = Notebook::default();
        assert!(nb.set_option("version", &Value::from(-1)).is_err());
        assert!(nb.set_option("version", &"4".into()).is_err());
        assert!(!nb.set_option("class", &"x".into()).unwrap());
    }
}
