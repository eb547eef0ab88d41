//! Markup parsing into fragments
//!
//! `tl` does the tokenizing; this module maps its node list onto the
//! text/tail model of [`Fragment`], decoding character references and
//! dropping comments.

use std::borrow::Cow;

use tracing::trace;

use crate::error::{ViewError, ViewResult};
use crate::node::{Fragment, FragmentNode};

/// Parse an HTML snippet into a fragment.
pub fn parse_fragment(source: &str) -> ViewResult<Fragment> {
    let dom = tl::parse(source, tl::ParserOptions::default())
        .map_err(|err| ViewError::Markup(format!("{err:?}")))?;
    let parser = dom.parser();

    let mut fragment = Fragment::empty();
    for handle in dom.children() {
        match handle.get(parser) {
            Some(tl::Node::Raw(raw)) => fragment.push_text(&decode_entities(&raw.as_utf8_str())),
            Some(tl::Node::Tag(tag)) => fragment.push(convert_tag(tag, parser)),
            Some(tl::Node::Comment(_)) | None => {}
        }
    }

    trace!(elements = fragment.element_count(), "parsed markup fragment");
    Ok(fragment)
}

fn convert_tag(tag: &tl::HTMLTag<'_>, parser: &tl::Parser<'_>) -> FragmentNode {
    let mut node = FragmentNode::new(tag.name().as_utf8_str().to_ascii_lowercase());

    for (name, value) in tag.attributes().iter() {
        let value = value.map(|v| decode_entities(&v).into_owned()).unwrap_or_default();
        node = node.attr(name.to_ascii_lowercase(), value);
    }

    let raw_text = matches!(node.tag.as_str(), "script" | "style");
    for handle in tag.children().top().iter() {
        match handle.get(parser) {
            Some(tl::Node::Raw(raw)) => {
                let text = raw.as_utf8_str();
                if raw_text {
                    node.push_text(&text);
                } else {
                    node.push_text(&decode_entities(&text));
                }
            }
            Some(tl::Node::Tag(child)) => node.children.push(convert_tag(child, parser)),
            Some(tl::Node::Comment(_)) | None => {}
        }
    }
    node
}

/// Decode named and numeric character references.
///
/// Unknown references are kept verbatim.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';').and_then(|end| decode_one(&tail[1..end]).map(|c| (c, end))) {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_one(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        _ => return None,
    })
}
