//! Raw markup transformer

use crate::error::ViewResult;
use crate::node::Fragment;

use super::markup::parse_fragment;
use super::Transformer;

/// Splices its source in as parsed markup.
///
/// An empty source yields an empty fragment, so the container stays in
/// place as the anchor for later replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Transformer for Raw {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn transform(&self, source: &str) -> ViewResult<Fragment> {
        if source.trim().is_empty() {
            return Ok(Fragment::empty());
        }
        parse_fragment(source)
    }
}
