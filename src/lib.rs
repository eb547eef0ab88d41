//! tola-view - Live server-side HTML views with incremental updates
//!
//! ## Core Concepts
//!
//! **Declarative tree, mutable document**: pages are declared once as a
//! tree of elements, loopers and content blocks, then mounted onto a
//! [`RenderTarget`]. Later changes are translated into the smallest set of
//! target mutations instead of a re-render.
//!
//! **Typed attributes**: every attribute has a declared kind (string,
//! boolean presence, boolean literal, token list, style mapping) that fixes
//! how a value is written to markup.
//!
//! ## Modules
//! - `node`: Element, Looper, Content declarations
//! - `html`: One constructor per standard HTML tag
//! - `attr` / `codec`: Attribute values and their encoding
//! - `view`: Mounted views and the update engine
//! - `target`: Render-target trait, the bundled `Dom`, path queries
//! - `transform`: Content transformers (raw, markdown, code, notebook)
//! - `algo`: Keyed list reconciliation
//!
//! ## Usage
//!
//! ```ignore
//! use tola_view::prelude::*;
//!
//! let mut view = View::builder(html::html().child(
//!     html::body().children([
//!         Node::from(html::h1().text("Todo")),
//!         html::ul()
//!             .child(Looper::each(["milk", "eggs"], |item| {
//!                 html::li().text(item.value.to_text().unwrap_or_default())
//!             }).bind("items"))
//!             .into(),
//!     ]),
//! ))
//! .var("items", ["milk", "eggs"])
//! .build()?;
//!
//! view.set_var("items", ["milk", "eggs", "bread"])?;
//! let page = view.render()?;
//! ```

extern crate self as tola_view;

#[macro_use]
mod macros;

mod arena;

// =============================================================================
// Core modules
// =============================================================================

/// Attribute values and typed attributes
pub mod attr;

/// Attribute encoding by declared kind
pub mod codec;

/// Error types
pub mod error;

/// Stable fingerprints
pub mod hash;

/// Tag constructors
pub mod html;

/// Node identity
pub mod id;

/// Declarations: Element, Looper, Content
pub mod node;

/// Markup serialization
pub mod render;

/// Render targets and path queries
pub mod target;

/// Content transformers
pub mod transform;

/// Algorithms: keyed reconcile
pub mod algo;

/// Mounted views and the update engine
pub mod view;

/// Prelude for common imports
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

// Node types
pub use node::{Binding, Children, Content, Element, Fragment, FragmentNode, LoopItem, LoopKey, Looper, Node};

// Attributes
pub use attr::{Attr, Attrs, Value};
pub use codec::AttrKind;

// Identity
pub use id::{DomId, NodeId};

// View
pub use view::{render_all, Change, SharedView, UpdateStats, View, ViewBuilder};

// Targets
pub use target::{verify, Dom, RenderTarget, Unbound};

// Transformers
pub use transform::Transformer;

// Render
pub use render::RenderConfig;

// Error types
pub use error::{ViewError, ViewResult};

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(View: Send);
    assert_impl_all!(SharedView: Send, Sync, Clone);
    assert_impl_all!(Node: Send, Sync);
    assert_impl_all!(ViewError: std::error::Error, Send, Sync);

    #[test]
    fn test_todo_page() {
        let mut view = View::builder(html::html().child(html::body().children([
            Node::from(html::h1().text("Todo")),
            html::ul()
                .child(
                    Looper::each(Value::Unset, |item| {
                        html::li()
                            .attr("class", if item.index == 0 { "first" } else { "item" })
                            .text(item.value.to_text().unwrap_or_default())
                    })
                    .keyed_by_value()
                    .bind("items"),
                )
                .into(),
        ])))
        .var("items", ["milk", "eggs"])
        .build()
        .unwrap();

        assert_eq!(
            view.render().unwrap(),
            concat!(
                "<html><body><h1>Todo</h1><ul>",
                r#"<li class="first">milk</li><li class="item">eggs</li>"#,
                "</ul></body></html>"
            )
        );

        let stats = view.set_var("items", ["bread", "milk"]).unwrap();
        assert_eq!(stats.reconcile.added, 1);
        assert_eq!(stats.reconcile.removed, 1);
        assert_eq!(view.xpath("//li").unwrap().len(), 2);
        assert!(
            view.render()
                .unwrap()
                .contains(r#"<ul><li class="first">bread</li><li class="item">milk</li></ul>"#)
        );
    }

    #[test]
    fn test_page_through_shared_view() {
        let shared = SharedView::new(
            View::builder(html::html().child(html::body().child(Content::raw("<p>hi</p>"))))
                .build()
                .unwrap(),
        );
        let out = shared.render_with([("lang", "en")]).unwrap();
        assert_eq!(out, r#"<html lang="en"><body><div><p>hi</p></div></body></html>"#);
    }
}
