//! Prelude module for common imports.
//!
//! ```ignore
//! use tola_view::prelude::*;
//! ```

// Tag constructors
pub use crate::html;

// Node types
pub use crate::node::{Binding, Content, Element, Fragment, LoopItem, LoopKey, Looper, Node};

// Attributes
pub use crate::attr::{Attr, Attrs, AttrsExt, Value};
pub use crate::codec::AttrKind;

// Identity
pub use crate::id::{DomId, NodeId};

// View
pub use crate::view::{Change, SharedView, UpdateStats, View};

// Targets
pub use crate::target::{Dom, RenderTarget};

// Transformers
pub use crate::transform::{Raw, Transformer};

#[cfg(feature = "highlight")]
pub use crate::transform::Code;
#[cfg(feature = "markdown")]
pub use crate::transform::Markdown;
#[cfg(feature = "notebook")]
pub use crate::transform::Notebook;

// Render
pub use crate::render::RenderConfig;

// Error
pub use crate::error::{ViewError, ViewResult};
