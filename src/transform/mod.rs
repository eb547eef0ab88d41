//! Content transformers.
//!
//! # Module Structure
//!
//! - `Transformer` - Core trait: configuration surface plus `transform`
//! - `Raw` - Markup spliced in as-is
//! - `Markdown` - Markdown to HTML (feature `markdown`)
//! - `Code` - Syntax-highlighted code block (feature `highlight`)
//! - `Notebook` - `.ipynb` documents (feature `notebook`)
//!
//! # Example
//!
//! ```ignore
//! use tola_view::transform::{Markdown, Transformer};
//!
//! let mut md = Markdown::default();
//! md.set_option("safe_mode", &true.into())?;
//! let fragment = md.transform("# Title")?;
//! ```

mod core;
mod markup;
mod raw;

#[cfg(feature = "highlight")]
mod code;
#[cfg(feature = "markdown")]
mod markdown;
#[cfg(feature = "notebook")]
mod notebook;

// Always available
pub use core::Transformer;
pub use markup::{decode_entities, parse_fragment};
pub use raw::Raw;

#[cfg(feature = "highlight")]
pub use code::{Code, DEFAULT_THEME};
#[cfg(feature = "markdown")]
pub use markdown::{Extension, Markdown, OutputFormat};
#[cfg(feature = "notebook")]
pub use notebook::{Notebook, SUPPORTED_VERSIONS};
