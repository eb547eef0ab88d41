//! Accessor and constructor generation macros
//!
//! These macros eliminate repetitive match code on node enums and the long
//! list of tag constructor functions. `paste` does the identifier
//! concatenation.

/// Generate is_xxx, as_xxx, as_xxx_mut for enums with typed variants
///
/// Uses paste's `:camel` modifier to convert method name to variant name.
/// # Generated methods per variant:
/// - `is_xxx(&self) -> bool`
/// - `as_xxx(&self) -> Option<&Type>`
/// - `as_xxx_mut(&mut self) -> Option<&mut Type>`
///
/// # Example
/// ```ignore
/// impl Node {
///     // element -> Element, looper -> Looper, content -> Content
///     impl_enum_accessors!(element, looper, content);
/// }
/// ```
#[macro_export]
macro_rules! impl_enum_accessors {
    ($($variant:ident),* $(,)?) => {
        ::paste::paste! {
            $(
                #[doc = "Check if this is a " [<$variant:camel>] " node"]
                pub fn [<is_ $variant>](&self) -> bool {
                    matches!(self, Self::[<$variant:camel>](_))
                }

                #[doc = "Try to get as " $variant " reference"]
                pub fn [<as_ $variant>](&self) -> Option<&[<$variant:camel>]> {
                    match self { Self::[<$variant:camel>](v) => Some(v), _ => None }
                }

                #[doc = "Try to get as mutable " $variant " reference"]
                pub fn [<as_ $variant _mut>](&mut self) -> Option<&mut [<$variant:camel>]> {
                    match self { Self::[<$variant:camel>](v) => Some(v), _ => None }
                }
            )*
        }
    };
}

/// Generate one constructor function per tag name
///
/// # Example
/// ```ignore
/// define_tags!(div, span);
/// // Expands to: pub fn div() -> Element { Element::new("div") } ...
/// ```
#[macro_export]
macro_rules! define_tags {
    ($($tag:ident),* $(,)?) => {
        ::paste::paste! {
            $(
                #[doc = "Create a `<" $tag ">` element"]
                #[inline]
                pub fn $tag() -> $crate::node::Element {
                    $crate::node::Element::new(stringify!($tag))
                }
            )*

            /// Every tag with a constructor in this module.
            pub const TAGS: &[&str] = &[$(stringify!($tag)),*];
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::node::{Content, Element, Looper, Node};

    #[test]
    fn test_node_accessors() {
        let mut node: Node = Element::new("div").into();
        assert!(node.is_element());
        assert!(!node.is_looper());
        assert_eq!(node.as_element().map(|e| e.tag.as_str()), Some("div"));
        if let Some(e) = node.as_element_mut() {
            e.tag = "span".into();
        }
        assert_eq!(node.as_element().map(|e| e.tag.as_str()), Some("span"));

        let node: Node = Looper::each(0..0i64, |_| Element::new("li")).into();
        assert!(node.as_looper().is_some());
        assert!(node.as_content().is_none());

        let node: Node = Content::raw("").into();
        assert!(node.is_content());
    }

    #[test]
    fn test_defined_tags() {
        assert!(crate::html::TAGS.contains(&"div"));
        assert_eq!(crate::html::blockquote().tag, "blockquote");
    }
}
