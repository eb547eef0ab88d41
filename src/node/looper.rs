//! Looper - dynamic children generated from an iterable
//!
//! A looper owns no markup of its own. Its rendered children are spliced
//! into the parent element's children at the looper's position, one
//! template instantiation per item.

use std::fmt;
use std::sync::Arc;

use compact_str::{CompactString, ToCompactString};

use crate::attr::Value;
use crate::error::{ViewError, ViewResult};

use super::Node;

/// One item of a looper's iterable, as seen by the template.
#[derive(Debug, Clone, Copy)]
pub struct LoopItem<'a> {
    /// Position in the iterable
    pub index: usize,
    /// The item itself
    pub value: &'a Value,
}

/// Identity of a looper item across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoopKey {
    /// Positional key (the default)
    Index(usize),
    Int(i64),
    Text(CompactString),
}

impl LoopKey {
    /// Key derived from a scalar item value.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Text(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Text(b.to_compact_string())),
            _ => None,
        }
    }
}

impl fmt::Display for LoopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Child template: produces the declaration of one item's subtree.
pub type Template = Arc<dyn Fn(&LoopItem<'_>) -> Vec<Node> + Send + Sync>;

type KeyFn = Arc<dyn Fn(&LoopItem<'_>) -> LoopKey + Send + Sync>;

/// Dynamic-children generator bound to an iterable and a child template.
#[derive(Clone)]
pub struct Looper {
    /// Current source sequence
    pub iterable: Value,
    pub(crate) template: Template,
    key: Option<KeyFn>,
    /// Lookup name
    pub name: Option<CompactString>,
    /// View variable the iterable follows
    pub binding: Option<CompactString>,
}

impl Looper {
    /// Create a looper whose template yields any number of nodes per item.
    pub fn new<F>(iterable: impl Into<Value>, template: F) -> Self
    where
        F: Fn(&LoopItem<'_>) -> Vec<Node> + Send + Sync + 'static,
    {
        Self {
            iterable: iterable.into(),
            template: Arc::new(template),
            key: None,
            name: None,
            binding: None,
        }
    }

    /// Create a looper whose template yields exactly one node per item.
    pub fn each<F, N>(iterable: impl Into<Value>, template: F) -> Self
    where
        F: Fn(&LoopItem<'_>) -> N + Send + Sync + 'static,
        N: Into<Node>,
    {
        Self::new(iterable, move |item| vec![template(item).into()])
    }

    /// Derive item keys with `key` instead of position.
    pub fn keyed<F>(mut self, key: F) -> Self
    where
        F: Fn(&LoopItem<'_>) -> LoopKey + Send + Sync + 'static,
    {
        self.key = Some(Arc::new(key));
        self
    }

    /// Key scalar items by their own value; other items keep their position.
    pub fn keyed_by_value(self) -> Self {
        self.keyed(|item| LoopKey::of(item.value).unwrap_or(LoopKey::Index(item.index)))
    }

    /// Give the looper a lookup name
    pub fn named(mut self, name: impl Into<CompactString>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Make the iterable follow view variable `var`
    pub fn bind(mut self, var: impl Into<CompactString>) -> Self {
        self.binding = Some(var.into());
        self
    }

    /// Whether keys come from a key function rather than position.
    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    /// Items of `iterable`, or a reconciliation error when it is not a sequence.
    ///
    /// `Unset` is the empty sequence.
    pub fn items(iterable: &Value) -> ViewResult<&[Value]> {
        match iterable {
            Value::Unset => Ok(&[]),
            Value::List(items) => Ok(items),
            other => Err(ViewError::Reconciliation(format!(
                "looper iterable must be a sequence, found {}",
                other.shape()
            ))),
        }
    }

    /// Ordered keys for `items`.
    pub fn keys(&self, items: &[Value]) -> Vec<LoopKey> {
        items
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let item = LoopItem { index, value };
                match &self.key {
                    Some(key) => key(&item),
                    None => LoopKey::Index(index),
                }
            })
            .collect()
    }

    /// Instantiate the template for one item.
    pub fn instantiate(&self, index: usize, value: &Value) -> Vec<Node> {
        (self.template)(&LoopItem { index, value })
    }
}

impl fmt::Debug for Looper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looper")
            .field("iterable", &self.iterable)
            .field("keyed", &self.is_keyed())
            .field("name", &self.name)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Element;

    #[test]
    fn test_positional_keys() {
        let looper = Looper::each(0..3i64, |_| Element::new("li"));
        let items = Looper::items(&looper.iterable).unwrap();
        assert_eq!(
            looper.keys(items),
            vec![LoopKey::Index(0), LoopKey::Index(1), LoopKey::Index(2)]
        );
    }

    #[test]
    fn test_value_keys() {
        let looper = Looper::each(vec!["a", "b"], |_| Element::new("li")).keyed_by_value();
        let items = Looper::items(&looper.iterable).unwrap();
        assert_eq!(
            looper.keys(items),
            vec![LoopKey::Text("a".into()), LoopKey::Text("b".into())]
        );
        assert!(looper.is_keyed());
    }

    #[test]
    fn test_non_sequence_iterable() {
        assert!(Looper::items(&Value::Unset).unwrap().is_empty());
        let err = Looper::items(&Value::Int(10)).unwrap_err();
        assert!(matches!(err, ViewError::Reconciliation(_)));
    }

    #[test]
    fn test_instantiate_sees_item() {
        let looper = Looper::each(0..2i64, |item| {
            Element::new("li").text(format!("{}:{}", item.index, item.value.as_int().unwrap_or(-1)))
        });
        let nodes = looper.instantiate(1, &Value::Int(1));
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].as_element().and_then(|e| e.text.as_deref()), Some("1:1"));
    }
}
