//! Attribute system for view elements
//!
//! - [`Attrs`]: plain string pairs, used for the escape-hatch mapping and
//!   for every attribute once it reaches a render target
//! - [`Value`]: the typed value the declarative layer assigns
//! - [`Attr`]: a typed attribute entry (name, declared kind, value)

use std::ops::Range;

use compact_str::{CompactString, ToCompactString};

use crate::codec::AttrKind;

/// Element attributes as simple key-value pairs
///
/// Insertion order is document order.
pub type Attrs = Vec<(String, String)>;

/// Extension trait for attribute operations on Attrs
pub trait AttrsExt {
    /// Get an attribute value by name
    fn get_attr(&self, name: &str) -> Option<&str>;

    /// Check if an attribute exists
    fn has_attr(&self, name: &str) -> bool;

    /// Set an attribute value (insert or update)
    fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>);

    /// Remove an attribute by name, returning the old value if present
    fn remove_attr(&mut self, name: &str) -> Option<String>;
}

impl AttrsExt for Attrs {
    fn get_attr(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn has_attr(&self, name: &str) -> bool {
        self.iter().any(|(k, _)| k == name)
    }

    fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(attr) = self.iter_mut().find(|(k, _)| k == &name) {
            attr.1 = value;
        } else {
            self.push((name, value));
        }
    }

    fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.iter()
            .position(|(k, _)| k == name)
            .map(|pos| self.remove(pos).1)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A typed value assigned by the declarative layer.
///
/// The value alone never decides how an attribute is serialized; the
/// attribute's declared [`AttrKind`] does.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// No value: the attribute is omitted.
    #[default]
    Unset,
    Bool(bool),
    Int(i64),
    Text(CompactString),
    /// Ordered sequence (class lists, looper iterables).
    List(Vec<Value>),
    /// Ordered string mapping (inline styles, escape-hatch attributes).
    Map(Vec<(CompactString, CompactString)>),
}

impl Value {
    /// Integer sequence, the equivalent of `range(start, end)`.
    pub fn range(range: Range<i64>) -> Self {
        Self::List(range.map(Value::Int).collect())
    }

    /// Build a mapping from any iterator of string pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<CompactString>,
        V: Into<CompactString>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Short name of the value's shape, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(CompactString, CompactString)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Scalar text form (`Text` verbatim, `Int` in decimal).
    pub fn to_text(&self) -> Option<CompactString> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_compact_string()),
            _ => None,
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => |$v:ident| $expr:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $expr
                }
            }
        )*
    };
}

impl_value_from! {
    bool => |v| Value::Bool(v),
    i64 => |v| Value::Int(v),
    i32 => |v| Value::Int(v.into()),
    u32 => |v| Value::Int(v.into()),
    // Saturates: counts past i64::MAX are not representable.
    usize => |v| Value::Int(i64::try_from(v).unwrap_or(i64::MAX)),
    &str => |v| Value::Text(v.into()),
    String => |v| Value::Text(v.into()),
    CompactString => |v| Value::Text(v),
    Vec<Value> => |v| Value::List(v),
    Vec<&str> => |v| Value::List(v.into_iter().map(Value::from).collect()),
    Vec<(&str, &str)> => |v| Value::map(v),
    Range<i64> => |v| Value::range(v),
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(items: [&str; N]) -> Self {
        Value::List(items.into_iter().map(Value::from).collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Value {
    fn from(entries: [(&str, &str); N]) -> Self {
        Value::map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Unset, Into::into)
    }
}

// =============================================================================
// Attr
// =============================================================================

/// A typed attribute: name, declared kind and current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: CompactString,
    pub kind: AttrKind,
    pub value: Value,
}

impl Attr {
    /// Create an attribute whose kind comes from the lookup table.
    pub fn new(name: impl Into<CompactString>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let kind = AttrKind::of(&name);
        Self {
            name,
            kind,
            value: value.into(),
        }
    }

    /// Create an attribute with an explicit kind.
    pub fn with_kind(name: impl Into<CompactString>, kind: AttrKind, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            value: value.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
