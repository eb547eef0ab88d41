//! Attribute codec
//!
//! Maps a typed [`Value`] to the string a markup attribute carries, or to
//! "omit the attribute". Which rule applies is decided by the attribute's
//! declared [`AttrKind`], never by the value's shape.
//!
//! | Kind | `true` | `false` | list | mapping |
//! |------|--------|---------|------|---------|
//! | `Presence` | `name="name"` | omitted | - | - |
//! | `Literal` | `"true"` | `"false"` | - | - |
//! | `List` | - | - | space-joined | - |
//! | `Style` | - | - | - | `k:v;k:v` |

use std::fmt;
use std::str::FromStr;

use crate::attr::Value;
use crate::error::{ViewError, ViewResult};

/// Declared serialization kind of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    /// Scalar used verbatim.
    Text,
    /// Boolean rendered as presence: `name="name"` or nothing.
    Presence,
    /// Boolean rendered as the literal strings `"true"`/`"false"`.
    Literal,
    /// Sequence of tokens joined with single spaces.
    List,
    /// String mapping rendered as `key:value` pairs joined with `;`.
    Style,
}

/// Attributes whose boolean form is the literal `"true"`/`"false"`.
const LITERAL_ATTRS: &[&str] = &["draggable", "contenteditable", "spellcheck"];

/// Attributes whose boolean form is presence (`name="name"`).
const PRESENCE_ATTRS: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "clickable",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

impl AttrKind {
    /// Declared kind of a named attribute (fixed lookup table).
    pub fn of(name: &str) -> Self {
        match name {
            "class" => Self::List,
            "style" => Self::Style,
            _ if LITERAL_ATTRS.contains(&name) => Self::Literal,
            _ if PRESENCE_ATTRS.contains(&name) => Self::Presence,
            _ => Self::Text,
        }
    }

    /// Canonical kind name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Presence => "boolean-presence",
            Self::Literal => "boolean-literal",
            Self::List => "string-list",
            Self::Style => "string-mapping",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttrKind {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::Text),
            "boolean-presence" => Ok(Self::Presence),
            "boolean-literal" => Ok(Self::Literal),
            "string-list" => Ok(Self::List),
            "string-mapping" => Ok(Self::Style),
            other => Err(ViewError::unsupported("<kind>", other, "unknown kind name")),
        }
    }
}

/// Encode `value` for attribute `name` of the given kind.
///
/// Returns `Ok(None)` when the attribute must be omitted.
pub fn encode(name: &str, kind: AttrKind, value: &Value) -> ViewResult<Option<String>> {
    let mismatch = || ViewError::unsupported(name, kind, value.shape());

    match (kind, value) {
        (_, Value::Unset) => Ok(None),

        (AttrKind::Text, Value::Text(s)) => Ok(Some(s.to_string())),
        (AttrKind::Text, Value::Int(i)) => Ok(Some(i.to_string())),

        (AttrKind::Presence, Value::Bool(true)) => Ok(Some(name.to_string())),
        (AttrKind::Presence, Value::Bool(false)) => Ok(None),

        (AttrKind::Literal, Value::Bool(b)) => Ok(Some(b.to_string())),
        (AttrKind::Literal, Value::Text(s)) if s == "true" || s == "false" => Ok(Some(s.to_string())),

        (AttrKind::List | AttrKind::Style, Value::Text(s)) => Ok(Some(s.to_string())),
        (AttrKind::List, Value::List(items)) => {
            if items.is_empty() {
                return Ok(None);
            }
            let mut out = String::new();
            for (i, item) in items.iter().enumerate() {
                let token = item.to_text().ok_or_else(mismatch)?;
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&token);
            }
            Ok(Some(out))
        }
        (AttrKind::Style, Value::Map(entries)) => {
            if entries.is_empty() {
                return Ok(None);
            }
            let out = entries
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect::<Vec<_>>()
                .join(";");
            Ok(Some(out))
        }

        _ => Err(mismatch()),
    }
}

/// Encode a named attribute using the lookup-table kind.
#[inline]
pub fn encode_named(name: &str, value: &Value) -> ViewResult<Option<String>> {
    encode(name, AttrKind::of(name), value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list() {
        let v = Value::from(["btn", "btn-large"]);
        assert_eq!(encode_named("class", &v).unwrap().as_deref(), Some("btn btn-large"));
        assert_eq!(encode_named("class", &Value::from("right")).unwrap().as_deref(), Some("right"));
        assert_eq!(encode_named("class", &Value::List(vec![])).unwrap(), None);
    }

    #[test]
    fn test_string_mapping() {
        let v = Value::from([("background", "#fff"), ("color", "blue")]);
        assert_eq!(
            encode_named("style", &v).unwrap().as_deref(),
            Some("background:#fff;color:blue")
        );
        let verbatim = Value::from("float: left;");
        assert_eq!(encode_named("style", &verbatim).unwrap().as_deref(), Some("float: left;"));
    }

    #[test]
    fn test_boolean_presence() {
        assert_eq!(encode_named("clickable", &true.into()).unwrap().as_deref(), Some("clickable"));
        assert_eq!(encode_named("selected", &true.into()).unwrap().as_deref(), Some("selected"));
        assert_eq!(encode_named("controls", &false.into()).unwrap(), None);
    }

    #[test]
    fn test_boolean_literal() {
        assert_eq!(encode_named("draggable", &true.into()).unwrap().as_deref(), Some("true"));
        assert_eq!(encode_named("draggable", &false.into()).unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn test_unset_omits_every_kind() {
        for kind in [AttrKind::Text, AttrKind::Presence, AttrKind::Literal, AttrKind::List, AttrKind::Style] {
            assert_eq!(encode("x", kind, &Value::Unset).unwrap(), None);
        }
    }

    #[test]
    fn test_kind_is_declared_not_inferred() {
        // A boolean on a plain text attribute is a model/codec mismatch.
        let err = encode_named("href", &true.into()).unwrap_err();
        assert!(matches!(err, ViewError::UnsupportedAttributeKind { .. }));

        let err = encode("class", AttrKind::Presence, &Value::from(["a"])).unwrap_err();
        assert!(err.to_string().contains("boolean-presence"));
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [AttrKind::Text, AttrKind::Presence, AttrKind::Literal, AttrKind::List, AttrKind::Style] {
            assert_eq!(kind.name().parse::<AttrKind>().unwrap(), kind);
        }
        assert!(matches!(
            "boolean".parse::<AttrKind>(),
            Err(ViewError::UnsupportedAttributeKind { .. })
        ));
    }

    #[test]
    fn test_int_text() {
        assert_eq!(encode_named("colspan", &2.into()).unwrap().as_deref(), Some("2"));
        assert_eq!(
            encode_named("class", &Value::List(vec![1.into(), "b".into()])).unwrap().as_deref(),
            Some("1 b")
        );
    }
}
