//! Structural queries (XPath subset)
//!
//! Supported forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `/a/b` | absolute path; the queried handle is the document root |
//! | `//a` | `a` at any depth |
//! | `a/b` | path relative to the queried handle |
//! | `*` | any element |
//! | `[@name]` | attribute present |
//! | `[@name="v"]` | attribute equals `v` (single or double quotes) |
//! | `[text()="v"]` | a direct text node equals `v` |
//! | `[n]` | `n`th match among siblings (1-based) |
//!
//! Results are in document order without duplicates.

use std::borrow::Cow;
use std::hash::Hash;

use rustc_hash::FxHashSet;

use crate::error::{ViewError, ViewResult};

/// Read-only view of a tree that queries run against.
///
/// Text is split in two: `text` precedes the first child, each
/// child's `tail` follows that child.
pub trait Navigate {
    type Id: Copy + Eq + Hash;

    fn tag(&self, id: Self::Id) -> Option<&str>;
    fn attr(&self, id: Self::Id, name: &str) -> Option<&str>;
    fn text(&self, id: Self::Id) -> Option<&str>;
    fn tail(&self, id: Self::Id) -> Option<&str>;
    fn children(&self, id: Self::Id) -> &[Self::Id];
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    AttrEq(String, String),
    TextEq(String),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    /// `None` is the `*` wildcard
    name: Option<String>,
    predicates: Vec<Predicate>,
}

/// A parsed structural query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    absolute: bool,
    steps: Vec<Step>,
}

/// Context node during evaluation: the virtual document or a tree node.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Ctx<I> {
    Document,
    Node(I),
}

impl Query {
    /// Parse a query string.
    pub fn parse(query: &str) -> ViewResult<Self> {
        Parser::new(query).parse()
    }

    /// Evaluate against the subtree rooted at `root`.
    pub fn select<N: Navigate>(&self, tree: &N, root: N::Id) -> Vec<N::Id> {
        let mut context = vec![if self.absolute { Ctx::Document } else { Ctx::Node(root) }];

        for step in &self.steps {
            let mut found: FxHashSet<N::Id> = FxHashSet::default();
            for ctx in &context {
                let parents = match step.axis {
                    Axis::Child => vec![*ctx],
                    Axis::Descendant => descendants_or_self(tree, root, *ctx),
                };
                for parent in parents {
                    found.extend(step.apply(tree, &children_of(tree, root, parent)));
                }
            }
            context = document_order(tree, root, &found).into_iter().map(Ctx::Node).collect();
            if context.is_empty() {
                break;
            }
        }

        context
            .into_iter()
            .filter_map(|ctx| match ctx {
                Ctx::Node(id) => Some(id),
                Ctx::Document => None,
            })
            .collect()
    }
}

impl Step {
    /// Filter one sibling group by name test and predicates.
    fn apply<N: Navigate>(&self, tree: &N, siblings: &[N::Id]) -> Vec<N::Id> {
        let mut matched: Vec<N::Id> = siblings
            .iter()
            .copied()
            .filter(|&id| match &self.name {
                Some(name) => tree.tag(id) == Some(name.as_str()),
                None => true,
            })
            .collect();

        for predicate in &self.predicates {
            matched = match predicate {
                Predicate::Position(n) => matched.get(n - 1).copied().into_iter().collect(),
                Predicate::HasAttr(name) => {
                    matched.into_iter().filter(|&id| tree.attr(id, name).is_some()).collect()
                }
                Predicate::AttrEq(name, value) => matched
                    .into_iter()
                    .filter(|&id| tree.attr(id, name) == Some(value.as_str()))
                    .collect(),
                Predicate::TextEq(value) => matched
                    .into_iter()
                    .filter(|&id| text_nodes(tree, id).any(|t| t == value.as_str()))
                    .collect(),
            };
        }
        matched
    }
}

fn children_of<N: Navigate>(tree: &N, root: N::Id, ctx: Ctx<N::Id>) -> Cow<'_, [N::Id]> {
    match ctx {
        Ctx::Document => Cow::Owned(vec![root]),
        Ctx::Node(id) => Cow::Borrowed(tree.children(id)),
    }
}

fn descendants_or_self<N: Navigate>(tree: &N, root: N::Id, ctx: Ctx<N::Id>) -> Vec<Ctx<N::Id>> {
    let mut out = vec![ctx];
    let mut stack: Vec<N::Id> = children_of(tree, root, ctx).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        out.push(Ctx::Node(id));
        stack.extend(tree.children(id).iter().rev().copied());
    }
    out
}

fn document_order<N: Navigate>(tree: &N, root: N::Id, found: &FxHashSet<N::Id>) -> Vec<N::Id> {
    if found.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(found.len());
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if found.contains(&id) {
            out.push(id);
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }
    out
}

/// Direct text nodes of an element: its text and its children's tails.
fn text_nodes<N: Navigate>(tree: &N, id: N::Id) -> impl Iterator<Item = &str> {
    tree.text(id)
        .into_iter()
        .chain(tree.children(id).iter().filter_map(move |&c| tree.tail(c)))
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    query: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            query,
            rest: query.trim(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> ViewError {
        ViewError::invalid_query(self.query, reason)
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, token: &str) -> ViewResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{token}`")))
        }
    }

    fn parse(mut self) -> ViewResult<Query> {
        if self.rest.is_empty() {
            return Err(self.error("empty query"));
        }

        let mut steps = Vec::new();
        let absolute = self.rest.starts_with('/');
        let mut axis = self.axis().unwrap_or(Axis::Child);

        loop {
            steps.push(self.step(axis)?);
            if self.rest.is_empty() {
                break;
            }
            axis = self.axis().ok_or_else(|| self.error(format!("unexpected `{}`", self.rest)))?;
        }

        Ok(Query { absolute, steps })
    }

    fn axis(&mut self) -> Option<Axis> {
        if self.eat("//") {
            Some(Axis::Descendant)
        } else if self.eat("/") {
            Some(Axis::Child)
        } else {
            None
        }
    }

    fn step(&mut self, axis: Axis) -> ViewResult<Step> {
        let name = if self.eat("*") {
            None
        } else {
            Some(self.name()?)
        };

        let mut predicates = Vec::new();
        while self.eat("[") {
            predicates.push(self.predicate()?);
            self.expect("]")?;
        }

        Ok(Step { axis, name, predicates })
    }

    fn name(&mut self) -> ViewResult<String> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        let (name, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(name.to_string())
    }

    fn predicate(&mut self) -> ViewResult<Predicate> {
        if self.eat("@") {
            let name = self.name()?;
            if self.eat("=") {
                return Ok(Predicate::AttrEq(name, self.literal()?));
            }
            return Ok(Predicate::HasAttr(name));
        }

        if self.eat("text()") {
            self.expect("=")?;
            return Ok(Predicate::TextEq(self.literal()?));
        }

        let end = self.rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(self.rest.len());
        let (digits, rest) = self.rest.split_at(end);
        match digits.parse::<usize>() {
            Ok(n) if n > 0 => {
                self.rest = rest;
                Ok(Predicate::Position(n))
            }
            Ok(_) => Err(self.error("positions start at 1")),
            Err(_) => Err(self.error("unsupported predicate")),
        }
    }

    fn literal(&mut self) -> ViewResult<String> {
        let quote = match self.rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        let body = &self.rest[1..];
        let end = body.find(quote).ok_or_else(|| self.error("unterminated string"))?;
        let value = body[..end].to_string();
        self.rest = &body[end + 1..];
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let q = Query::parse("/html/body/div").unwrap();
        assert!(q.absolute);
        assert_eq!(q.steps.len(), 3);

        let q = Query::parse("//div[@class=\"btn btn-large\"]").unwrap();
        assert_eq!(q.steps[0].axis, Axis::Descendant);
        assert_eq!(
            q.steps[0].predicates,
            vec![Predicate::AttrEq("class".into(), "btn btn-large".into())]
        );

        let q = Query::parse("//*/li[2]").unwrap();
        assert_eq!(q.steps[0].name, None);
        assert_eq!(q.steps[1].predicates, vec![Predicate::Position(2)]);

        let q = Query::parse("li[@hidden][text()='x']").unwrap();
        assert!(!q.absolute);
        assert_eq!(q.steps[0].predicates.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "//", "div[", "div[@a=x]", "div[0]", "div[foo]", "a//", "div]"] {
            let err = Query::parse(bad).unwrap_err();
            assert!(matches!(err, ViewError::InvalidQuery { .. }), "{bad}: {err}");
        }
    }
}
