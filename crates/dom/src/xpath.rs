//! Path expressions over the arena
//!
//! A small absolute subset of XPath: the part the walker emits plus the
//! descendant shorthand and wildcard people type by hand.
//!
//! ```text
//! expr  := "/" | step+
//! step  := ("/" | "//") test ("[" n "]")?
//! test  := name | "*"
//! ```
//!
//! `//` means descendant-or-self then child, so `//li[2]` is every `li`
//! that is the second `li` child of its parent. Names run up to the next
//! `/`, `[`, `]`, `*` or whitespace, so custom element names with non-ASCII
//! characters parse as written. Name tests ignore ASCII case.

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::host::{DocumentHost, PathEvaluator};
use crate::types::NodeId;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    DescendantChild,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    Any,
    Name(String),
}

impl NameTest {
    fn matches(&self, tag: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Name(name) => name.eq_ignore_ascii_case(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    /// 1-based position among the context's matching children
    pub position: Option<usize>,
}

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    steps: Vec<Step>,
}

impl PathExpr {
    pub fn parse(expression: &str) -> Result<Self> {
        Parser::new(expression).parse()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Matching nodes, deduplicated, in document order
    pub fn evaluate(&self, arena: &DomArena) -> Result<Vec<NodeId>> {
        let root = arena.document()?;
        let order = arena.document_order()?;
        let mut context = vec![root];

        for step in &self.steps {
            let scope = match step.axis {
                Axis::Child => context,
                Axis::DescendantChild => descendants_or_self(arena, &context, &order)?,
            };

            let mut next = Vec::new();
            for parent in scope {
                let mut matching = arena
                    .get(parent)?
                    .children_ids
                    .iter()
                    .copied()
                    .filter(|&child| {
                        arena.tag_name(child).is_some_and(|tag| step.test.matches(tag))
                    });

                match step.position {
                    Some(position) => next.extend(matching.nth(position - 1)),
                    None => next.extend(matching),
                }
            }

            sort_document_order(&mut next, &order);
            context = next;
        }

        Ok(context)
    }
}

impl FromStr for PathExpr {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn descendants_or_self(arena: &DomArena, context: &[NodeId], order: &[usize]) -> Result<Vec<NodeId>> {
    let mut nodes = Vec::new();
    for &start in context {
        arena.traverse_df(start, |node| {
            nodes.push(node.node_id);
            Ok(())
        })?;
    }
    sort_document_order(&mut nodes, order);
    Ok(nodes)
}

fn sort_document_order(nodes: &mut Vec<NodeId>, order: &[usize]) {
    nodes.sort_by_key(|&id| order.get(id as usize).copied().unwrap_or(usize::MAX));
    nodes.dedup();
}

struct Parser<'a> {
    expression: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(expression: &'a str) -> Self {
        Self {
            expression,
            input: expression.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::InvalidPath {
            expression: self.expression.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<PathExpr> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(self.error("empty expression"));
        }
        if self.peek() != Some(b'/') {
            return Err(self.error("expression must start with '/'"));
        }

        let mut steps = Vec::new();
        while self.peek() == Some(b'/') {
            self.pos += 1;
            let axis = if self.peek() == Some(b'/') {
                self.pos += 1;
                Axis::DescendantChild
            } else {
                Axis::Child
            };

            // "/" alone selects the document
            if self.peek().is_none() && axis == Axis::Child && steps.is_empty() {
                break;
            }

            let test = self.name_test()?;
            let position = self.predicate()?;
            steps.push(Step {
                axis,
                test,
                position,
            });
        }

        self.skip_whitespace();
        if let Some(ch) = self.expression[self.pos..].chars().next() {
            return Err(self.error(format!("unexpected '{ch}' at offset {}", self.pos)));
        }

        Ok(PathExpr { steps })
    }

    fn name_test(&mut self) -> Result<NameTest> {
        if self.peek() == Some(b'*') {
            self.pos += 1;
            return Ok(NameTest::Any);
        }

        let start = self.pos;
        let name = self.expression[start..]
            .split(|ch: char| matches!(ch, '/' | '[' | ']' | '*') || ch.is_whitespace())
            .next()
            .unwrap_or_default();
        self.pos += name.len();

        match name.chars().next() {
            None => return Err(self.error(format!("expected a name test at offset {start}"))),
            Some(first) if first.is_ascii_digit() || matches!(first, '-' | '.') => {
                return Err(self.error(format!("name cannot start with '{first}' at offset {start}")));
            }
            Some(_) => {}
        }

        Ok(NameTest::Name(self.expression[start..self.pos].to_string()))
    }

    fn predicate(&mut self) -> Result<Option<usize>> {
        if self.peek() != Some(b'[') {
            return Ok(None);
        }
        self.pos += 1;

        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.expression[start..self.pos];

        if self.peek() != Some(b']') {
            return Err(self.error(format!("unterminated or non-numeric predicate at offset {start}")));
        }
        self.pos += 1;

        match digits.parse::<usize>() {
            Ok(position) if position >= 1 => Ok(Some(position)),
            _ => Err(self.error(format!("predicate must be a positive integer, got {digits:?}"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|ch| ch.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

/// Forward-only cursor over one evaluation's matches.
///
/// `has more` until `next()` returns `None`; after that it stays exhausted.
#[derive(Debug)]
pub struct PathMatches {
    matches: std::vec::IntoIter<NodeId>,
}

impl Iterator for PathMatches {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.matches.next()
    }
}

impl std::iter::FusedIterator for PathMatches {}

impl PathEvaluator for DomArena {
    type Matches<'a> = PathMatches;

    fn evaluate(&self, expression: &str) -> Result<PathMatches> {
        let matches = PathExpr::parse(expression)?.evaluate(self)?;
        Ok(PathMatches {
            matches: matches.into_iter(),
        })
    }
}
