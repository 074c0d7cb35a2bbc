//! Selectors Level 3 subset used by the cascade.
//! Spec: <https://www.w3.org/TR/selectors-3/>
//!
//! Supported: type, universal, class and id selectors, compounds of those,
//! and the descendant and child combinators. A selector list containing
//! anything else is rejected as a whole, as an invalid selector would be.

use core::mem;

use cssparser::{Parser, ParserInput, Token};
use html::dom::{DOM, NodeKey};

/// Specificity triple (a, b, c).
/// Spec: Section 13 — Calculating a selector's specificity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u16, pub u16, pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// A sequence of simple selectors with no combinator in between.
/// An empty compound is the universal selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl CompoundSelector {
    fn specificity(&self) -> Specificity {
        let ids = u16::from(self.id.is_some());
        let classes = u16::try_from(self.classes.len()).unwrap_or(u16::MAX);
        let types = u16::from(self.tag.is_some());
        Specificity(ids, classes, types)
    }

    /// Spec: Sections 5–7 — type, class and ID selectors
    pub fn matches(&self, dom: &DOM, node: NodeKey) -> bool {
        let Some(tag) = dom.tag_name(node) else {
            return false;
        };
        if let Some(wanted) = &self.tag
            && wanted != tag
        {
            return false;
        }
        if let Some(wanted) = &self.id
            && dom.attribute(node, "id") != Some(wanted.as_str())
        {
            return false;
        }
        if self.classes.is_empty() {
            return true;
        }
        let classes = dom.class_list(node);
        self.classes
            .iter()
            .all(|class| classes.contains(&class.as_str()))
    }
}

/// Compounds joined by combinators, left to right.
/// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    pub combinators: Vec<Combinator>,
}

impl ComplexSelector {
    /// Spec: Section 13 — sum over every compound
    pub fn specificity(&self) -> Specificity {
        self.compounds
            .iter()
            .map(CompoundSelector::specificity)
            .fold(Specificity::default(), |total, add| {
                Specificity(
                    total.0.saturating_add(add.0),
                    total.1.saturating_add(add.1),
                    total.2.saturating_add(add.2),
                )
            })
    }

    /// Right-to-left match against `node`.
    pub fn matches(&self, dom: &DOM, node: NodeKey) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        last.matches(dom, node) && self.matches_leftward(dom, node, rest.len())
    }

    /// Match the `remaining` compounds left of the one already matched at `node`.
    /// Spec: Section 11 — Combinators
    fn matches_leftward(&self, dom: &DOM, node: NodeKey, remaining: usize) -> bool {
        let Some(index) = remaining.checked_sub(1) else {
            return true;
        };
        let (Some(compound), Some(combinator)) =
            (self.compounds.get(index), self.combinators.get(index))
        else {
            return false;
        };
        match combinator {
            Combinator::Child => dom.parent(node).is_some_and(|parent| {
                compound.matches(dom, parent) && self.matches_leftward(dom, parent, index)
            }),
            Combinator::Descendant => {
                let mut cursor = dom.parent(node);
                while let Some(ancestor) = cursor {
                    if compound.matches(dom, ancestor) && self.matches_leftward(dom, ancestor, index)
                    {
                        return true;
                    }
                    cursor = dom.parent(ancestor);
                }
                false
            }
        }
    }
}

enum Piece {
    Type(String),
    Universal,
    Class(String),
    Id(String),
    Whitespace,
    Child,
    Comma,
}

fn tokenize(prelude: &str) -> Option<Vec<Piece>> {
    let mut input = ParserInput::new(prelude);
    let mut parser = Parser::new(&mut input);
    let mut pieces = Vec::new();
    let mut after_dot = false;
    while let Ok(next) = parser.next_including_whitespace() {
        let token = next.clone();
        if after_dot {
            let Token::Ident(name) = token else {
                return None;
            };
            pieces.push(Piece::Class(name.to_string()));
            after_dot = false;
            continue;
        }
        let piece = match token {
            Token::Ident(name) => Piece::Type(name.to_ascii_lowercase()),
            Token::IDHash(id) => Piece::Id(id.to_string()),
            Token::Delim('.') => {
                after_dot = true;
                continue;
            }
            Token::Delim('*') => Piece::Universal,
            Token::Delim('>') => Piece::Child,
            Token::WhiteSpace(_) => Piece::Whitespace,
            Token::Comma => Piece::Comma,
            _ => return None,
        };
        pieces.push(piece);
    }
    (!after_dot).then_some(pieces)
}

fn build_complex(pieces: &[Piece]) -> Option<ComplexSelector> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut current = CompoundSelector::default();
    let mut started = false;
    let mut pending: Option<Combinator> = None;
    for piece in pieces {
        match piece {
            Piece::Whitespace => {
                if started {
                    compounds.push(mem::take(&mut current));
                    started = false;
                    pending.get_or_insert(Combinator::Descendant);
                }
            }
            Piece::Child => {
                if started {
                    compounds.push(mem::take(&mut current));
                    started = false;
                } else if compounds.is_empty() || pending == Some(Combinator::Child) {
                    return None;
                }
                pending = Some(Combinator::Child);
            }
            Piece::Comma => return None,
            simple => {
                if let Some(combinator) = pending.take() {
                    combinators.push(combinator);
                }
                match simple {
                    Piece::Type(_) | Piece::Universal if started => return None,
                    Piece::Type(tag) => current.tag = Some(tag.clone()),
                    Piece::Class(class) => current.classes.push(class.clone()),
                    Piece::Id(id) => current.id = Some(id.clone()),
                    _ => {}
                }
                started = true;
            }
        }
    }
    if started {
        compounds.push(current);
    } else if compounds.is_empty() || pending == Some(Combinator::Child) {
        return None;
    }
    Some(ComplexSelector {
        compounds,
        combinators,
    })
}

/// Parse a comma-separated selector list; `None` if any entry is unsupported.
/// Spec: Section 4 — Groups of selectors
pub fn parse_selector_list(prelude: &str) -> Option<Vec<ComplexSelector>> {
    let pieces = tokenize(prelude)?;
    pieces
        .split(|piece| matches!(piece, Piece::Comma))
        .map(build_complex)
        .collect()
}
