//! Symbolic state at one program point
//!
//! The state list maps variable paths (`one`, `one.x`, `p->x`, `*p`) to what
//! is known about them. Each entry belongs to an owner:
//! - [`StateOwner::Extra`]: the value range the path is known to hold
//! - [`StateOwner::Modified`]: the path has been written in this function
//!
//! # Ordering
//!
//! Entries are kept sorted by `(owner, path)`. [`StatePath`] orders its base
//! name first and then its access steps lexicographically, so a variable and
//! every path rooted at it form one contiguous run. The member-state probe
//! depends on this to stop scanning early.

pub mod range;

use crate::parser::ast::{AccessKind, AstNode, UnOp};
use crate::parser::build::strip_wrapping;
pub use range::ValueRange;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateOwner {
    Extra,
    Modified,
}

impl fmt::Display for StateOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateOwner::Extra => write!(f, "extra"),
            StateOwner::Modified => write!(f, "modified"),
        }
    }
}

/// One step away from the base variable
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    Member(AccessKind, String),
    Deref,
}

/// Variable-rooted access path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatePath {
    base: String,
    steps: Vec<PathStep>,
}

impl StatePath {
    pub fn variable(name: &str) -> Self {
        Self {
            base: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn member(mut self, kind: AccessKind, name: &str) -> Self {
        self.steps.push(PathStep::Member(kind, name.to_string()));
        self
    }

    pub fn deref(mut self) -> Self {
        self.steps.push(PathStep::Deref);
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Canonical path named by an lvalue expression
    ///
    /// `(*p).x` and `p->x` name the same path, as do `(&s)->x` and `s.x`.
    /// Returns `None` for anything not rooted at a plain variable (array
    /// elements, call results, literals).
    pub fn from_expr(expr: &AstNode) -> Option<Self> {
        match strip_wrapping(expr) {
            AstNode::Variable(name, _) => Some(Self::variable(name)),
            AstNode::MemberAccess { object, member, .. } => match strip_wrapping(object) {
                AstNode::UnaryOp {
                    op: UnOp::Deref,
                    operand,
                    ..
                } => Some(Self::from_expr(operand)?.member(AccessKind::Dereference, member)),
                object => Some(Self::from_expr(object)?.member(AccessKind::Direct, member)),
            },
            AstNode::PointerMemberAccess { object, member, .. } => match strip_wrapping(object) {
                AstNode::UnaryOp {
                    op: UnOp::AddrOf,
                    operand,
                    ..
                } => Some(Self::from_expr(operand)?.member(AccessKind::Direct, member)),
                object => Some(Self::from_expr(object)?.member(AccessKind::Dereference, member)),
            },
            AstNode::UnaryOp {
                op: UnOp::Deref,
                operand,
                ..
            } => match strip_wrapping(operand) {
                AstNode::UnaryOp {
                    op: UnOp::AddrOf,
                    operand: inner,
                    ..
                } => Self::from_expr(inner),
                operand => Some(Self::from_expr(operand)?.deref()),
            },
            _ => None,
        }
    }

    /// Compare against `target` with this path cut to `target`'s length
    pub fn cmp_bounded(&self, target: &StatePath) -> Ordering {
        let len = self.steps.len().min(target.steps.len());
        self.base
            .cmp(&target.base)
            .then_with(|| self.steps[..len].cmp(&target.steps[..]))
    }

    /// Strictly longer path starting with all of `self`
    pub fn is_ancestor_of(&self, other: &StatePath) -> bool {
        self.base == other.base
            && other.steps.len() > self.steps.len()
            && other.steps[..self.steps.len()] == self.steps[..]
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut text = self.base.clone();
        for step in &self.steps {
            text = match step {
                PathStep::Member(kind, name) if text.starts_with('*') => {
                    format!("({}){}{}", text, kind.symbol(), name)
                }
                PathStep::Member(kind, name) => format!("{}{}{}", text, kind.symbol(), name),
                PathStep::Deref if text.contains(['.', '>', '*']) => format!("*({})", text),
                PathStep::Deref => format!("*{}", text),
            };
        }
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmState {
    pub owner: StateOwner,
    pub path: StatePath,
    pub value: ValueRange,
}

impl fmt::Display for SmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {}", self.owner, self.path, self.value)
    }
}

/// States at one program point, sorted by `(owner, path)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateList {
    states: Vec<SmState>,
}

impl StateList {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, owner: StateOwner, path: &StatePath) -> Result<usize, usize> {
        self.states
            .binary_search_by(|sm| (sm.owner, &sm.path).cmp(&(owner, path)))
    }

    pub fn get(&self, owner: StateOwner, path: &StatePath) -> Option<&SmState> {
        self.position(owner, path).ok().map(|i| &self.states[i])
    }

    pub fn value(&self, path: &StatePath) -> Option<ValueRange> {
        self.get(StateOwner::Extra, path).map(|sm| sm.value)
    }

    pub fn set(&mut self, owner: StateOwner, path: StatePath, value: ValueRange) {
        match self.position(owner, &path) {
            Ok(i) => self.states[i].value = value,
            Err(i) => self.states.insert(i, SmState { owner, path, value }),
        }
    }

    pub fn remove(&mut self, owner: StateOwner, path: &StatePath) -> Option<SmState> {
        self.position(owner, path).ok().map(|i| self.states.remove(i))
    }

    /// Drop every state of `owner` on a path strictly below `path`
    pub fn clear_members(&mut self, owner: StateOwner, path: &StatePath) {
        self.states
            .retain(|sm| sm.owner != owner || !path.is_ancestor_of(&sm.path));
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether any `Extra` state exists for a member reached from `path`
    ///
    /// The whole variable's own state does not count, nor does a path that
    /// continues with a dereference rather than a member access. Both `.`
    /// and `->` steps count as member steps.
    pub fn has_member_states(&self, path: &StatePath) -> bool {
        for sm in &self.states {
            if sm.owner != StateOwner::Extra {
                continue;
            }
            match sm.path.cmp_bounded(path) {
                Ordering::Less => continue,
                Ordering::Equal => {
                    if let Some(PathStep::Member(..)) = sm.path.steps.get(path.steps.len()) {
                        return true;
                    }
                }
                Ordering::Greater => return false,
            }
        }
        false
    }

    /// Join of two control-flow predecessors
    ///
    /// `Extra` ranges present on both sides are unioned; a path known on
    /// only one side is dropped since the other side knows nothing about it.
    /// `Modified` states survive from either side.
    pub fn merge(&self, other: &StateList) -> StateList {
        let mut merged = Vec::with_capacity(self.states.len().max(other.states.len()));
        let mut left = self.states.iter().peekable();
        let mut right = other.states.iter().peekable();

        loop {
            let order = match (left.peek(), right.peek()) {
                (Some(a), Some(b)) => (a.owner, &a.path).cmp(&(b.owner, &b.path)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => break,
            };

            match order {
                Ordering::Equal => {
                    if let (Some(a), Some(b)) = (left.next(), right.next()) {
                        merged.push(SmState {
                            value: a.value.union(&b.value),
                            ..a.clone()
                        });
                    }
                }
                Ordering::Less => {
                    if let Some(a) = left.next().filter(|a| a.owner == StateOwner::Modified) {
                        merged.push(a.clone());
                    }
                }
                Ordering::Greater => {
                    if let Some(b) = right.next().filter(|b| b.owner == StateOwner::Modified) {
                        merged.push(b.clone());
                    }
                }
            }
        }

        StateList { states: merged }
    }
}

impl<'a> IntoIterator for &'a StateList {
    type Item = &'a SmState;
    type IntoIter = std::slice::Iter<'a, SmState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}
