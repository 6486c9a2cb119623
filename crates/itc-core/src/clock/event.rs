//! Event trees: causal history as a binary tree of counters.
//!
//! The effective count at a point of the event space is the sum of the
//! values on the path from the root down to the leaf covering that point.
//! A tree is normal when no node has two equal leaf children and every
//! node has its children's common minimum lifted into its own value, so
//! that one child always has minimum zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::ClockError;

/// An ITC event tree.
///
/// Children sit behind [`Arc`]: trees are immutable, cloning is O(1) and
/// every operation builds a new root instead of editing shared nodes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// A uniform count over the whole subspace.
    Leaf(u32),
    /// A base count shared by both halves, refined by the children.
    Node(u32, Arc<Self>, Arc<Self>),
}

impl Event {
    /// A leaf with the given count.
    #[must_use]
    pub const fn leaf(value: u32) -> Self {
        Self::Leaf(value)
    }

    /// The empty history.
    #[must_use]
    pub const fn zero() -> Self {
        Self::Leaf(0)
    }

    /// Build a node and bring the whole result into normal form.
    ///
    /// # Errors
    ///
    /// [`ClockError::CounterOverflow`] if some effective count of the node
    /// exceeds `u32::MAX`.
    pub fn node(value: u32, left: Self, right: Self) -> Result<Self, ClockError> {
        let raw = Self::Node(value, Arc::new(left), Arc::new(right));
        if raw.checked_max().is_none() {
            return Err(ClockError::CounterOverflow);
        }
        Ok(raw.normalize())
    }

    /// `Node(value, 0, 0)`: a leaf re-expressed as a node with room to
    /// refine either half.
    pub(crate) fn expanded(value: u32) -> Self {
        Self::Node(value, Arc::new(Self::zero()), Arc::new(Self::zero()))
    }

    /// Assemble a node from children that are already normal.
    ///
    /// Equal leaf children collapse into a single leaf; otherwise the
    /// children's common minimum moves into the node value.
    pub(crate) fn collapse(value: u32, left: Self, right: Self) -> Self {
        match (&left, &right) {
            (Self::Leaf(a), Self::Leaf(b)) if a == b => Self::Leaf(value + a),
            _ => {
                let common = left.min().min(right.min());
                Self::Node(
                    value + common,
                    Arc::new(left.sink(common)),
                    Arc::new(right.sink(common)),
                )
            }
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// The count stored at this node: the leaf value, or the node's base.
    #[must_use]
    pub const fn value(&self) -> u32 {
        match self {
            Self::Leaf(n) | Self::Node(n, _, _) => *n,
        }
    }

    /// Smallest effective count anywhere in the subtree.
    #[must_use]
    pub fn min(&self) -> u32 {
        match self {
            Self::Leaf(n) => *n,
            Self::Node(n, l, r) => n + l.min().min(r.min()),
        }
    }

    /// Largest effective count anywhere in the subtree.
    #[must_use]
    pub fn max(&self) -> u32 {
        match self {
            Self::Leaf(n) => *n,
            Self::Node(n, l, r) => n + l.max().max(r.max()),
        }
    }

    /// Largest effective count, or `None` if some root-to-leaf sum does not
    /// fit a `u32`. Works on any tree, normal or not.
    #[must_use]
    pub fn checked_max(&self) -> Option<u32> {
        match self {
            Self::Leaf(n) => Some(*n),
            Self::Node(n, l, r) => n.checked_add(l.checked_max()?.max(r.checked_max()?)),
        }
    }

    /// Depth of the tree (0 for leaves).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Node(_, l, r) => 1 + l.depth().max(r.depth()),
        }
    }

    /// Number of nodes in the tree (leaves included).
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Node(_, l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Canonical form of this tree.
    ///
    /// Children are normalized first, then the node collapses or lifts
    /// their common minimum. Idempotent.
    ///
    /// Every effective count must fit a `u32` (see [`Event::checked_max`]);
    /// trees built by [`Event::node`] or held by a stamp always do.
    #[must_use]
    pub fn normalize(&self) -> Self {
        match self {
            Self::Leaf(_) => self.clone(),
            Self::Node(n, l, r) => Self::collapse(*n, l.normalize(), r.normalize()),
        }
    }

    /// Shift the root value up by `delta`. Children are shared untouched.
    ///
    /// Callers only lift by a partial path sum of an in-range tree.
    #[must_use]
    pub(crate) fn lift(&self, delta: u32) -> Self {
        match self {
            Self::Leaf(n) => Self::Leaf(n + delta),
            Self::Node(n, l, r) => Self::Node(n + delta, Arc::clone(l), Arc::clone(r)),
        }
    }

    /// Shift the root value down by `delta`.
    ///
    /// Callers only sink by a common minimum of normalized siblings, which
    /// never exceeds the root value.
    #[must_use]
    pub(crate) fn sink(&self, delta: u32) -> Self {
        debug_assert!(
            delta <= self.value(),
            "sink: delta {delta} > root value {}",
            self.value()
        );
        match self {
            Self::Leaf(n) => Self::Leaf(n.saturating_sub(delta)),
            Self::Node(n, l, r) => {
                Self::Node(n.saturating_sub(delta), Arc::clone(l), Arc::clone(r))
            }
        }
    }

    /// Pointwise maximum of two histories.
    ///
    /// Commutative, associative and idempotent on normal trees; the result
    /// is normal.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => Self::Leaf(*a.max(b)),
            (Self::Leaf(a), Self::Node(..)) => Self::expanded(*a).join(other),
            (Self::Node(..), Self::Leaf(b)) => self.join(&Self::expanded(*b)),
            (Self::Node(a, al, ar), Self::Node(b, bl, br)) => {
                if a > b {
                    return other.join(self);
                }
                let delta = b - a;
                Self::collapse(*a, al.join(&bl.lift(delta)), ar.join(&br.lift(delta)))
            }
        }
    }

    /// Causal order: every point of `self` is at most the same point of
    /// `other`.
    ///
    /// A leaf on the left is compared against `other`'s root value alone.
    /// That is exact for normal trees, where a node's value is also its
    /// minimum.
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(a), _) => *a <= other.value(),
            (Self::Node(a, al, ar), Self::Leaf(b)) => {
                a <= b && al.lift(*a).leq(other) && ar.lift(*a).leq(other)
            }
            (Self::Node(a, al, ar), Self::Node(b, bl, br)) => {
                a <= b
                    && al.lift(*a).leq(&bl.lift(*b))
                    && ar.lift(*a).leq(&br.lift(*b))
            }
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(n) => write!(f, "{n}"),
            Self::Node(n, l, r) => write!(f, "({n}, {l:?}, {r:?})"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
