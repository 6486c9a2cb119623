//! Identity trees: which part of the event space a stamp may advance.
//!
//! Leaves are `0` (not owned) or `1` (owned); a node splits its interval
//! into a left and a right half. Identities held by live stamps are always
//! pairwise disjoint, and summing all of them yields `1`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::ClockError;

/// An ITC identity tree.
///
/// Normal form collapses `(0, 0)` to `0` and `(1, 1)` to `1`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Id {
    /// Nothing owned.
    Zero,
    /// Everything owned.
    One,
    /// Ownership refined per half.
    Node(Arc<Self>, Arc<Self>),
}

impl Id {
    #[must_use]
    pub const fn zero() -> Self {
        Self::Zero
    }

    #[must_use]
    pub const fn one() -> Self {
        Self::One
    }

    /// Build a node and bring the whole result into normal form.
    #[must_use]
    pub fn node(left: Self, right: Self) -> Self {
        Self::Node(Arc::new(left), Arc::new(right)).normalize()
    }

    /// Assemble a node from children that are already normal.
    pub(crate) fn collapse(left: Self, right: Self) -> Self {
        match (&left, &right) {
            (Self::Zero, Self::Zero) => Self::Zero,
            (Self::One, Self::One) => Self::One,
            _ => Self::Node(Arc::new(left), Arc::new(right)),
        }
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        matches!(self, Self::Zero)
    }

    #[must_use]
    pub const fn is_one(&self) -> bool {
        matches!(self, Self::One)
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Zero | Self::One)
    }

    /// Depth of the tree (0 for leaves).
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Zero | Self::One => 0,
            Self::Node(l, r) => 1 + l.depth().max(r.depth()),
        }
    }

    /// Number of nodes in the tree (leaves included).
    #[must_use]
    pub fn node_count(&self) -> usize {
        match self {
            Self::Zero | Self::One => 1,
            Self::Node(l, r) => 1 + l.node_count() + r.node_count(),
        }
    }

    /// Canonical form of this tree. Idempotent.
    #[must_use]
    pub fn normalize(&self) -> Self {
        match self {
            Self::Zero | Self::One => self.clone(),
            Self::Node(l, r) => Self::collapse(l.normalize(), r.normalize()),
        }
    }

    /// Divide ownership into two disjoint identities whose sum is `self`.
    ///
    /// When only one half is owned, that half is split further; when both
    /// are, each result keeps one half. `0` splits into two `0`s.
    ///
    /// # Errors
    ///
    /// [`ClockError::InvalidSplit`] for a node with two `0` children, which
    /// never appears in normal form.
    pub fn split(&self) -> Result<(Self, Self), ClockError> {
        match self {
            Self::Zero => Ok((Self::Zero, Self::Zero)),
            Self::One => Ok((
                Self::collapse(Self::One, Self::Zero),
                Self::collapse(Self::Zero, Self::One),
            )),
            Self::Node(l, r) if l.is_zero() && !r.is_zero() => {
                let (a, b) = r.split()?;
                Ok((Self::collapse(Self::Zero, a), Self::collapse(Self::Zero, b)))
            }
            Self::Node(l, r) if !l.is_zero() && r.is_zero() => {
                let (a, b) = l.split()?;
                Ok((Self::collapse(a, Self::Zero), Self::collapse(b, Self::Zero)))
            }
            Self::Node(l, r) if !l.is_zero() && !r.is_zero() => Ok((
                Self::collapse((**l).clone(), Self::Zero),
                Self::collapse(Self::Zero, (**r).clone()),
            )),
            Self::Node(..) => Err(ClockError::InvalidSplit {
                id: self.to_string(),
            }),
        }
    }

    /// Union of two disjoint identities; inverse of [`Id::split`].
    ///
    /// `0` is the identity element. Overlapping operands fall outside the
    /// disjointness contract; where a `1` meets owned structure the result
    /// is `1`.
    #[must_use]
    pub fn sum(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Zero, _) => other.clone(),
            (_, Self::Zero) => self.clone(),
            (Self::Node(al, ar), Self::Node(bl, br)) => Self::collapse(al.sum(bl), ar.sum(br)),
            _ => Self::One,
        }
    }

    /// Whether the two identities own any common part of the interval.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Zero, _) | (_, Self::Zero) => false,
            (Self::One, _) | (_, Self::One) => true,
            (Self::Node(al, ar), Self::Node(bl, br)) => al.intersects(bl) || ar.intersects(br),
        }
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "0"),
            Self::One => write!(f, "1"),
            Self::Node(l, r) => write!(f, "({l:?}, {r:?})"),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
