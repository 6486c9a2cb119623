//! Stamps and the four clock operations: fork, event, join, peek.
//!
//! A stamp pairs an identity (what it may advance) with an event tree
//! (what it has seen). Typical flow: create one [`Stamp::seed`], [`fork`]
//! it for every new replica, call [`event`] before recording or sending,
//! [`join`] on receipt, and hand out [`peek`]s as read-only snapshots.
//!
//! [`fork`]: Stamp::fork
//! [`event`]: Stamp::event
//! [`join`]: Stamp::join
//! [`peek`]: Stamp::peek

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use super::event::Event;
use super::id::Id;
use crate::error::ClockError;

/// An ITC stamp: identity tree plus event tree, both in normal form, with
/// every effective count within `u32`.
///
/// Deserialization goes through [`Stamp::new`], so stamps read back from
/// JSON or any other serde format hold the same guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StampParts")]
pub struct Stamp {
    id: Id,
    event: Event,
}

/// Unchecked serde shape of a [`Stamp`].
#[derive(Deserialize)]
struct StampParts {
    id: Id,
    event: Event,
}

impl TryFrom<StampParts> for Stamp {
    type Error = ClockError;

    fn try_from(parts: StampParts) -> Result<Self, Self::Error> {
        Self::new(parts.id, parts.event)
    }
}

impl Stamp {
    /// Pair the given trees, normalizing both.
    ///
    /// # Errors
    ///
    /// [`ClockError::CounterOverflow`] if an effective count of `event`
    /// exceeds `u32::MAX`.
    pub fn new(id: Id, event: Event) -> Result<Self, ClockError> {
        if event.checked_max().is_none() {
            return Err(ClockError::CounterOverflow);
        }
        Ok(Self {
            id: id.normalize(),
            event: event.normalize(),
        })
    }

    /// Pair trees the caller has already normalized and range-checked.
    pub(crate) const fn from_normal(id: Id, event: Event) -> Self {
        Self { id, event }
    }

    /// The initial stamp `(1, 0)`: owns everything, has seen nothing.
    #[must_use]
    pub const fn seed() -> Self {
        Self {
            id: Id::one(),
            event: Event::zero(),
        }
    }

    /// `(0, 0)`: owns nothing, has seen nothing.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            id: Id::zero(),
            event: Event::zero(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &Id {
        &self.id
    }

    /// The causal history recorded by this stamp.
    #[must_use]
    pub const fn history(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub fn into_parts(self) -> (Id, Event) {
        (self.id, self.event)
    }

    /// Whether this stamp owns no part of the interval.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.id.is_zero()
    }

    /// Split off a new replica.
    ///
    /// `self` keeps the first half of its identity, the returned stamp gets
    /// the second; both carry the same history, so they compare equal until
    /// either records an event.
    ///
    /// # Errors
    ///
    /// [`ClockError::InvalidSplit`] if the identity is not in normal form.
    pub fn fork(&mut self) -> Result<Self, ClockError> {
        let (kept, given) = self.id.split()?;
        self.id = kept;
        Ok(Self {
            id: given,
            event: self.event.clone(),
        })
    }

    /// A read-only snapshot: anonymous identity, this stamp's history.
    ///
    /// Trees are immutable, so the snapshot shares structure with `self`
    /// without ever observing later changes to it.
    #[must_use]
    pub fn peek(&self) -> Self {
        Self {
            id: Id::zero(),
            event: self.event.clone(),
        }
    }

    /// Absorb another stamp: sum identities, join histories.
    ///
    /// `other` is consumed; its identity now belongs to `self`.
    pub fn join(&mut self, other: Self) {
        let (id, event) = other.into_parts();
        self.id = self.id.sum(&id);
        self.event = self.event.join(&event);
    }

    /// Record a new event.
    ///
    /// First tries to fill owned subtrees up to what the history already
    /// allows; if that changes nothing, grows the cheapest owned position by
    /// one. A stamp that owns nothing keeps its history unchanged.
    ///
    /// # Errors
    ///
    /// [`ClockError::CounterOverflow`] if every owned position already
    /// counts `u32::MAX`. The history is left unchanged.
    pub fn event(&mut self) -> Result<(), ClockError> {
        let filled = fill(&self.id, &self.event);
        if filled != self.event {
            trace!(stamp = %self, filled = %filled, "event advanced by fill");
            self.event = filled;
            return Ok(());
        }

        match grow(&self.id, &self.event, 0) {
            Ok(Some((grown, cost))) => {
                trace!(
                    stamp = %self,
                    expansions = cost.expansions,
                    depth = cost.depth,
                    "event advanced by grow"
                );
                self.event = grown.normalize();
            }
            Ok(None) => debug!(stamp = %self, "event on a stamp that owns nothing; history unchanged"),
            Err(err) => {
                debug!(stamp = %self, "event counter saturated");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Causal order on histories: `self` happened before or equals `other`.
    /// Identities play no part.
    #[must_use]
    pub fn leq(&self, other: &Self) -> bool {
        self.event.leq(&other.event)
    }

    /// Neither stamp has seen everything the other has.
    #[must_use]
    pub fn concurrent(&self, other: &Self) -> bool {
        !self.leq(other) && !other.leq(self)
    }
}

impl Default for Stamp {
    fn default() -> Self {
        Self::seed()
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.id, self.event)
    }
}

/// Raise every owned part of `event` as far as the history already
/// justifies, without inventing a new event.
fn fill(id: &Id, event: &Event) -> Event {
    match (id, event) {
        (Id::Zero, _) | (Id::Node(..), Event::Leaf(_)) => event.clone(),
        (Id::One, _) => Event::leaf(event.max()),
        (Id::Node(il, ir), Event::Node(n, el, er)) => {
            if il.is_one() {
                let right = fill(ir, er);
                let left = Event::leaf(el.max().max(right.min()));
                Event::collapse(*n, left, right)
            } else if ir.is_one() {
                let left = fill(il, el);
                let right = Event::leaf(er.max().max(left.min()));
                Event::collapse(*n, left, right)
            } else {
                Event::collapse(*n, fill(il, el), fill(ir, er))
            }
        }
    }
}

/// Price of a grow path.
///
/// Ordered lexicographically: any path that avoids turning a leaf into a
/// node beats every path that does, then shallower beats deeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct GrowCost {
    expansions: u32,
    depth: u32,
}

impl GrowCost {
    const FREE: Self = Self {
        expansions: 0,
        depth: 0,
    };

    const fn descend(self) -> Self {
        Self {
            expansions: self.expansions,
            depth: self.depth + 1,
        }
    }

    const fn expand(self) -> Self {
        Self {
            expansions: self.expansions + 1,
            depth: self.depth,
        }
    }
}

type Grown = Option<(Event, GrowCost)>;

/// Increment one owned position of `event`, picking the cheapest.
///
/// `base` is the sum of the values above `event`. Returns `Ok(None)` when
/// `id` owns nothing. Positions already at `u32::MAX` are skipped; if no
/// other owned position remains the result is
/// [`ClockError::CounterOverflow`]. The grown tree may need normalization.
fn grow(id: &Id, event: &Event, base: u32) -> Result<Grown, ClockError> {
    match (id, event) {
        (Id::Zero, _) => Ok(None),
        (Id::One, Event::Leaf(n)) => {
            let next = base.checked_add(*n).and_then(|count| count.checked_add(1));
            if next.is_none() {
                return Err(ClockError::CounterOverflow);
            }
            Ok(Some((Event::leaf(n + 1), GrowCost::FREE)))
        }
        (Id::Node(..), Event::Leaf(n)) => Ok(grow(id, &Event::expanded(*n), base)?
            .map(|(grown, cost)| (grown, cost.expand()))),
        (Id::One, Event::Node(n, el, er)) => grow_halves(&Id::One, &Id::One, *n, el, er, base),
        (Id::Node(il, ir), Event::Node(n, el, er)) => grow_halves(il, ir, *n, el, er, base),
    }
}

fn grow_halves(
    il: &Id,
    ir: &Id,
    value: u32,
    el: &Arc<Event>,
    er: &Arc<Event>,
    base: u32,
) -> Result<Grown, ClockError> {
    let below = base.checked_add(value).ok_or(ClockError::CounterOverflow)?;
    let grow_left = || {
        grow(il, el, below).map(|grown| {
            grown.map(|(left, cost)| {
                (Event::Node(value, Arc::new(left), Arc::clone(er)), cost.descend())
            })
        })
    };
    let grow_right = || {
        grow(ir, er, below).map(|grown| {
            grown.map(|(right, cost)| {
                (Event::Node(value, Arc::clone(el), Arc::new(right)), cost.descend())
            })
        })
    };

    if il.is_zero() {
        return grow_right();
    }
    if ir.is_zero() {
        return grow_left();
    }
    match (grow_left(), grow_right()) {
        (Ok(Some(left)), Ok(Some(right))) => Ok(Some(if left.1 < right.1 { left } else { right })),
        (Ok(Some(found)), _) | (_, Ok(Some(found))) => Ok(Some(found)),
        (Err(err), _) | (_, Err(err)) => Err(err),
        (Ok(None), Ok(None)) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(ops: &str) -> Vec<Stamp> {
        // tiny driver: digits select a stamp, letters pick the operation
        let mut stamps = vec![Stamp::seed()];
        let bytes = ops.as_bytes();
        let mut idx = 0;
        while idx < bytes.len() {
            let op = bytes[idx];
            let target = usize::from(bytes[idx + 1] - b'0');
            match op {
                b'f' => {
                    let forked = stamps[target].fork().unwrap();
                    stamps.push(forked);
                }
                b'e' => stamps[target].event().unwrap(),
                b'j' => {
                    let source = usize::from(bytes[idx + 2] - b'0');
                    let other = stamps[source].clone();
                    stamps[target].join(other);
                    idx += 1;
                }
                _ => panic!("unknown op {op}"),
            }
            idx += 2;
        }
        stamps
    }

    // === seed / construction ================================================

    #[test]
    fn seed_is_one_zero() {
        let s = Stamp::seed();
        assert_eq!(s.to_string(), "(1, 0)");
        assert!(!s.is_anonymous());
        assert_eq!(Stamp::default(), s);
    }

    #[test]
    fn anonymous_is_zero_zero() {
        let s = Stamp::anonymous();
        assert_eq!(s.to_string(), "(0, 0)");
        assert!(s.is_anonymous());
    }

    #[test]
    fn new_normalizes_both_trees() {
        let id = Id::Node(Arc::new(Id::One), Arc::new(Id::One));
        let event = Event::Node(2, Arc::new(Event::leaf(1)), Arc::new(Event::leaf(1)));
        let s = Stamp::new(id, event).unwrap();
        assert_eq!(s.id(), &Id::One);
        assert_eq!(s.history(), &Event::leaf(3));
        assert_eq!(s.into_parts(), (Id::One, Event::leaf(3)));
    }

    // === fork ===============================================================

    #[test]
    fn fork_seed_gives_halves() {
        let mut a = Stamp::seed();
        let b = a.fork().unwrap();
        assert_eq!(a.to_string(), "((1, 0), 0)");
        assert_eq!(b.to_string(), "((0, 1), 0)");
        assert!(a.leq(&b) && b.leq(&a));
        assert!(!a.id().intersects(b.id()));
        assert_eq!(a.id().sum(b.id()), Id::One);
    }

    #[test]
    fn fork_anonymous_gives_anonymous() {
        let mut a = Stamp::anonymous();
        let b = a.fork().unwrap();
        assert!(a.is_anonymous());
        assert!(b.is_anonymous());
    }

    #[test]
    fn fork_rejects_unnormalized_identity() {
        let mut bad = Stamp {
            id: Id::Node(Arc::new(Id::Zero), Arc::new(Id::Zero)),
            event: Event::zero(),
        };
        assert!(matches!(bad.fork(), Err(ClockError::InvalidSplit { .. })));
    }

    #[test]
    fn forked_histories_are_isolated() {
        let mut a = Stamp::seed();
        let b = a.fork().unwrap();
        a.event().unwrap();
        assert_eq!(b.history(), &Event::zero());
        assert!(b.leq(&a));
        assert!(!a.leq(&b));
    }

    // === event ==============================================================

    #[test]
    fn event_on_seed_increments_leaf() {
        let mut s = Stamp::seed();
        s.event().unwrap();
        s.event().unwrap();
        assert_eq!(s.to_string(), "(1, 2)");
    }

    #[test]
    fn event_on_half_grows_owned_side() {
        let stamps = run("f0e0");
        assert_eq!(stamps[0].to_string(), "((1, 0), (0, 1, 0))");
    }

    #[test]
    fn event_prefers_growth_over_expansion() {
        let stamps = run("f0e1e1");
        assert_eq!(stamps[1].to_string(), "((0, 1), (0, 0, 2))");
    }

    #[test]
    fn event_fills_before_growing() {
        // owner of the left half catches up with the right half's max
        let mut s = Stamp::new(
            Id::node(Id::one(), Id::zero()),
            Event::node(1, Event::node(0, Event::leaf(1), Event::leaf(0)).unwrap(), Event::leaf(1))
                .unwrap(),
        )
        .unwrap();
        s.event().unwrap();
        assert_eq!(s.to_string(), "((1, 0), 2)");
    }

    #[test]
    fn event_on_anonymous_is_noop() {
        let mut s = Stamp::seed();
        s.event().unwrap();
        let mut observer = s.peek();
        observer.event().unwrap();
        assert_eq!(observer.history(), s.history());
    }

    #[test]
    fn event_on_full_identity_with_node_history_collapses() {
        let mut s =
            Stamp::new(Id::one(), Event::node(0, Event::leaf(0), Event::leaf(3)).unwrap()).unwrap();
        s.event().unwrap();
        assert_eq!(s.history(), &Event::leaf(3));
        s.event().unwrap();
        assert_eq!(s.history(), &Event::leaf(4));
    }

    #[test]
    fn grow_ties_favor_right() {
        let (grown, cost) = grow(&Id::one(), &Event::expanded(0), 0).unwrap().unwrap();
        assert_eq!(cost, GrowCost { expansions: 0, depth: 1 });
        assert_eq!(grown.normalize().to_string(), "(0, 0, 1)");
    }

    #[test]
    fn grow_cost_orders_expansions_first() {
        let deep = GrowCost {
            expansions: 0,
            depth: 1_000_000,
        };
        let expanded = GrowCost {
            expansions: 1,
            depth: 0,
        };
        assert!(deep < expanded);
    }

    #[test]
    fn grow_without_ownership_is_none() {
        assert_eq!(grow(&Id::zero(), &Event::leaf(3), 0), Ok(None));
    }

    #[test]
    fn grow_counts_values_above_the_leaf() {
        assert_eq!(
            grow(&Id::one(), &Event::leaf(1), u32::MAX - 1),
            Err(ClockError::CounterOverflow)
        );
        assert!(grow(&Id::one(), &Event::leaf(1), u32::MAX - 2).unwrap().is_some());
    }

    // === counter ceiling ====================================================

    #[test]
    fn new_rejects_counts_past_u32() {
        let event = Event::Node(u32::MAX, Arc::new(Event::leaf(1)), Arc::new(Event::leaf(0)));
        assert_eq!(Stamp::new(Id::one(), event), Err(ClockError::CounterOverflow));
    }

    #[test]
    fn event_at_counter_ceiling_is_an_error() {
        let mut s = Stamp::new(Id::one(), Event::leaf(u32::MAX)).unwrap();
        let before = s.clone();
        assert_eq!(s.event(), Err(ClockError::CounterOverflow));
        assert_eq!(s, before);
    }

    #[test]
    fn event_reaching_ceiling_then_stops() {
        let mut s = Stamp::new(Id::one(), Event::leaf(u32::MAX - 1)).unwrap();
        s.event().unwrap();
        assert_eq!(s.history(), &Event::leaf(u32::MAX));
        assert!(s.event().is_err());
        assert_eq!(s.history(), &Event::leaf(u32::MAX));
    }

    #[test]
    fn event_skips_saturated_positions() {
        // the left leaf is cheaper but full, so the right half grows
        let history = Event::node(
            0,
            Event::leaf(u32::MAX),
            Event::node(0, Event::leaf(0), Event::leaf(5)).unwrap(),
        )
        .unwrap();
        let id = Id::node(Id::one(), Id::node(Id::zero(), Id::one()));
        let mut s = Stamp::new(id, history).unwrap();
        s.event().unwrap();
        assert_eq!(s.history().to_string(), "(0, 4294967295, (0, 0, 6))");
    }

    #[test]
    fn event_fails_when_every_owned_position_is_saturated() {
        let history = Event::node(0, Event::leaf(u32::MAX), Event::leaf(3)).unwrap();
        let mut s = Stamp::new(Id::node(Id::one(), Id::zero()), history).unwrap();
        let before = s.clone();
        assert_eq!(s.event(), Err(ClockError::CounterOverflow));
        assert_eq!(s, before);
    }

    // === serde ==============================================================

    #[test]
    fn deserialize_normalizes_trees() {
        let json = r#"{"id":{"Node":["Zero","One"]},"event":{"Node":[0,{"Node":[0,{"Leaf":3},{"Leaf":4}]},{"Leaf":0}]}}"#;
        let mut s: Stamp = serde_json::from_str(json).unwrap();
        assert_eq!(s.to_string(), "((0, 1), (0, (3, 0, 1), 0))");
        s.event().unwrap();
        assert_eq!(s.to_string(), "((0, 1), (3, (0, 0, 1), 0))");
    }

    #[test]
    fn deserialize_rejects_counts_past_u32() {
        let json = r#"{"id":"One","event":{"Node":[4294967295,{"Leaf":1},{"Leaf":0}]}}"#;
        let err = serde_json::from_str::<Stamp>(json).unwrap_err();
        assert!(err.to_string().contains("exceeds u32::MAX"));
    }

    // === join ===============================================================

    #[test]
    fn join_recovers_seed_identity() {
        let mut a = Stamp::seed();
        let b = a.fork().unwrap();
        a.join(b);
        assert_eq!(a, Stamp::seed());
    }

    #[test]
    fn join_disjoint_halves_keeps_history() {
        let mut a = Stamp::new(Id::node(Id::one(), Id::zero()), Event::zero()).unwrap();
        let b = Stamp::new(
            Id::node(Id::zero(), Id::one()),
            Event::node(0, Event::leaf(1), Event::leaf(0)).unwrap(),
        )
        .unwrap();
        a.join(b);
        assert_eq!(a.to_string(), "(1, (0, 1, 0))");
    }

    #[test]
    fn join_dominates_both_inputs() {
        let stamps = run("f0e0e1e1");
        let mut merged = stamps[0].clone();
        merged.join(stamps[1].clone());
        assert!(stamps[0].leq(&merged));
        assert!(stamps[1].leq(&merged));
        assert_eq!(merged.id(), &Id::One);
    }

    // === peek ===============================================================

    #[test]
    fn peek_is_anonymous_copy_of_history() {
        let mut s = Stamp::seed();
        s.event().unwrap();
        let p = s.peek();
        assert!(p.is_anonymous());
        assert_eq!(p.history(), s.history());
        s.event().unwrap();
        assert_eq!(p.history(), &Event::leaf(1));
    }

    // === leq / concurrent ===================================================

    #[test]
    fn concurrent_after_independent_events() {
        let stamps = run("f0e0e1");
        assert!(stamps[0].concurrent(&stamps[1]));
        assert!(stamps[1].concurrent(&stamps[0]));
        assert!(!stamps[0].concurrent(&stamps[0]));
    }

    // === display ============================================================

    #[test]
    fn display_matches_structural_form() {
        let stamps = run("f0e0");
        assert_eq!(format!("{}", stamps[0]), "((1, 0), (0, 1, 0))");
    }

    // === laws ===============================================================

    fn arb_trace() -> impl Strategy<Value = Vec<(u8, usize, usize)>> {
        prop::collection::vec((0u8..3, 0usize..8, 0usize..8), 0..40)
    }

    fn replay(trace: &[(u8, usize, usize)]) -> Vec<Stamp> {
        let mut stamps = vec![Stamp::seed()];
        for (op, a, b) in trace {
            let a = a % stamps.len();
            match op {
                0 => {
                    let forked = stamps[a].fork().unwrap();
                    stamps.push(forked);
                }
                1 => stamps[a].event().unwrap(),
                _ => {
                    let b = b % stamps.len();
                    if a != b && stamps.len() > 1 {
                        let other = stamps.remove(b);
                        let a = if b < a { a - 1 } else { a };
                        stamps[a].join(other);
                    }
                }
            }
        }
        stamps
    }

    proptest! {
        #[test]
        fn event_strictly_advances_owned_stamps(trace in arb_trace(), pick in 0usize..8) {
            let mut stamps = replay(&trace);
            let idx = pick % stamps.len();
            let before = stamps[idx].clone();
            stamps[idx].event().unwrap();
            prop_assert!(before.leq(&stamps[idx]));
            prop_assert!(!stamps[idx].leq(&before));
        }

        #[test]
        fn identities_stay_disjoint_and_cover(trace in arb_trace()) {
            let stamps = replay(&trace);
            let mut total = Id::zero();
            for (i, a) in stamps.iter().enumerate() {
                for b in &stamps[i + 1..] {
                    prop_assert!(!a.id().intersects(b.id()));
                }
                total = total.sum(a.id());
            }
            prop_assert_eq!(total, Id::One);
        }

        #[test]
        fn operations_keep_normal_form(trace in arb_trace()) {
            for s in replay(&trace) {
                prop_assert_eq!(&s.id().normalize(), s.id());
                prop_assert_eq!(&s.history().normalize(), s.history());
            }
        }

        #[test]
        fn fork_is_causally_equal(trace in arb_trace(), pick in 0usize..8) {
            let mut stamps = replay(&trace);
            let idx = pick % stamps.len();
            let original = stamps[idx].id().clone();
            let forked = stamps[idx].fork().unwrap();
            prop_assert!(forked.leq(&stamps[idx]) && stamps[idx].leq(&forked));
            prop_assert_eq!(stamps[idx].id().sum(forked.id()), original);
        }
    }
}
