//! The DOF aggregation map: per-DOF accumulation of weighted quantities over the mortar
//! segment mesh.

use crate::fields::DofObject;
use crate::Real;
use mortar_dual::Dual;
use rustc_hash::FxHashMap;

/// A per-DOF accumulation record.
///
/// Aggregates start from their `Default` (zero) value on first touch and are built up
/// monotonically by summation over all mortar segments touching the DOF within one
/// pass. `merge` combines the contributions of two disjoint segment subsets.
pub trait Aggregate: Default + Clone + Send {
    fn merge(&mut self, other: Self);
}

/// The weighted-gap accumulation record of the normal contact constraint: the
/// AD-tracked weighted gap plus the (plain) normalization accumulator used when the
/// constraint scale is area-normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedGap<T> {
    pub gap: Dual<T>,
    pub normalization: T,
}

impl<T: Real> Default for WeightedGap<T> {
    fn default() -> Self {
        Self {
            gap: Dual::constant(T::zero()),
            normalization: T::zero(),
        }
    }
}

impl<T: Real + Send> Aggregate for WeightedGap<T> {
    fn merge(&mut self, other: Self) {
        self.gap += other.gap;
        self.normalization += other.normalization;
    }
}

/// The accumulation record of the frictional contact constraint: the normal contact
/// aggregates plus the AD-tracked weighted relative tangential velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionalAggregates<T> {
    pub contact: WeightedGap<T>,
    pub tangential_velocity: Dual<T>,
}

impl<T: Real> Default for FrictionalAggregates<T> {
    fn default() -> Self {
        Self {
            contact: WeightedGap::default(),
            tangential_velocity: Dual::constant(T::zero()),
        }
    }
}

impl<T: Real + Send> Aggregate for FrictionalAggregates<T> {
    fn merge(&mut self, other: Self) {
        self.contact.merge(other.contact);
        self.tangential_velocity += other.tangential_velocity;
    }
}

/// Maps each touched DOF to its accumulated aggregate within one assembly pass.
///
/// The map is pass-scoped: a fresh (or [`clear`](DofAggregateMap::clear)ed) map is used
/// for every residual or Jacobian evaluation. DOFs not touched by any segment have no
/// entry. Iteration order of [`entries`](DofAggregateMap::entries) is unspecified;
/// enforcement must not depend on it, and the driver uses
/// [`sorted_entries`](DofAggregateMap::sorted_entries) for reproducibility.
#[derive(Debug, Clone)]
pub struct DofAggregateMap<A> {
    entries: FxHashMap<DofObject, A>,
}

impl<A> Default for DofAggregateMap<A> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<A: Aggregate> DofAggregateMap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties all entries. Called at the start of every evaluation pass; a Jacobian
    /// pass clears exactly like a residual pass.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The aggregate for `dof`, zero-initialized on first touch.
    pub fn entry(&mut self, dof: DofObject) -> &mut A {
        self.entries.entry(dof).or_default()
    }

    pub fn get(&self, dof: DofObject) -> Option<&A> {
        self.entries.get(&dof)
    }

    /// All (DOF, aggregate) pairs, in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (DofObject, &A)> {
        self.entries.iter().map(|(&dof, aggregate)| (dof, aggregate))
    }

    /// All (DOF, aggregate) pairs, sorted by DOF.
    pub fn sorted_entries(&self) -> Vec<(DofObject, &A)> {
        let mut entries: Vec<_> = self.entries().collect();
        entries.sort_unstable_by_key(|&(dof, _)| dof);
        entries
    }

    /// Merges another map into this one, combining aggregates for shared DOFs.
    ///
    /// The other map's entries are drained in sorted-by-DOF order so that repeated
    /// reductions over the same operands are reproducible.
    pub fn merge(&mut self, other: Self) {
        let mut incoming: Vec<_> = other.entries.into_iter().collect();
        incoming.sort_unstable_by_key(|&(dof, _)| dof);
        for (dof, aggregate) in incoming {
            self.entry(dof).merge(aggregate);
        }
    }
}
