//! The mortar assembly driver.
//!
//! One pass runs the state machine
//! `IDLE -> ACCUMULATING (per quadrature point) -> ENFORCING (per DOF) -> IDLE`:
//! a fresh, pass-scoped [`DofAggregateMap`] is filled by visiting every mortar segment,
//! then each entry is enforced exactly once. The same pass runs for residual and
//! Jacobian evaluations alike; only the sink extraction differs.

use crate::assembly::sink::dispatch_residual;
use crate::assembly::{AssemblySink, AssemblyTags, DofAggregateMap, PassKind};
use crate::constraints::MortarConstraint;
use crate::fields::{DofObject, MultiplierSpace, SolutionAccess};
use crate::segment::MortarSegmentMesh;
use crate::Real;
use mortar_dual::Dual;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

/// The ACCUMULATING phase: visits every mortar segment and accumulates its
/// per-quadrature-point contributions into the map.
///
/// The caller owns the map so that the phases can be composed and tested separately;
/// note that accumulating twice without clearing doubles every aggregate.
pub fn accumulate_pass<T, C>(
    segments: &MortarSegmentMesh<T>,
    constraint: &C,
    map: &mut DofAggregateMap<C::Aggregate>,
) where
    T: Real,
    C: MortarConstraint<T> + ?Sized,
{
    for segment in segments.segments() {
        constraint.accumulate_segment(segment, map);
    }
}

/// Parallel ACCUMULATING phase.
///
/// Segments are processed in chunks, each chunk accumulating into a private map; the
/// chunk maps are then merged into `map` in chunk order, sorted by DOF within each
/// merge. The result matches the serial phase up to floating-point summation
/// reordering.
pub fn par_accumulate_pass<T, C>(
    segments: &MortarSegmentMesh<T>,
    constraint: &C,
    map: &mut DofAggregateMap<C::Aggregate>,
    chunk_size: usize,
) where
    T: Real + Send + Sync,
    C: MortarConstraint<T> + ?Sized,
{
    assert!(chunk_size >= 1, "chunk size must be positive");
    let chunk_maps: Vec<_> = segments
        .segments()
        .par_chunks(chunk_size)
        .map(|chunk| {
            let mut local = DofAggregateMap::new();
            for segment in chunk {
                constraint.accumulate_segment(segment, &mut local);
            }
            local
        })
        .collect();
    for chunk_map in chunk_maps {
        map.merge(chunk_map);
    }
}

/// The ENFORCING phase: evaluates the constraint for every aggregated DOF and hands the
/// resulting residual defect to the sink.
///
/// DOFs in the `inactive` set are skipped entirely, leaving their multiplier
/// unconstrained by this pass; their aggregates remain in the map so that they can
/// reactivate in a later nonlinear iteration.
pub fn enforce_pass<T, C>(
    map: &DofAggregateMap<C::Aggregate>,
    constraint: &C,
    solution: &dyn SolutionAccess<T>,
    sink: &mut dyn AssemblySink<T>,
    pass: PassKind,
    inactive: Option<&FxHashSet<DofObject>>,
) -> eyre::Result<()>
where
    T: Real,
    C: MortarConstraint<T> + ?Sized,
{
    for (dof, aggregate) in map.sorted_entries() {
        if let Some(inactive) = inactive {
            if inactive.contains(&dof) {
                continue;
            }
        }
        constraint.enforce(dof, aggregate, solution, sink, pass)?;
    }
    Ok(())
}

/// Runs one complete assembly pass: fresh map, ACCUMULATING, ENFORCING.
pub fn assemble_mortar_pass<T, C>(
    segments: &MortarSegmentMesh<T>,
    constraint: &C,
    solution: &dyn SolutionAccess<T>,
    sink: &mut dyn AssemblySink<T>,
    pass: PassKind,
    inactive: Option<&FxHashSet<DofObject>>,
) -> eyre::Result<()>
where
    T: Real,
    C: MortarConstraint<T> + ?Sized,
{
    let mut map = DofAggregateMap::new();
    accumulate_pass(segments, constraint, &mut map);
    enforce_pass(&map, constraint, solution, sink, pass, inactive)
}

/// Runs one complete assembly pass with parallel accumulation.
pub fn par_assemble_mortar_pass<T, C>(
    segments: &MortarSegmentMesh<T>,
    constraint: &C,
    solution: &dyn SolutionAccess<T>,
    sink: &mut dyn AssemblySink<T>,
    pass: PassKind,
    inactive: Option<&FxHashSet<DofObject>>,
    chunk_size: usize,
) -> eyre::Result<()>
where
    T: Real + Send + Sync,
    C: MortarConstraint<T> + ?Sized,
{
    let mut map = DofAggregateMap::new();
    par_accumulate_pass(segments, constraint, &mut map, chunk_size);
    enforce_pass(&map, constraint, solution, sink, pass, inactive)
}

/// Pins every inactive multiplier to zero by emitting `residual = multiplier_value`
/// (with its unit derivative on the Jacobian pass), so that multipliers released from
/// the constraint do not leave singular rows in the global system.
pub fn zero_inactive_multipliers<T: Real>(
    inactive: &FxHashSet<DofObject>,
    multiplier: &dyn MultiplierSpace,
    solution: &dyn SolutionAccess<T>,
    sink: &mut dyn AssemblySink<T>,
    tags: &AssemblyTags,
    pass: PassKind,
) {
    let mut dofs: Vec<_> = inactive.iter().copied().collect();
    dofs.sort_unstable();
    for dof in dofs {
        let index = multiplier.dof(dof);
        let residual = Dual::variable(solution.value(index), index);
        dispatch_residual(sink, &residual, index, tags, pass);
    }
}
