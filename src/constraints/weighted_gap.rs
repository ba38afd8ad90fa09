//! The zero-penetration normal contact constraint.

use crate::assembly::sink::dispatch_residual;
use crate::assembly::{
    Aggregate, AssemblySink, AssemblyTags, DofAggregateMap, PassKind, WeightedGap,
};
use crate::constraints::{ContactParameters, MortarConstraint};
use crate::fields::{DisplacementField, DofObject, MultiplierSpace, Side, SolutionAccess};
use crate::segment::{MortarSegment, SegmentationOptions};
use crate::Real;
use eyre::{bail, ensure};
use mortar_dual::{Dual, SparseDerivatives};
use nalgebra::Scalar;

/// Accumulates the weighted gap over the mortar segment mesh and enforces the
/// zero-penetration complementarity condition
/// `residual = min(lambda, c_eff * weighted_gap)` on each multiplier DOF.
pub struct WeightedGapConstraint<'a, T: Scalar> {
    pub(crate) params: ContactParameters<T>,
    pub(crate) tags: AssemblyTags,
    pub(crate) interpolate_normals: bool,
    pub(crate) displacement: &'a dyn DisplacementField<T>,
    pub(crate) multiplier: &'a dyn MultiplierSpace,
}

impl<'a, T: Real> WeightedGapConstraint<'a, T> {
    /// Constructs the constraint, eagerly validating parameters and configuration.
    pub fn new(
        params: ContactParameters<T>,
        options: &SegmentationOptions<T>,
        tags: AssemblyTags,
        displacement: &'a dyn DisplacementField<T>,
        multiplier: &'a dyn MultiplierSpace,
    ) -> eyre::Result<Self> {
        params.validate()?;
        options.validate()?;
        ensure!(
            options.displaced,
            "'displaced' must be enabled for contact constraints: \
             the gap is measured in the current configuration"
        );
        if !multiplier.is_nodal() && multiplier.order() != 0 {
            bail!("elemental multiplier variables must be of constant order for contact constraints");
        }
        Ok(Self {
            params,
            tags,
            interpolate_normals: options.interpolate_normals,
            displacement,
            multiplier,
        })
    }

    pub fn params(&self) -> &ContactParameters<T> {
        &self.params
    }

    pub fn tags(&self) -> &AssemblyTags {
        &self.tags
    }

    pub fn multiplier(&self) -> &dyn MultiplierSpace {
        self.multiplier
    }

    /// The effective constraint scale for one DOF: `scale / normalization` when
    /// normalizing, else `scale` unchanged.
    pub(crate) fn effective_scale(&self, scale: T, aggregate: &WeightedGap<T>) -> eyre::Result<T> {
        if self.params.normalize_c {
            ensure!(
                aggregate.normalization > T::zero(),
                "weighting function normalization must be strictly positive; \
                 encountered a DOF whose accumulated measure is not"
            );
            Ok(scale / aggregate.normalization)
        } else {
            Ok(scale)
        }
    }

    pub(crate) fn multiplier_residual(
        &self,
        dof: DofObject,
        aggregate: &WeightedGap<T>,
        solution: &dyn SolutionAccess<T>,
    ) -> eyre::Result<Dual<T>> {
        let c_effective = self.effective_scale(self.params.c, aggregate)?;
        let index = self.multiplier.dof(dof);
        // The live multiplier value depends directly and linearly on its own unknown;
        // `min` then selects the active branch at the current iterate.
        let lm = Dual::variable(solution.value(index), index);
        Ok(lm.min(&(aggregate.gap.clone() * c_effective)))
    }
}

/// The relative displacement gap vector at one quadrature point, with derivatives taken
/// from the displacement DOFs on both sides (positive on the primary side, negative on
/// the secondary side, weighted by the respective trial functions).
pub(crate) fn gap_vector_at_qp<T: Real>(
    segment: &MortarSegment<T>,
    qp: usize,
    displacement: &dyn DisplacementField<T>,
) -> [Dual<T>; 2] {
    let gap = segment.points_primary[qp] - segment.points_secondary[qp];
    let mut components = [Dual::constant(T::zero()), Dual::constant(T::zero())];
    for component in 0..2 {
        let mut entries = Vec::with_capacity(4);
        for (local, &node) in segment.primary_nodes.iter().enumerate() {
            entries.push((
                displacement.dof(Side::Primary, node, component),
                segment.trial_primary[qp][local],
            ));
        }
        for (local, &node) in segment.secondary_nodes.iter().enumerate() {
            entries.push((
                displacement.dof(Side::Secondary, node, component),
                -segment.trial_secondary[qp][local],
            ));
        }
        components[component] =
            Dual::from_parts(gap[component], SparseDerivatives::from_entries(entries));
    }
    components
}

/// Accumulates one segment's weighted-gap contributions into the map, with the contact
/// part of each entry selected by `contact_of`.
///
/// Factored out so that constraints embedding the weighted gap in a larger aggregate
/// (e.g. frictional contact) share the accumulation path.
pub(crate) fn accumulate_gap_segment<T, A, F>(
    constraint: &WeightedGapConstraint<T>,
    segment: &MortarSegment<T>,
    map: &mut DofAggregateMap<A>,
    mut contact_of: F,
) where
    T: Real,
    A: Aggregate,
    F: FnMut(&mut A) -> &mut WeightedGap<T>,
{
    for qp in 0..segment.num_quadrature_points() {
        let w = segment.weights[qp];
        let gap = gap_vector_at_qp(segment, qp, constraint.displacement);

        if constraint.multiplier.is_nodal() {
            for i in 0..2 {
                let normal = if constraint.interpolate_normals {
                    segment.normals[qp]
                } else {
                    segment.secondary_nodal_normals[i]
                };
                let qp_gap =
                    (gap[0].clone() * normal.x + gap[1].clone() * normal.y) * w;
                let test = segment.test[qp][i];
                let contact =
                    contact_of(map.entry(DofObject::Node(segment.secondary_nodes[i])));
                contact.gap += qp_gap * test;
                if constraint.params.normalize_c {
                    contact.normalization += w * test;
                }
            }
        } else {
            // Constant-order elemental multiplier: a single unit test function.
            let normal = segment.normals[qp];
            let qp_gap = (gap[0].clone() * normal.x + gap[1].clone() * normal.y) * w;
            let contact = contact_of(map.entry(DofObject::Element(segment.secondary_face)));
            contact.gap += qp_gap;
            if constraint.params.normalize_c {
                contact.normalization += w;
            }
        }
    }
}

impl<'a, T: Real + Send + Sync> MortarConstraint<T> for WeightedGapConstraint<'a, T> {
    type Aggregate = WeightedGap<T>;

    fn accumulate_segment(
        &self,
        segment: &MortarSegment<T>,
        map: &mut DofAggregateMap<Self::Aggregate>,
    ) {
        accumulate_gap_segment(self, segment, map, |aggregate| aggregate);
    }

    fn enforce(
        &self,
        dof: DofObject,
        aggregate: &Self::Aggregate,
        solution: &dyn SolutionAccess<T>,
        sink: &mut dyn AssemblySink<T>,
        pass: PassKind,
    ) -> eyre::Result<()> {
        let residual = self.multiplier_residual(dof, aggregate, solution)?;
        dispatch_residual(sink, &residual, self.multiplier.dof(dof), &self.tags, pass);
        Ok(())
    }
}
