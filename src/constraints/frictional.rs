//! Coulomb frictional contact via a primal-dual active set strategy.

use crate::assembly::sink::dispatch_residual;
use crate::assembly::{AssemblySink, AssemblyTags, DofAggregateMap, FrictionalAggregates, PassKind};
use crate::constraints::weighted_gap::{accumulate_gap_segment, WeightedGapConstraint};
use crate::constraints::{ContactParameters, MortarConstraint};
use crate::fields::{
    DisplacementField, DofObject, MultiplierSpace, Side, SolutionAccess, VelocityField,
};
use crate::segment::{MortarSegment, SegmentationOptions};
use crate::Real;
use eyre::{bail, ensure};
use mortar_dual::{Dual, SparseDerivatives};
use nalgebra::Scalar;

/// Frictional mortar contact: enforces the normal zero-penetration condition together
/// with a Coulomb friction law on a second, tangential multiplier field.
///
/// The friction law is the primal-dual active set strategy of the weighted-gap
/// formulation: below the activation pressure the tangential multiplier itself is the
/// residual; in contact, the residual is
/// `max(mu (p + c g), |lt + c_t v dt|) lt - mu max(0, p + c g) (lt + c_t v dt)`.
pub struct FrictionalContactConstraint<'a, T: Scalar> {
    normal: WeightedGapConstraint<'a, T>,
    velocity: &'a dyn VelocityField<T>,
    friction_multiplier: &'a dyn MultiplierSpace,
    dt: T,
}

impl<'a, T: Real> FrictionalContactConstraint<'a, T> {
    /// Constructs the constraint, eagerly validating parameters and configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        params: ContactParameters<T>,
        options: &SegmentationOptions<T>,
        tags: AssemblyTags,
        displacement: &'a dyn DisplacementField<T>,
        multiplier: &'a dyn MultiplierSpace,
        velocity: &'a dyn VelocityField<T>,
        friction_multiplier: &'a dyn MultiplierSpace,
        dt: T,
    ) -> eyre::Result<Self> {
        ensure!(
            params.friction_mu > T::zero(),
            "'friction_mu' must be strictly positive for frictional contact"
        );
        ensure!(dt > T::zero(), "'dt' must be strictly positive");
        if !friction_multiplier.is_nodal() && friction_multiplier.order() != 0 {
            bail!("elemental multiplier variables must be of constant order for contact constraints");
        }
        ensure!(
            multiplier.is_nodal() == friction_multiplier.is_nodal(),
            "the normal and frictional multiplier variables must share their layout \
             (both nodal or both elemental)"
        );
        let normal = WeightedGapConstraint::new(params, options, tags, displacement, multiplier)?;
        Ok(Self {
            normal,
            velocity,
            friction_multiplier,
            dt,
        })
    }

    pub fn params(&self) -> &ContactParameters<T> {
        self.normal.params()
    }

    /// The relative tangential velocity at one quadrature point, weighted by the
    /// integration weight. Velocity derivatives are taken with respect to the
    /// displacement DOFs, scaled by the time integrator's `du_dot_du` factor.
    fn weighted_tangential_velocity(&self, segment: &MortarSegment<T>, qp: usize) -> Dual<T> {
        let du_dot_du = self.velocity.du_dot_du();
        let tangent = segment.tangents[qp];
        let mut relative = [Dual::constant(T::zero()), Dual::constant(T::zero())];
        for component in 0..2 {
            let mut value = T::zero();
            let mut entries = Vec::with_capacity(4);
            for (local, &node) in segment.secondary_nodes.iter().enumerate() {
                let phi = segment.trial_secondary[qp][local];
                value += phi * self.velocity.value(Side::Secondary, node, component);
                entries.push((
                    self.normal.displacement.dof(Side::Secondary, node, component),
                    phi * du_dot_du,
                ));
            }
            for (local, &node) in segment.primary_nodes.iter().enumerate() {
                let phi = segment.trial_primary[qp][local];
                value -= phi * self.velocity.value(Side::Primary, node, component);
                entries.push((
                    self.normal.displacement.dof(Side::Primary, node, component),
                    -phi * du_dot_du,
                ));
            }
            relative[component] = Dual::from_parts(value, SparseDerivatives::from_entries(entries));
        }
        (relative[0].clone() * tangent.x + relative[1].clone() * tangent.y) * segment.weights[qp]
    }
}

impl<'a, T: Real + Send + Sync> MortarConstraint<T> for FrictionalContactConstraint<'a, T> {
    type Aggregate = FrictionalAggregates<T>;

    fn accumulate_segment(
        &self,
        segment: &MortarSegment<T>,
        map: &mut DofAggregateMap<Self::Aggregate>,
    ) {
        accumulate_gap_segment(&self.normal, segment, map, |aggregate| {
            &mut aggregate.contact
        });

        for qp in 0..segment.num_quadrature_points() {
            let qp_velocity = self.weighted_tangential_velocity(segment, qp);
            if self.friction_multiplier.is_nodal() {
                for i in 0..2 {
                    let test = segment.test[qp][i];
                    let entry = map.entry(DofObject::Node(segment.secondary_nodes[i]));
                    entry.tangential_velocity += qp_velocity.clone() * test;
                }
            } else {
                let entry = map.entry(DofObject::Element(segment.secondary_face));
                entry.tangential_velocity += qp_velocity.clone();
            }
        }
    }

    fn enforce(
        &self,
        dof: DofObject,
        aggregate: &Self::Aggregate,
        solution: &dyn SolutionAccess<T>,
        sink: &mut dyn AssemblySink<T>,
        pass: PassKind,
    ) -> eyre::Result<()> {
        // The normal complementarity condition is enforced unchanged.
        self.normal
            .enforce(dof, &aggregate.contact, solution, sink, pass)?;

        let params = self.normal.params();
        let friction_index = self.friction_multiplier.dof(dof);
        let friction_lm = Dual::variable(solution.value(friction_index), friction_index);

        let normal_index = self.normal.multiplier().dof(dof);
        let pressure = Dual::variable(solution.value(normal_index), normal_index);

        let residual = if pressure.value() < params.activation_epsilon {
            friction_lm
        } else {
            let c = self.normal.effective_scale(params.c, &aggregate.contact)?;
            let c_t = self.normal.effective_scale(params.c_t, &aggregate.contact)?;
            let slip = friction_lm.clone()
                + aggregate.tangential_velocity.clone() * (c_t * self.dt);
            let capacity =
                (pressure + aggregate.contact.gap.clone() * c) * params.friction_mu;
            let term_1 = capacity.max(&slip.abs()) * friction_lm;
            let term_2 = capacity.max(&Dual::constant(T::zero())) * slip;
            term_1 - term_2
        };

        dispatch_residual(sink, &residual, friction_index, self.normal.tags(), pass);
        Ok(())
    }
}
