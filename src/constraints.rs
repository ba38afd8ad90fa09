//! Mortar constraint evaluators.
//!
//! A constraint participates in the two-phase protocol through [`MortarConstraint`]:
//! the property pass accumulates per-quadrature-point quantities into the DOF
//! aggregation map, and the enforcement phase turns each DOF's aggregate into a
//! residual defect for that DOF's multiplier equation.

use crate::assembly::{Aggregate, AssemblySink, DofAggregateMap, PassKind};
use crate::fields::{DofObject, SolutionAccess};
use crate::segment::MortarSegment;
use crate::Real;
use eyre::ensure;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

mod frictional;
mod weighted_gap;

pub use frictional::*;
pub use weighted_gap::*;

/// A constraint enforced over a mortar interface.
///
/// Both phases are driven externally (see [`crate::assembly::global`]); implementations
/// are stateless with respect to the pass and carry only configuration and injected
/// capabilities.
pub trait MortarConstraint<T: Real>: Sync {
    type Aggregate: Aggregate;

    /// The property pass: accumulates this segment's quadrature-point contributions
    /// into the map, keyed by the DOF of the active test function.
    fn accumulate_segment(
        &self,
        segment: &MortarSegment<T>,
        map: &mut DofAggregateMap<Self::Aggregate>,
    );

    /// The enforcement phase: computes the residual defect of the multiplier equation
    /// for one DOF and hands it to the sink.
    fn enforce(
        &self,
        dof: DofObject,
        aggregate: &Self::Aggregate,
        solution: &dyn SolutionAccess<T>,
        sink: &mut dyn AssemblySink<T>,
        pass: PassKind,
    ) -> eyre::Result<()>;
}

/// Numerical parameters of the contact constraints, fixed at construction.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactParameters<T> {
    /// Parameter balancing the size of the gap against the contact pressure.
    pub c: T,
    /// Counterpart of `c` for the tangential (frictional) constraint.
    pub c_t: T,
    /// Whether to normalize `c` (and `c_t`) by the accumulated weighting function norm.
    /// Without normalization the effective value of `c` depends on element size, since
    /// nodal multiplier values are compared against integrated gap values.
    pub normalize_c: bool,
    /// Coulomb friction coefficient.
    pub friction_mu: T,
    /// Minimum contact pressure that triggers frictional enforcement.
    pub activation_epsilon: T,
}

impl<T: Real> Default for ContactParameters<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            c: 1e6,
            c_t: 1.0,
            normalize_c: false,
            friction_mu: 0.0,
            activation_epsilon: 1e-7,
        }
    }
}

impl<T: Real> ContactParameters<T> {
    /// Validates the parameter set, reporting the offending parameter on failure.
    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(self.c > T::zero(), "'c' must be strictly positive");
        ensure!(self.c_t > T::zero(), "'c_t' must be strictly positive");
        ensure!(
            self.friction_mu >= T::zero(),
            "'friction_mu' must be nonnegative"
        );
        ensure!(
            self.activation_epsilon > T::zero(),
            "'activation_epsilon' must be strictly positive"
        );
        Ok(())
    }
}
