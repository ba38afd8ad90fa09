//! Capabilities connecting the mortar assembly to the surrounding discretization.
//!
//! A constraint object does not inherit mesh or variable access; it is handed these
//! capabilities at construction and queries them during the pass.

use crate::Real;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Which side of the mortar interface a quantity lives on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Secondary,
    Primary,
}

/// An opaque handle for a DOF-carrying mesh entity on the secondary side of the
/// interface.
///
/// Nodal multiplier variables associate one unknown with each interface node; elemental
/// (constant-order) variables associate one unknown with each lower-dimensional face.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DofObject {
    Node(usize),
    Element(usize),
}

/// Access to the primal displacement field on both sides of the interface.
///
/// Components are indexed 0 (x) and 1 (y). The DOF index is the global index of the
/// corresponding unknown in the nonlinear system; it is what derivative entries are
/// keyed by.
pub trait DisplacementField<T>: Sync {
    /// Global DOF index of the given displacement component at an interface node.
    fn dof(&self, side: Side, node: usize, component: usize) -> usize;

    /// Current value of the given displacement component at an interface node.
    fn value(&self, side: Side, node: usize, component: usize) -> T;
}

/// Access to nodal velocities, for constraints involving rates (e.g. frictional slip).
pub trait VelocityField<T>: Sync {
    /// Current velocity component at an interface node.
    fn value(&self, side: Side, node: usize, component: usize) -> T;

    /// The time integrator's `d(u_dot)/du` factor, i.e. the derivative of the nodal
    /// velocity with respect to the nodal displacement unknown.
    fn du_dot_du(&self) -> T;
}

/// The Lagrange-multiplier variable's layout.
pub trait MultiplierSpace: Sync {
    /// Whether multiplier unknowns live on interface nodes (as opposed to faces).
    fn is_nodal(&self) -> bool;

    /// Approximation order of the multiplier variable. Elemental variables must be of
    /// order zero (constant).
    fn order(&self) -> usize;

    /// Global DOF index of the multiplier unknown attached to the given entity.
    fn dof(&self, object: DofObject) -> usize;
}

/// Read-only access to the current nonlinear iterate.
pub trait SolutionAccess<T>: Sync {
    fn value(&self, dof: usize) -> T;
}

impl<T: Real> SolutionAccess<T> for DVector<T> {
    fn value(&self, dof: usize) -> T {
        self[dof]
    }
}

impl<T: Real> SolutionAccess<T> for Vec<T> {
    fn value(&self, dof: usize) -> T {
        self[dof]
    }
}

/// A nodal multiplier space with one unknown per interface node, laid out contiguously
/// from `offset`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct NodalMultiplierSpace {
    pub offset: usize,
}

impl MultiplierSpace for NodalMultiplierSpace {
    fn is_nodal(&self) -> bool {
        true
    }

    fn order(&self) -> usize {
        1
    }

    fn dof(&self, object: DofObject) -> usize {
        match object {
            DofObject::Node(node) => self.offset + node,
            DofObject::Element(_) => {
                panic!("nodal multiplier space queried with an elemental DOF object")
            }
        }
    }
}

/// An elemental (constant-order) multiplier space with one unknown per secondary face,
/// laid out contiguously from `offset`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct ElementMultiplierSpace {
    pub offset: usize,
}

impl MultiplierSpace for ElementMultiplierSpace {
    fn is_nodal(&self) -> bool {
        false
    }

    fn order(&self) -> usize {
        0
    }

    fn dof(&self, object: DofObject) -> usize {
        match object {
            DofObject::Element(face) => self.offset + face,
            DofObject::Node(_) => {
                panic!("elemental multiplier space queried with a nodal DOF object")
            }
        }
    }
}
