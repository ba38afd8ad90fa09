//! The two-phase mortar assembly protocol: per-quadrature-point accumulation into a
//! DOF aggregation map, followed by per-DOF constraint enforcement into an assembly
//! sink.

pub mod aggregate;
pub mod global;
pub mod sink;

pub use aggregate::*;
pub use global::*;
pub use sink::*;

/// Which kind of system evaluation a pass serves.
///
/// Accumulation is identical for both kinds (automatic-differentiation scalars carry
/// derivative information either way); the pass kind only selects what the assembly
/// sink extracts during enforcement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PassKind {
    Residual,
    Jacobian,
}
