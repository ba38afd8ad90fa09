pub mod assembly;
pub mod constraints;
pub mod fields;
pub mod interface;
pub mod quadrature;
pub mod segment;

pub mod dual {
    pub use mortar_dual::*;
}

pub extern crate nalgebra;

/// The scalar type used throughout `mortar`.
///
/// Re-exported from `fenris-traits` so that downstream code does not need a direct
/// dependency to name the bound.
pub use fenris_traits::Real;
