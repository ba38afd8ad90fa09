//! The assembly sink: cache-then-flush accumulation of residual and Jacobian
//! contributions, keyed by global DOF index and tag.

use crate::assembly::PassKind;
use crate::Real;
use mortar_dual::Dual;
use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A logical grouping of a global vector or matrix (e.g. the time residual vector or
/// the system matrix). Tags are allocated by the enclosing problem; the assembly only
/// routes contributions by them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag(pub usize);

/// The tag sets a constraint contributes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyTags {
    pub vector: Vec<Tag>,
    pub matrix: Vec<Tag>,
}

/// Destination of enforcement contributions.
///
/// Residual values and Jacobian rows are cached rather than written directly into
/// shared global storage, so that concurrent enforcement and distributed-memory
/// reduction can happen at defined synchronization points.
pub trait AssemblySink<T> {
    /// Caches a residual contribution for the given DOF under every given vector tag.
    fn cache_residual(&mut self, dof: usize, value: T, tags: &[Tag]);

    /// Caches the full derivative vector of `residual` as a sparse Jacobian row under
    /// every given matrix tag.
    fn process_derivatives(&mut self, residual: &Dual<T>, row_dof: usize, tags: &[Tag]);
}

/// The standard cache-then-flush sink.
///
/// Contributions accumulate in per-tag caches; [`flush_residual`] and [`flush_matrix`]
/// move them additively into caller-owned global storage and empty the cache, so that
/// flushing twice without intervening caching adds nothing.
///
/// Caching to an unregistered tag, or with an out-of-bounds DOF index, is a
/// programming-contract violation and panics.
///
/// [`flush_residual`]: TaggedAssembly::flush_residual
/// [`flush_matrix`]: TaggedAssembly::flush_matrix
#[derive(Debug, Clone)]
pub struct TaggedAssembly<T> {
    num_dofs: usize,
    residual_caches: FxHashMap<Tag, Vec<(usize, T)>>,
    matrix_caches: FxHashMap<Tag, Vec<(usize, usize, T)>>,
}

impl<T: Real> TaggedAssembly<T> {
    pub fn new(num_dofs: usize, vector_tags: &[Tag], matrix_tags: &[Tag]) -> Self {
        Self {
            num_dofs,
            residual_caches: vector_tags.iter().map(|&tag| (tag, Vec::new())).collect(),
            matrix_caches: matrix_tags.iter().map(|&tag| (tag, Vec::new())).collect(),
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Adds all cached residual contributions for `tag` into `rhs` and empties the
    /// cache.
    pub fn flush_residual(&mut self, tag: Tag, rhs: &mut DVector<T>) {
        assert_eq!(
            rhs.len(),
            self.num_dofs,
            "global residual vector has wrong dimension"
        );
        let cache = self
            .residual_caches
            .get_mut(&tag)
            .expect("flush of unregistered vector tag");
        for (dof, value) in cache.drain(..) {
            rhs[dof] += value;
        }
    }

    /// Drains all cached Jacobian triplets for `tag` into a COO matrix.
    pub fn flush_matrix(&mut self, tag: Tag) -> CooMatrix<T> {
        let cache = self
            .matrix_caches
            .get_mut(&tag)
            .expect("flush of unregistered matrix tag");
        let mut matrix = CooMatrix::new(self.num_dofs, self.num_dofs);
        for (row, col, value) in cache.drain(..) {
            matrix.push(row, col, value);
        }
        matrix
    }
}

impl<T: Real> AssemblySink<T> for TaggedAssembly<T> {
    fn cache_residual(&mut self, dof: usize, value: T, tags: &[Tag]) {
        assert!(dof < self.num_dofs, "residual DOF index out of bounds");
        for tag in tags {
            self.residual_caches
                .get_mut(tag)
                .expect("residual cached under unregistered vector tag")
                .push((dof, value));
        }
    }

    fn process_derivatives(&mut self, residual: &Dual<T>, row_dof: usize, tags: &[Tag]) {
        assert!(row_dof < self.num_dofs, "Jacobian row index out of bounds");
        for tag in tags {
            let cache = self
                .matrix_caches
                .get_mut(tag)
                .expect("derivatives cached under unregistered matrix tag");
            for (col_dof, partial) in residual.derivatives().iter() {
                assert!(col_dof < self.num_dofs, "Jacobian column index out of bounds");
                cache.push((row_dof, col_dof, partial));
            }
        }
    }
}

/// Routes one enforced residual defect to the sink according to the pass kind: the
/// scalar value under the vector tags for a residual pass, the full derivative vector
/// under the matrix tags for a Jacobian pass.
pub fn dispatch_residual<T: Real>(
    sink: &mut dyn AssemblySink<T>,
    residual: &Dual<T>,
    dof: usize,
    tags: &AssemblyTags,
    pass: PassKind,
) {
    match pass {
        PassKind::Residual => sink.cache_residual(dof, residual.value(), &tags.vector),
        PassKind::Jacobian => sink.process_derivatives(residual, dof, &tags.matrix),
    }
}
