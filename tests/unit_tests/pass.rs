//! End-to-end assembly passes over generated segment meshes.

use crate::unit_tests::support::{
    displaced_options, refined_interface, single_face_interface, tags, TestDisplacement,
    MATRIX_TAG, VECTOR_TAG,
};
use matrixcompare::assert_matrix_eq;
use mortar::assembly::{
    accumulate_pass, assemble_mortar_pass, par_accumulate_pass, par_assemble_mortar_pass,
    DofAggregateMap, PassKind, TaggedAssembly,
};
use mortar::constraints::{ContactParameters, MortarConstraint, WeightedGapConstraint};
use mortar::fields::{DofObject, ElementMultiplierSpace, NodalMultiplierSpace};
use mortar::segment::MortarSegmentMesh;
use nalgebra::{DMatrix, DVector};
use rustc_hash::FxHashSet;

fn unit_c() -> ContactParameters<f64> {
    ContactParameters {
        c: 1.0,
        ..ContactParameters::default()
    }
}

#[test]
fn single_segment_weighted_gap_equals_the_interface_gap() {
    // Two flat, parallel, fully overlapping unit-length faces offset by a known gap:
    // one segment, one quadrature point, unit test function (elemental multiplier),
    // unit Jacobian. The weighted gap is exactly the offset.
    for gap in [0.3, -0.1] {
        let interface = single_face_interface(gap);
        let displacement = TestDisplacement::zero(2, 2);
        let options = displaced_options(1);
        let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();
        assert_eq!(mesh.len(), 1);

        let lm_space = ElementMultiplierSpace { offset: 8 };
        let constraint = WeightedGapConstraint::new(
            unit_c(),
            &options,
            tags(),
            &displacement,
            &lm_space,
        )
        .unwrap();

        let mut map = DofAggregateMap::new();
        accumulate_pass(&mesh, &constraint, &mut map);
        let aggregate = map.get(DofObject::Element(0)).unwrap();
        assert!((aggregate.gap.value() - gap).abs() < 1e-14);

        // With c = 1 and an initial multiplier of zero, the residual defect is
        // min(0, gap).
        let solution = DVector::zeros(9);
        let mut sink = TaggedAssembly::new(9, &[VECTOR_TAG], &[MATRIX_TAG]);
        assemble_mortar_pass(
            &mesh,
            &constraint,
            &solution,
            &mut sink,
            PassKind::Residual,
            None,
        )
        .unwrap();
        let mut rhs = DVector::zeros(9);
        sink.flush_residual(VECTOR_TAG, &mut rhs);
        assert!((rhs[8] - gap.min(0.0)).abs() < 1e-14);
    }
}

#[test]
fn nodal_aggregates_partition_the_weighted_gap() {
    let gap = -0.2;
    let interface = single_face_interface(gap);
    let displacement = TestDisplacement::zero(2, 2);
    let options = displaced_options(2);
    let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();

    let lm_space = NodalMultiplierSpace { offset: 8 };
    let constraint =
        WeightedGapConstraint::new(unit_c(), &options, tags(), &displacement, &lm_space).unwrap();

    let mut map = DofAggregateMap::new();
    accumulate_pass(&mesh, &constraint, &mut map);
    assert_eq!(map.len(), 2);

    // The test functions sum to one, so the nodal weighted gaps partition the total.
    let total: f64 = map.entries().map(|(_, aggregate)| aggregate.gap.value()).sum();
    assert!((total - gap).abs() < 1e-14);
    for (_, aggregate) in map.entries() {
        assert!((aggregate.gap.value() - gap / 2.0).abs() < 1e-14);
    }
}

#[test]
fn accumulating_twice_doubles_and_clearing_resets() {
    let interface = single_face_interface(-0.1);
    let displacement = TestDisplacement::zero(2, 2);
    let options = displaced_options(1);
    let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();
    let lm_space = ElementMultiplierSpace { offset: 8 };
    let constraint =
        WeightedGapConstraint::new(unit_c(), &options, tags(), &displacement, &lm_space).unwrap();

    let mut map = DofAggregateMap::new();
    accumulate_pass(&mesh, &constraint, &mut map);
    accumulate_pass(&mesh, &constraint, &mut map);
    assert!((map.get(DofObject::Element(0)).unwrap().gap.value() + 0.2).abs() < 1e-14);

    map.clear();
    assert!(map.is_empty());
    accumulate_pass(&mesh, &constraint, &mut map);
    assert!((map.get(DofObject::Element(0)).unwrap().gap.value() + 0.1).abs() < 1e-14);
}

#[test]
fn segment_visitation_order_does_not_change_aggregates() {
    let interface = refined_interface(8, 5, -0.05);
    let displacement = TestDisplacement::zero(9, 6);
    let options = displaced_options(3);
    let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();
    let lm_space = NodalMultiplierSpace { offset: 2 * (9 + 6) };
    let constraint =
        WeightedGapConstraint::new(unit_c(), &options, tags(), &displacement, &lm_space).unwrap();

    let mut forward = DofAggregateMap::new();
    for segment in mesh.segments() {
        constraint.accumulate_segment(segment, &mut forward);
    }
    let mut reversed = DofAggregateMap::new();
    for segment in mesh.segments().iter().rev() {
        constraint.accumulate_segment(segment, &mut reversed);
    }

    assert_eq!(forward.len(), reversed.len());
    for (dof, aggregate) in forward.entries() {
        let other = reversed.get(dof).unwrap();
        let scale = 1.0f64.max(aggregate.gap.value().abs());
        assert!((aggregate.gap.value() - other.gap.value()).abs() <= 1e-10 * scale);
    }
}

#[test]
fn parallel_accumulation_matches_serial_accumulation() {
    let interface = refined_interface(8, 5, -0.05);
    let displacement = TestDisplacement::zero(9, 6);
    let options = displaced_options(3);
    let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();
    let lm_space = NodalMultiplierSpace { offset: 2 * (9 + 6) };
    let constraint =
        WeightedGapConstraint::new(unit_c(), &options, tags(), &displacement, &lm_space).unwrap();

    let mut serial = DofAggregateMap::new();
    accumulate_pass(&mesh, &constraint, &mut serial);
    let mut parallel = DofAggregateMap::new();
    par_accumulate_pass(&mesh, &constraint, &mut parallel, 2);

    assert_eq!(serial.len(), parallel.len());
    for (dof, aggregate) in serial.entries() {
        let other = parallel.get(dof).unwrap();
        let scale = 1.0f64.max(aggregate.gap.value().abs());
        assert!((aggregate.gap.value() - other.gap.value()).abs() <= 1e-10 * scale);
    }
}

#[test]
fn jacobian_pass_assembles_gap_sensitivities() {
    // Penetrating configuration with a large multiplier iterate: the gap branch of the
    // complementarity condition is active, and the Jacobian row consists of the
    // shape-function-weighted displacement sensitivities of the weighted gap.
    let interface = single_face_interface(-0.1);
    let displacement = TestDisplacement::zero(2, 2);
    let options = displaced_options(1);
    let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();
    let lm_space = ElementMultiplierSpace { offset: 8 };
    let constraint =
        WeightedGapConstraint::new(unit_c(), &options, tags(), &displacement, &lm_space).unwrap();

    let mut solution = DVector::zeros(9);
    solution[8] = 0.5;

    let mut sink = TaggedAssembly::new(9, &[VECTOR_TAG], &[MATRIX_TAG]);
    assemble_mortar_pass(
        &mesh,
        &constraint,
        &solution,
        &mut sink,
        PassKind::Residual,
        None,
    )
    .unwrap();
    assemble_mortar_pass(
        &mesh,
        &constraint,
        &solution,
        &mut sink,
        PassKind::Jacobian,
        None,
    )
    .unwrap();

    let mut rhs = DVector::zeros(9);
    sink.flush_residual(VECTOR_TAG, &mut rhs);
    assert!((rhs[8] + 0.1).abs() < 1e-14);

    let mut jacobian = DMatrix::zeros(9, 9);
    for (i, j, v) in sink.flush_matrix(MATRIX_TAG).triplet_iter() {
        jacobian[(i, j)] += v;
    }

    // One quadrature point at the face center, normal (0, 1): the gap depends on the
    // vertical displacement DOFs with weight 1/2, positively on the primary side and
    // negatively on the secondary side. The multiplier column is empty on this branch.
    let mut expected = DMatrix::zeros(9, 9);
    expected[(8, 1)] = -0.5;
    expected[(8, 3)] = -0.5;
    expected[(8, 5)] = 0.5;
    expected[(8, 7)] = 0.5;
    assert_matrix_eq!(jacobian, expected, comp = abs, tol = 1e-14);
}

#[test]
fn excluded_nodes_produce_no_writes_in_the_full_pipeline() {
    let interface = refined_interface(2, 2, -0.1);
    let displacement = TestDisplacement::zero(3, 3);
    let options = displaced_options(2);
    let mesh = MortarSegmentMesh::build(&interface, Some(&displacement), &options).unwrap();
    let lm_offset = 2 * (3 + 3);
    let lm_space = NodalMultiplierSpace { offset: lm_offset };
    let constraint =
        WeightedGapConstraint::new(unit_c(), &options, tags(), &displacement, &lm_space).unwrap();

    let num_dofs = lm_offset + 3;
    let solution = DVector::zeros(num_dofs);
    let mut inactive = FxHashSet::default();
    inactive.insert(DofObject::Node(1));

    let mut sink = TaggedAssembly::new(num_dofs, &[VECTOR_TAG], &[MATRIX_TAG]);
    par_assemble_mortar_pass(
        &mesh,
        &constraint,
        &solution,
        &mut sink,
        PassKind::Residual,
        Some(&inactive),
        2,
    )
    .unwrap();

    let mut rhs = DVector::zeros(num_dofs);
    sink.flush_residual(VECTOR_TAG, &mut rhs);
    assert_eq!(rhs[lm_offset + 1], 0.0);
    // The other nodes penetrate and are enforced.
    assert!(rhs[lm_offset] < 0.0);
    assert!(rhs[lm_offset + 2] < 0.0);
}
