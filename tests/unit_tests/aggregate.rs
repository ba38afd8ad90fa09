use mortar::assembly::{Aggregate, DofAggregateMap, WeightedGap};
use mortar::dual::Dual;
use mortar::fields::DofObject;

fn gap_contribution(value: f64, normalization: f64) -> WeightedGap<f64> {
    WeightedGap {
        gap: Dual::constant(value),
        normalization,
    }
}

#[test]
fn entries_are_zero_initialized_on_first_touch() {
    let mut map = DofAggregateMap::<WeightedGap<f64>>::new();
    let entry = map.entry(DofObject::Node(3));
    assert_eq!(entry.gap.value(), 0.0);
    assert_eq!(entry.normalization, 0.0);
    assert_eq!(map.len(), 1);
}

#[test]
fn untouched_dofs_have_no_entry() {
    let mut map = DofAggregateMap::<WeightedGap<f64>>::new();
    map.entry(DofObject::Node(0)).merge(gap_contribution(1.0, 0.5));
    assert!(map.get(DofObject::Node(1)).is_none());
    assert!(map.get(DofObject::Element(0)).is_none());
}

#[test]
fn accumulation_is_additive_and_clear_resets() {
    let mut map = DofAggregateMap::<WeightedGap<f64>>::new();
    let dof = DofObject::Node(2);
    map.entry(dof).merge(gap_contribution(1.5, 1.0));
    map.entry(dof).merge(gap_contribution(1.5, 1.0));
    assert_eq!(map.get(dof).unwrap().gap.value(), 3.0);
    assert_eq!(map.get(dof).unwrap().normalization, 2.0);

    map.clear();
    assert!(map.is_empty());
    assert!(map.get(dof).is_none());
}

#[test]
fn merge_combines_shared_dofs_and_keeps_disjoint_ones() {
    let mut left = DofAggregateMap::<WeightedGap<f64>>::new();
    left.entry(DofObject::Node(0)).merge(gap_contribution(1.0, 2.0));
    left.entry(DofObject::Node(1)).merge(gap_contribution(2.0, 0.0));

    let mut right = DofAggregateMap::<WeightedGap<f64>>::new();
    right.entry(DofObject::Node(1)).merge(gap_contribution(3.0, 1.0));
    right.entry(DofObject::Element(0)).merge(gap_contribution(4.0, 0.5));

    left.merge(right);
    assert_eq!(left.len(), 3);
    assert_eq!(left.get(DofObject::Node(0)).unwrap().gap.value(), 1.0);
    assert_eq!(left.get(DofObject::Node(1)).unwrap().gap.value(), 5.0);
    assert_eq!(left.get(DofObject::Node(1)).unwrap().normalization, 1.0);
    assert_eq!(left.get(DofObject::Element(0)).unwrap().gap.value(), 4.0);
}

#[test]
fn merge_preserves_derivative_information() {
    let mut left = DofAggregateMap::<WeightedGap<f64>>::new();
    left.entry(DofObject::Node(0)).merge(WeightedGap {
        gap: Dual::variable(1.0, 7),
        normalization: 0.0,
    });

    let mut right = DofAggregateMap::<WeightedGap<f64>>::new();
    right.entry(DofObject::Node(0)).merge(WeightedGap {
        gap: Dual::variable(2.0, 9),
        normalization: 0.0,
    });

    left.merge(right);
    let gap = &left.get(DofObject::Node(0)).unwrap().gap;
    assert_eq!(gap.value(), 3.0);
    assert_eq!(gap.derivatives().get(7), 1.0);
    assert_eq!(gap.derivatives().get(9), 1.0);
}

#[test]
fn sorted_entries_are_ordered_by_dof() {
    let mut map = DofAggregateMap::<WeightedGap<f64>>::new();
    for node in [5, 1, 3] {
        map.entry(DofObject::Node(node));
    }
    map.entry(DofObject::Element(0));

    let dofs: Vec<_> = map.sorted_entries().iter().map(|&(dof, _)| dof).collect();
    assert_eq!(
        dofs,
        vec![
            DofObject::Node(1),
            DofObject::Node(3),
            DofObject::Node(5),
            DofObject::Element(0),
        ]
    );
}
