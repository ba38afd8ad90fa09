//! Eager validation of constraint configuration: invalid combinations must fail at
//! construction, never during a pass.

use crate::unit_tests::support::{
    displaced_options, tags, LinearElementSpace, TestDisplacement, TestVelocity,
};
use mortar::constraints::{
    ContactParameters, FrictionalContactConstraint, WeightedGapConstraint,
};
use mortar::fields::{ElementMultiplierSpace, NodalMultiplierSpace};
use mortar::segment::SegmentationOptions;

#[test]
fn configuration_and_interface_survive_serde_round_trips() {
    let options = displaced_options(2);
    let json = serde_json::to_string(&options).unwrap();
    let recovered: SegmentationOptions<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(options, recovered);

    let interface = crate::unit_tests::support::single_face_interface(0.1);
    let json = serde_json::to_string(&interface).unwrap();
    let recovered: mortar::interface::MortarInterface<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(interface, recovered);
}

#[test]
fn contact_parameters_reject_nonpositive_constants() {
    let mut params = ContactParameters::<f64>::default();
    params.c = 0.0;
    assert!(params.validate().is_err());

    let mut params = ContactParameters::<f64>::default();
    params.c_t = -1.0;
    assert!(params.validate().is_err());

    let mut params = ContactParameters::<f64>::default();
    params.friction_mu = -0.1;
    assert!(params.validate().is_err());

    let mut params = ContactParameters::<f64>::default();
    params.activation_epsilon = 0.0;
    assert!(params.validate().is_err());

    assert!(ContactParameters::<f64>::default().validate().is_ok());
}

#[test]
fn weighted_gap_requires_the_displaced_configuration() {
    let displacement = TestDisplacement::zero(2, 2);
    let lm_space = NodalMultiplierSpace { offset: 8 };
    let undisplaced = SegmentationOptions::default();
    let result = WeightedGapConstraint::new(
        ContactParameters::default(),
        &undisplaced,
        tags(),
        &displacement,
        &lm_space,
    );
    assert!(result.is_err());
}

#[test]
fn weighted_gap_accepts_constant_order_elemental_multipliers() {
    let displacement = TestDisplacement::zero(2, 2);
    let lm_space = ElementMultiplierSpace { offset: 8 };
    let result = WeightedGapConstraint::new(
        ContactParameters::default(),
        &displaced_options(1),
        tags(),
        &displacement,
        &lm_space,
    );
    assert!(result.is_ok());
}

#[test]
fn weighted_gap_rejects_higher_order_elemental_multipliers() {
    let displacement = TestDisplacement::zero(2, 2);
    let result = WeightedGapConstraint::new(
        ContactParameters::default(),
        &displaced_options(1),
        tags(),
        &displacement,
        &LinearElementSpace,
    );
    let message = format!("{:#}", result.err().unwrap());
    assert!(message.contains("constant order"));
}

#[test]
fn weighted_gap_propagates_invalid_parameters_with_their_name() {
    let displacement = TestDisplacement::zero(2, 2);
    let lm_space = NodalMultiplierSpace { offset: 8 };
    let mut params = ContactParameters::default();
    params.c = -1.0;
    let result = WeightedGapConstraint::new(
        params,
        &displaced_options(1),
        tags(),
        &displacement,
        &lm_space,
    );
    let message = format!("{:#}", result.err().unwrap());
    assert!(message.contains("'c'"));
}

#[test]
fn frictional_contact_requires_positive_friction_and_time_step() {
    let displacement = TestDisplacement::zero(2, 2);
    let velocity = TestVelocity::zero(2, 2, 1.0);
    let lm_space = NodalMultiplierSpace { offset: 8 };
    let friction_space = NodalMultiplierSpace { offset: 10 };

    let mut params = ContactParameters::default();
    params.friction_mu = 0.0;
    let result = FrictionalContactConstraint::new(
        params,
        &displaced_options(1),
        tags(),
        &displacement,
        &lm_space,
        &velocity,
        &friction_space,
        0.1,
    );
    assert!(result.is_err());

    let mut params = ContactParameters::default();
    params.friction_mu = 0.4;
    let result = FrictionalContactConstraint::new(
        params,
        &displaced_options(1),
        tags(),
        &displacement,
        &lm_space,
        &velocity,
        &friction_space,
        0.0,
    );
    assert!(result.is_err());
}

#[test]
fn frictional_contact_requires_matching_multiplier_layouts() {
    let displacement = TestDisplacement::zero(2, 2);
    let velocity = TestVelocity::zero(2, 2, 1.0);
    let lm_space = NodalMultiplierSpace { offset: 8 };
    let friction_space = ElementMultiplierSpace { offset: 10 };

    let mut params = ContactParameters::default();
    params.friction_mu = 0.4;
    let result = FrictionalContactConstraint::new(
        params,
        &displaced_options(1),
        tags(),
        &displacement,
        &lm_space,
        &velocity,
        &friction_space,
        0.1,
    );
    let message = format!("{:#}", result.err().unwrap());
    assert!(message.contains("layout"));
}
