//! Generation of the mortar segment mesh.
//!
//! The mortar segment mesh discretizes the geometric overlap of the two sides of a
//! [`MortarInterface`](crate::interface::MortarInterface). Projecting the primary-side
//! vertices onto a secondary face splits it into sub-segments; each sub-segment that is
//! covered by a primary face becomes a [`MortarSegment`] carrying its own quadrature
//! data. Segments are regenerated for every assembly pass (they depend on the displaced
//! configuration) and are never persisted.

use crate::fields::DisplacementField;
use crate::interface::MortarInterface;
use crate::quadrature;
use crate::Real;
use eyre::{bail, ensure};
use itertools::izip;
use log::{debug, warn};
use nalgebra::{Point2, Scalar, Vector2};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// The coordinate system the interface integrals are formulated in.
///
/// The coordinate factor multiplies the integration weight of every quadrature point:
/// 1 for Cartesian coordinates, the radial coordinate (the `x` coordinate of the
/// quadrature point) for axisymmetric problems.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    Cartesian,
    Axisymmetric,
}

/// Configuration for mortar segment generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationOptions<T> {
    /// Number of Gauss points per mortar segment.
    pub quadrature_points: usize,
    /// Whether normals are interpolated from nodal normals at quadrature points. When
    /// `false`, constraints use the fixed nodal normal of each test function instead.
    pub interpolate_normals: bool,
    /// Whether multiplier test functions use the dual (biorthogonal) basis.
    pub use_dual_basis: bool,
    /// Whether segments are generated on the displaced configuration.
    pub displaced: bool,
    pub coordinate_system: CoordinateSystem,
    /// Relative tolerance (on the reference interval) below which sub-segments are
    /// considered slivers and dropped.
    pub tolerance: T,
}

impl<T: Real> Default for SegmentationOptions<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn default() -> Self {
        Self {
            quadrature_points: 3,
            interpolate_normals: true,
            use_dual_basis: false,
            displaced: false,
            coordinate_system: CoordinateSystem::Cartesian,
            tolerance: 1e-10,
        }
    }
}

impl<T: Real> SegmentationOptions<T> {
    /// Validates the option combination, reporting the offending parameter on failure.
    pub fn validate(&self) -> eyre::Result<()> {
        ensure!(
            self.quadrature_points >= 1,
            "'quadrature_points' must be at least 1"
        );
        ensure!(
            self.tolerance > T::zero() && self.tolerance < T::one(),
            "'tolerance' must lie strictly between 0 and 1"
        );
        if self.use_dual_basis && self.interpolate_normals {
            bail!(
                "'interpolate_normals' cannot be combined with 'use_dual_basis': \
                 dual mortar requires fixed nodal normals"
            );
        }
        Ok(())
    }
}

/// Standard linear basis on the reference interval `[-1, 1]`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn segment_basis<T: Real>(xi: T) -> [T; 2] {
    [(1.0 - xi) / 2.0, (1.0 + xi) / 2.0]
}

/// Dual (biorthogonal) linear basis on `[-1, 1]`, satisfying
/// `int psi_i phi_j = delta_ij int phi_j`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn segment_dual_basis<T: Real>(xi: T) -> [T; 2] {
    [(1.0 - 3.0 * xi) / 2.0, (1.0 + 3.0 * xi) / 2.0]
}

/// Gradients of the standard linear basis with respect to the reference coordinate.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn segment_gradients<T: Real>() -> [T; 2] {
    [-0.5, 0.5]
}

/// One element of the mortar segment mesh: a sub-segment of a secondary face paired with
/// the primary face covering it, together with all per-quadrature-point data the
/// constraint evaluators need.
#[derive(Debug, Clone, PartialEq)]
pub struct MortarSegment<T: Scalar> {
    pub secondary_face: usize,
    pub primary_face: usize,
    /// Interface node indices of the secondary face, in face order.
    pub secondary_nodes: [usize; 2],
    /// Interface node indices of the primary face, in face order.
    pub primary_nodes: [usize; 2],
    /// Fixed nodal normals of the two secondary face nodes.
    pub secondary_nodal_normals: [Vector2<T>; 2],
    /// Integration weight per quadrature point: reference weight x segment Jacobian x
    /// face Jacobian x coordinate factor.
    pub weights: Vec<T>,
    /// Quadrature point locations on the secondary face, in physical space.
    pub points_secondary: Vec<Point2<T>>,
    /// Projections of the quadrature points onto the primary face, in physical space.
    pub points_primary: Vec<Point2<T>>,
    /// Interpolated unit normals at the quadrature points.
    pub normals: Vec<Vector2<T>>,
    /// Unit tangents at the quadrature points (normals rotated 90 degrees clockwise).
    pub tangents: Vec<Vector2<T>>,
    /// Multiplier test function values at the quadrature points (standard or dual
    /// basis, depending on configuration).
    pub test: Vec<[T; 2]>,
    /// Trial function values of the secondary face at the quadrature points.
    pub trial_secondary: Vec<[T; 2]>,
    /// Trial function values of the primary face at the quadrature points.
    pub trial_primary: Vec<[T; 2]>,
    /// Physical-space surface gradients of the secondary trial functions at the
    /// quadrature points.
    pub grad_trial_secondary: Vec<[Vector2<T>; 2]>,
    /// Physical-space surface gradients of the primary trial functions at the
    /// quadrature points.
    pub grad_trial_primary: Vec<[Vector2<T>; 2]>,
}

impl<T: Real> MortarSegment<T> {
    pub fn num_quadrature_points(&self) -> usize {
        self.weights.len()
    }

    /// The integrated measure of the segment (sum of its weights).
    pub fn measure(&self) -> T {
        self.weights.iter().fold(T::zero(), |acc, &w| acc + w)
    }
}

/// The collected mortar segment mesh for one assembly pass.
#[derive(Debug, Clone)]
pub struct MortarSegmentMesh<T: Scalar> {
    segments: Vec<MortarSegment<T>>,
    total_measure: T,
}

impl<T: Real> MortarSegmentMesh<T> {
    /// Generates and collects the mortar segment mesh for the given interface.
    ///
    /// A displacement field must be provided exactly when the options request the
    /// displaced configuration. Configuration is validated eagerly; iteration itself
    /// cannot fail.
    pub fn build(
        interface: &MortarInterface<T>,
        displacement: Option<&dyn DisplacementField<T>>,
        options: &SegmentationOptions<T>,
    ) -> eyre::Result<Self> {
        options.validate()?;
        match (options.displaced, displacement.is_some()) {
            (true, false) => bail!("'displaced' is set but no displacement field was provided"),
            (false, true) => bail!("a displacement field was provided but 'displaced' is not set"),
            _ => {}
        }

        let configuration = match displacement {
            Some(displacement) => interface.displaced(displacement),
            None => interface.clone(),
        };

        if options.coordinate_system == CoordinateSystem::Axisymmetric {
            let all_vertices = configuration
                .secondary
                .vertices()
                .iter()
                .chain(configuration.primary.vertices());
            for (index, vertex) in all_vertices.enumerate() {
                ensure!(
                    vertex.x >= T::zero(),
                    "axisymmetric interfaces require nonnegative radial coordinates, \
                     but vertex {} has x = {:?}",
                    index,
                    vertex.x
                );
            }
        }

        let nodal_normals = configuration.secondary.nodal_normals()?;
        let segments: Vec<_> = generate_segments(&configuration, options, &nodal_normals).collect();
        let total_measure = segments
            .iter()
            .fold(T::zero(), |acc, segment| acc + segment.measure());
        debug!(
            "generated {} mortar segments, total measure {:?}",
            segments.len(),
            total_measure
        );
        Ok(Self {
            segments,
            total_measure,
        })
    }

    pub fn segments(&self) -> &[MortarSegment<T>] {
        &self.segments
    }

    pub fn total_measure(&self) -> T {
        self.total_measure
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Lazily generates the mortar segments of an interface, one secondary face at a time.
///
/// `nodal_normals` must be the secondary mesh's nodal normals in the same configuration
/// as `interface` (see [`FaceMesh::nodal_normals`](crate::interface::FaceMesh::nodal_normals)).
/// The sequence is finite and regenerating it yields identical segments; callers
/// requiring validation should go through [`MortarSegmentMesh::build`].
pub fn generate_segments<'a, T: Real>(
    interface: &'a MortarInterface<T>,
    options: &'a SegmentationOptions<T>,
    nodal_normals: &'a [Vector2<T>],
) -> impl Iterator<Item = MortarSegment<T>> + 'a {
    let rule = quadrature::gauss(options.quadrature_points);
    (0..interface.secondary.num_faces()).flat_map(move |secondary_face| {
        segments_for_face(interface, options, nodal_normals, &rule, secondary_face).into_iter()
    })
}

/// Parametric coordinate of the orthogonal projection of `point` onto the face spanned
/// from `origin` along the unit tangent `tangent` with the given length, in `[-1, 1]`
/// for points projecting inside the face.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn projected_coordinate<T: Real>(
    origin: &Point2<T>,
    tangent: &Vector2<T>,
    length: T,
    point: &Point2<T>,
) -> T {
    2.0 * (point - origin).dot(tangent) / length - 1.0
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn segments_for_face<T: Real>(
    interface: &MortarInterface<T>,
    options: &SegmentationOptions<T>,
    nodal_normals: &[Vector2<T>],
    rule: &quadrature::QuadraturePair1d<T>,
    secondary_face: usize,
) -> Vec<MortarSegment<T>> {
    let secondary = &interface.secondary;
    let primary = &interface.primary;
    let tol = options.tolerance;

    let [a, b] = secondary.face_vertices(secondary_face);
    let length = secondary.face_length(secondary_face);
    let tangent = secondary.face_tangent(secondary_face);
    let secondary_nodes = secondary.faces()[secondary_face];
    let face_nodal_normals = [
        nodal_normals[secondary_nodes[0]],
        nodal_normals[secondary_nodes[1]],
    ];

    // Coverage of this face by each primary face, as intervals in the face's reference
    // coordinate.
    let mut coverage = Vec::new();
    for primary_face in 0..primary.num_faces() {
        let [p0, p1] = primary.face_vertices(primary_face);
        let xi0 = projected_coordinate(&a, &tangent, length, &p0);
        let xi1 = projected_coordinate(&a, &tangent, length, &p1);
        let (lo, hi) = if xi0 <= xi1 { (xi0, xi1) } else { (xi1, xi0) };
        let lo = lo.max(-1.0);
        let hi = hi.min(1.0);
        if hi - lo <= tol {
            if hi - lo > 0.0 {
                warn!(
                    "dropping sliver overlap of primary face {} on secondary face {}",
                    primary_face, secondary_face
                );
            }
            continue;
        }
        coverage.push((primary_face, lo, hi));
    }

    if coverage.is_empty() {
        return Vec::new();
    }

    // Breakpoints: face endpoints plus every interior coverage endpoint.
    let mut breakpoints = vec![-1.0, 1.0];
    for &(_, lo, hi) in &coverage {
        if lo > -1.0 {
            breakpoints.push(lo);
        }
        if hi < 1.0 {
            breakpoints.push(hi);
        }
    }
    breakpoints.sort_unstable_by(|x, y| x.partial_cmp(y).expect("breakpoints must be ordered"));
    breakpoints.dedup_by(|x, y| (*x - *y).abs() <= tol);

    let mut segments = Vec::new();
    for window in breakpoints.windows(2) {
        let (x0, x1) = (window[0], window[1]);
        if x1 - x0 <= tol {
            continue;
        }
        let mid = (x0 + x1) / 2.0;
        // Tie-break for sub-segments whose boundary coincides with a coverage boundary:
        // the lowest-index covering primary face wins.
        let primary_face = coverage
            .iter()
            .find(|&&(_, lo, hi)| lo <= mid && mid <= hi)
            .map(|&(face, _, _)| face);
        let Some(primary_face) = primary_face else {
            continue;
        };

        segments.push(build_segment(
            interface,
            options,
            rule,
            secondary_face,
            secondary_nodes,
            &a,
            &b,
            length,
            face_nodal_normals,
            primary_face,
            (x0, x1),
        ));
    }
    segments
}

#[allow(clippy::too_many_arguments)]
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn build_segment<T: Real>(
    interface: &MortarInterface<T>,
    options: &SegmentationOptions<T>,
    rule: &quadrature::QuadraturePair1d<T>,
    secondary_face: usize,
    secondary_nodes: [usize; 2],
    a: &Point2<T>,
    b: &Point2<T>,
    length: T,
    face_nodal_normals: [Vector2<T>; 2],
    primary_face: usize,
    (x0, x1): (T, T),
) -> MortarSegment<T> {
    let primary = &interface.primary;
    let [p0, p1] = primary.face_vertices(primary_face);
    let primary_length = primary.face_length(primary_face);
    let primary_tangent = primary.face_tangent(primary_face);
    let primary_nodes = primary.faces()[primary_face];

    let jacobian_sub = (x1 - x0) / 2.0;
    let jacobian_face = length / 2.0;

    let (ref_weights, ref_points) = rule;
    let nqp = ref_weights.len();

    let mut segment = MortarSegment {
        secondary_face,
        primary_face,
        secondary_nodes,
        primary_nodes,
        secondary_nodal_normals: face_nodal_normals,
        weights: Vec::with_capacity(nqp),
        points_secondary: Vec::with_capacity(nqp),
        points_primary: Vec::with_capacity(nqp),
        normals: Vec::with_capacity(nqp),
        tangents: Vec::with_capacity(nqp),
        test: Vec::with_capacity(nqp),
        trial_secondary: Vec::with_capacity(nqp),
        trial_primary: Vec::with_capacity(nqp),
        grad_trial_secondary: Vec::with_capacity(nqp),
        grad_trial_primary: Vec::with_capacity(nqp),
    };

    // Linear trial gradients are constant along each face; they are mapped to physical
    // space by the chain rule through the face Jacobian.
    let grad_ref: [T; 2] = segment_gradients();
    let secondary_tangent = (b - a) / length;
    let grad_secondary = [
        secondary_tangent * (grad_ref[0] / jacobian_face),
        secondary_tangent * (grad_ref[1] / jacobian_face),
    ];
    let primary_jacobian = primary_length / 2.0;
    let grad_primary = [
        primary_tangent * (grad_ref[0] / primary_jacobian),
        primary_tangent * (grad_ref[1] / primary_jacobian),
    ];

    for (&w, &eta) in izip!(ref_weights, ref_points) {
        // Map from the sub-segment reference interval to the face reference interval,
        // then to physical space.
        let xi = (x0 + x1) / 2.0 + eta * jacobian_sub;
        let phi = segment_basis(xi);
        let x = Point2::from(a.coords * phi[0] + b.coords * phi[1]);

        let normal = (face_nodal_normals[0] * phi[0] + face_nodal_normals[1] * phi[1]).normalize();
        let tangent = Vector2::new(normal.y, -normal.x);

        let xi_primary = projected_coordinate(&p0, &primary_tangent, primary_length, &x)
            .clamp(-1.0, 1.0);
        let phi_primary = segment_basis(xi_primary);
        let x_primary = Point2::from(p0.coords * phi_primary[0] + p1.coords * phi_primary[1]);

        let coord_factor = match options.coordinate_system {
            CoordinateSystem::Cartesian => 1.0,
            CoordinateSystem::Axisymmetric => x.x,
        };

        segment.weights.push(w * jacobian_sub * jacobian_face * coord_factor);
        segment.points_secondary.push(x);
        segment.points_primary.push(x_primary);
        segment.normals.push(normal);
        segment.tangents.push(tangent);
        segment.test.push(if options.use_dual_basis {
            segment_dual_basis(xi)
        } else {
            phi
        });
        segment.trial_secondary.push(phi);
        segment.trial_primary.push(phi_primary);
        segment.grad_trial_secondary.push(grad_secondary);
        segment.grad_trial_primary.push(grad_primary);
    }

    segment
}
