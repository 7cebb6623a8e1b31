//! Overlap reduction functions for detector baselines.
//!
//! # Background
//!
//! A stochastic gravitational-wave background is searched for by
//! cross-correlating the strain outputs of two detectors.  Because the
//! detectors sit at different points on the Earth and their arms point in
//! different directions, a wave arriving from a given sky direction is
//! received with different phase and projected onto different antenna
//! patterns at each site.  Averaged over an isotropic background, this
//! geometry suppresses the correlated signal by a frequency-dependent
//! factor, the *overlap reduction function* (ORF).  It is the per-frequency
//! sensitivity weight of a detector pair and enters every downstream
//! point-estimate combination.
//!
//! # Algorithm overview
//!
//! Following Section IVb of <https://arxiv.org/abs/0903.0528>, the ORF for
//! each polarization (tensor, vector, scalar) reduces to a closed form in
//! three geometric quantities:
//!
//! 1. **α(f) = 2πf·|Δx|/c** - the phase accumulated over the baseline
//!    separation Δx at frequency f.
//! 2. **β** - the angle between the two detector vertices as seen from the
//!    center of the Earth.
//! 3. **ω₁, ω₂** - per detector, the angle between the arm bisector and the
//!    tangent to the great circle connecting the two sites.
//!
//! The result is `Plus(α, β)·cos 4ω₊ + Minus(α, β)·cos 4ω₋` with
//! ω± = (ω₁ ± ω₂)/2, where `Plus`/`Minus` are polarization-specific linear
//! combinations of spherical Bessel functions j₀, j₂, j₄ evaluated at α.
//! The rational coefficients in those combinations come from the published
//! multipole expansion and are not tunable.
//!
//! Coordinates are always Earth-fixed cartesian, in meters; arm vectors are
//! unit vectors along each arm.

use std::str::FromStr;

use log::debug;
use ndarray::Array1;
use pyo3::prelude::*;

use crate::bessel::spherical_jn;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while evaluating an overlap reduction function.
#[derive(Debug, thiserror::Error)]
pub enum OrfError {
    #[error("unrecognized polarization '{0}': must be either tensor, vector, or scalar")]
    UnsupportedPolarization(String),
}

// ---------------------------------------------------------------------------
// Polarization
// ---------------------------------------------------------------------------

/// Gravitational-wave polarization content of the background being searched.
///
/// General-relativity backgrounds are purely [`Polarization::Tensor`]; the
/// vector and scalar modes arise in alternative theories of gravity and are
/// searched for with the same machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarization {
    Tensor,
    Vector,
    Scalar,
}

impl FromStr for Polarization {
    type Err = OrfError;

    /// Case-insensitive parse; anything but the three known modes fails.
    fn from_str(s: &str) -> Result<Self, OrfError> {
        match s.to_ascii_lowercase().as_str() {
            "tensor" => Ok(Self::Tensor),
            "vector" => Ok(Self::Vector),
            "scalar" => Ok(Self::Scalar),
            _ => Err(OrfError::UnsupportedPolarization(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Vector algebra on Earth-fixed coordinates
// ---------------------------------------------------------------------------

/// An Earth-fixed cartesian 3-vector.
pub type Vec3 = [f64; 3];

fn dot(u: Vec3, v: Vec3) -> f64 {
    u[0] * v[0] + u[1] * v[1] + u[2] * v[2]
}

fn cross(u: Vec3, v: Vec3) -> Vec3 {
    [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ]
}

fn norm(u: Vec3) -> f64 {
    dot(u, u).sqrt()
}

fn add(u: Vec3, v: Vec3) -> Vec3 {
    [u[0] + v[0], u[1] + v[1], u[2] + v[2]]
}

fn sub(u: Vec3, v: Vec3) -> Vec3 {
    [u[0] - v[0], u[1] - v[1], u[2] - v[2]]
}

/// Component of `v2` orthogonal to `v1`: the tangent, at `v1`, of the great
/// circle through both sites.
fn tangent_vector(v1: Vec3, v2: Vec3) -> Vec3 {
    let scale = dot(v1, v2) / dot(v1, v1);
    sub(v2, [scale * v1[0], scale * v1[1], scale * v1[2]])
}

/// Angle between a detector's arm bisector and the local great-circle
/// tangent direction.
fn omega_tangent_bisector(bisector: Vec3, tangent: Vec3) -> f64 {
    (dot(bisector, tangent) / (norm(bisector) * norm(tangent))).acos()
}

// ---------------------------------------------------------------------------
// Polarization kernels
// ---------------------------------------------------------------------------
//
// Each kernel is a fixed linear combination of j₀, j₂, j₄ at α.  The `plus`
// variants carry the cos β and cos 2β dependence; the `minus` variants scale
// by cos⁴(β/2).

/// Tensor-mode `Plus` basis function.
pub fn tensor_plus(alpha: f64, beta: f64) -> f64 {
    let (j0, j2, j4) = (
        spherical_jn(0, alpha),
        spherical_jn(2, alpha),
        spherical_jn(4, alpha),
    );
    -(3.0 / 8.0 * j0 - 45.0 / 56.0 * j2 + 169.0 / 896.0 * j4)
        + (0.5 * j0 - 5.0 / 7.0 * j2 - 27.0 / 224.0 * j4) * beta.cos()
        - (1.0 / 8.0 * j0 + 5.0 / 56.0 * j2 + 3.0 / 896.0 * j4) * (2.0 * beta).cos()
}

/// Tensor-mode `Minus` basis function.
pub fn tensor_minus(alpha: f64, beta: f64) -> f64 {
    let (j0, j2, j4) = (
        spherical_jn(0, alpha),
        spherical_jn(2, alpha),
        spherical_jn(4, alpha),
    );
    (j0 + 5.0 / 7.0 * j2 + 3.0 / 112.0 * j4) * (beta / 2.0).cos().powi(4)
}

/// Vector-mode `Plus` basis function.
pub fn vector_plus(alpha: f64, beta: f64) -> f64 {
    let (j0, j2, j4) = (
        spherical_jn(0, alpha),
        spherical_jn(2, alpha),
        spherical_jn(4, alpha),
    );
    -(3.0 / 8.0 * j0 + 45.0 / 112.0 * j2 + 169.0 / 224.0 * j4)
        + (0.5 * j0 + 5.0 / 14.0 * j2 + 27.0 / 56.0 * j4) * beta.cos()
        - (1.0 / 8.0 * j0 - 5.0 / 112.0 * j2 - 3.0 / 224.0 * j4) * (2.0 * beta).cos()
}

/// Vector-mode `Minus` basis function.
pub fn vector_minus(alpha: f64, beta: f64) -> f64 {
    let (j0, j2, j4) = (
        spherical_jn(0, alpha),
        spherical_jn(2, alpha),
        spherical_jn(4, alpha),
    );
    (j0 - 5.0 / 14.0 * j2 - 3.0 / 28.0 * j4) * (beta / 2.0).cos().powi(4)
}

/// Scalar-mode `Plus` basis function.
pub fn scalar_plus(alpha: f64, beta: f64) -> f64 {
    let (j0, j2, j4) = (
        spherical_jn(0, alpha),
        spherical_jn(2, alpha),
        spherical_jn(4, alpha),
    );
    -(3.0 / 8.0 * j0 + 45.0 / 56.0 * j2 + 507.0 / 448.0 * j4)
        + (0.5 * j0 + 5.0 / 7.0 * j2 - 81.0 / 112.0 * j4) * beta.cos()
        - (1.0 / 8.0 * j0 - 5.0 / 56.0 * j2 + 9.0 / 448.0 * j4) * (2.0 * beta).cos()
}

/// Scalar-mode `Minus` basis function.
pub fn scalar_minus(alpha: f64, beta: f64) -> f64 {
    let (j0, j2, j4) = (
        spherical_jn(0, alpha),
        spherical_jn(2, alpha),
        spherical_jn(4, alpha),
    );
    (j0 - 5.0 / 7.0 * j2 + 9.0 / 56.0 * j4) * (beta / 2.0).cos().powi(4)
}

// ---------------------------------------------------------------------------
// calc_orf
// ---------------------------------------------------------------------------

/// Calculate the overlap reduction function of a detector pair.
///
/// # Arguments
/// * `freqs`       - frequencies (Hz) at which to evaluate the ORF.
/// * `det1_vertex` - Earth-fixed coordinates of detector 1's vertex (m).
/// * `det2_vertex` - Earth-fixed coordinates of detector 2's vertex (m).
/// * `det1_xarm`, `det2_xarm`, `det1_yarm`, `det2_yarm` - unit vectors along
///   each detector's arms.
/// * `polarization` - `"tensor"`, `"vector"`, or `"scalar"`
///   (case-insensitive).
///
/// # Returns
/// The ORF evaluated at each input frequency, same length as `freqs`.
///
/// Degenerate geometry (zero-length or parallel separation vectors) yields
/// NaN from the underlying float operations rather than an error.
#[allow(clippy::too_many_arguments)]
pub fn calc_orf(
    freqs: &Array1<f64>,
    det1_vertex: Vec3,
    det2_vertex: Vec3,
    det1_xarm: Vec3,
    det2_xarm: Vec3,
    det1_yarm: Vec3,
    det2_yarm: Vec3,
    polarization: &str,
) -> Result<Array1<f64>, OrfError> {
    let polarization: Polarization = polarization.parse()?;

    let delta_x = sub(det1_vertex, det2_vertex);
    let separation = norm(delta_x);

    // Angle between the detectors from the center of the Earth.
    let beta = (dot(det1_vertex, det2_vertex) / (norm(det1_vertex) * norm(det2_vertex))).acos();

    let tan_det1 = tangent_vector(det1_vertex, det2_vertex);
    let bisector_det1 = add(det1_xarm, det1_yarm);
    let omega_det1 = omega_tangent_bisector(bisector_det1, tan_det1);

    // In-plane vector perpendicular to det1's vertex: the θ = 90° point of
    // the great circle with det1 at θ = 0.  Projecting it out of det2's
    // radial direction gives the tangent at the second site consistent with
    // propagation along the same great circle.
    let perp = cross(cross(det1_vertex, det2_vertex), det1_vertex);
    let tan_det2 = tangent_vector(det2_vertex, perp);
    let bisector_det2 = add(det2_xarm, det2_yarm);
    let omega_det2 = omega_tangent_bisector(bisector_det2, tan_det2);

    let omega_plus = (omega_det1 + omega_det2) / 2.0;
    let omega_minus = (omega_det1 - omega_det2) / 2.0;
    let cos_4omega_plus = (4.0 * omega_plus).cos();
    let cos_4omega_minus = (4.0 * omega_minus).cos();

    let (plus, minus): (fn(f64, f64) -> f64, fn(f64, f64) -> f64) = match polarization {
        Polarization::Tensor => (tensor_plus, tensor_minus),
        Polarization::Vector => (vector_plus, vector_minus),
        Polarization::Scalar => (scalar_plus, scalar_minus),
    };

    debug!(
        "Evaluating {:?} ORF at {} frequencies, baseline separation {:.1} km, beta {:.4} rad",
        polarization,
        freqs.len(),
        separation / 1e3,
        beta,
    );

    Ok(freqs.mapv(|f| {
        let alpha = 2.0 * std::f64::consts::PI * f * separation / SPEED_OF_LIGHT;
        plus(alpha, beta) * cos_4omega_plus + minus(alpha, beta) * cos_4omega_minus
    }))
}

/// Evaluate the overlap reduction function from Python.
///
/// Frequencies cross the boundary as a flat list and the result comes back
/// the same way, ready for `np.asarray` on the Python side.
#[pyfunction]
#[pyo3(name = "calc_orf")]
#[pyo3(signature = (freqs, det1_vertex, det2_vertex, det1_xarm, det2_xarm, det1_yarm, det2_yarm, polarization="tensor"))]
#[allow(clippy::too_many_arguments)]
pub fn py_calc_orf(
    freqs: Vec<f64>,
    det1_vertex: Vec3,
    det2_vertex: Vec3,
    det1_xarm: Vec3,
    det2_xarm: Vec3,
    det1_yarm: Vec3,
    det2_yarm: Vec3,
    polarization: &str,
) -> PyResult<Vec<f64>> {
    let freqs = Array1::from(freqs);
    calc_orf(
        &freqs,
        det1_vertex,
        det2_vertex,
        det1_xarm,
        det2_xarm,
        det1_yarm,
        det2_yarm,
        polarization,
    )
    .map(|orf| orf.to_vec())
    .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // LIGO Hanford / Livingston geometry, Earth-fixed cartesian (m).
    const H1_VERTEX: Vec3 = [-2.16141492636e6, -3.83469517889e6, 4.60035022664e6];
    const H1_XARM: Vec3 = [-0.22389266154, 0.79983062746, 0.55690487831];
    const H1_YARM: Vec3 = [-0.91397818574, 0.02609403989, -0.40492342125];
    const L1_VERTEX: Vec3 = [-74276.0447238, -5.49628371971e6, 3.22425701744e6];
    const L1_XARM: Vec3 = [-0.95457412153, -0.14158077340, -0.26218911324];
    const L1_YARM: Vec3 = [0.29774156894, -0.48791033647, -0.82054461286];

    fn hl_orf(freqs: &Array1<f64>, polarization: &str) -> Array1<f64> {
        calc_orf(
            freqs, H1_VERTEX, L1_VERTEX, H1_XARM, L1_XARM, H1_YARM, L1_YARM, polarization,
        )
        .unwrap()
    }

    #[test]
    fn output_length_matches_input_for_all_polarizations() {
        let freqs = Array1::linspace(10.0, 1000.0, 137);
        for polarization in ["tensor", "vector", "scalar"] {
            assert_eq!(hl_orf(&freqs, polarization).len(), freqs.len());
        }
    }

    #[test]
    fn polarization_match_is_case_insensitive() {
        let freqs = Array1::from(vec![25.0]);
        let lower = hl_orf(&freqs, "tensor");
        let shouty = hl_orf(&freqs, "TeNsOr");
        assert_eq!(lower[0], shouty[0]);
    }

    #[test]
    fn unrecognized_polarization_is_rejected() {
        let freqs = Array1::from(vec![25.0]);
        let err = calc_orf(
            &freqs, H1_VERTEX, L1_VERTEX, H1_XARM, L1_XARM, H1_YARM, L1_YARM, "spin2",
        )
        .unwrap_err();
        assert!(matches!(err, OrfError::UnsupportedPolarization(ref s) if s == "spin2"));
    }

    #[test]
    fn kernels_match_reference_values() {
        // 50-digit decimal references for the closed forms.
        assert_relative_eq!(tensor_minus(1.0, 0.0), 0.8858088170251747, max_relative = 1e-12);
        assert_relative_eq!(tensor_plus(1.5, 0.4), 0.00813398753335836, max_relative = 1e-9);
        assert_relative_eq!(vector_plus(1.5, 0.4), -0.007805337453570677, max_relative = 1e-9);
        assert_relative_eq!(vector_minus(1.5, 0.4), 0.5710983062059661, max_relative = 1e-12);
        assert_relative_eq!(scalar_plus(1.5, 0.4), -0.020420521204945384, max_relative = 1e-9);
        assert_relative_eq!(scalar_minus(1.5, 0.4), 0.5303300861029562, max_relative = 1e-12);
        // The β-independent, cos β, and cos 2β groups cancel exactly at the
        // origin for the tensor mode.
        assert_relative_eq!(tensor_plus(0.0, 0.0), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn hanford_livingston_matches_reference() {
        let freqs = Array1::from(vec![0.01, 25.0, 50.0, 100.0, 500.0]);
        let expected: [(&str, [f64; 5]); 3] = [
            (
                "tensor",
                [
                    -8.907727009441e-1,
                    -6.601262978036e-1,
                    -2.007898535392e-1,
                    6.982627086816e-2,
                    2.910980546583e-3,
                ],
            ),
            (
                "vector",
                [
                    -8.907726738286e-1,
                    -5.178779626785e-1,
                    1.199904956693e-1,
                    1.443671849260e-2,
                    -8.251627748119e-5,
                ],
            ),
            (
                "scalar",
                [
                    -8.907726647901e-1,
                    -4.686066642044e-1,
                    2.477659173042e-1,
                    5.551143766597e-2,
                    2.518639624093e-3,
                ],
            ),
        ];
        for (polarization, values) in expected {
            let orf = hl_orf(&freqs, polarization);
            for (got, want) in orf.iter().zip(values) {
                assert_relative_eq!(*got, want, max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn colocated_aligned_detectors_approach_unity() {
        // Two detectors 1 m apart on the equator with identical arms.  The
        // tensor ORF must reduce to the autocorrelation value of 1 in the
        // long-wavelength limit.
        let r: f64 = 6.4e6;
        let eps = 1.0 / r;
        let v1 = [r, 0.0, 0.0];
        let v2 = [r * eps.cos(), r * eps.sin(), 0.0];
        let xarm = [0.0, 1.0, 0.0];
        let yarm = [0.0, 0.0, 1.0];
        let freqs = Array1::from(vec![10.0]);
        let orf = calc_orf(&freqs, v1, v2, xarm, xarm, yarm, yarm, "tensor").unwrap();
        assert_relative_eq!(orf[0], 1.0, max_relative = 1e-6);
    }

    #[test]
    fn orf_decays_with_frequency() {
        // The Bessel oscillations damp the envelope well below its
        // low-frequency value once α ≫ 1.
        let freqs = Array1::from(vec![1.0, 2000.0]);
        let orf = hl_orf(&freqs, "tensor");
        assert!(orf[1].abs() < orf[0].abs() / 10.0);
    }
}
