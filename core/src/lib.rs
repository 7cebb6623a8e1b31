//! # sgwb-core
//!
//! Stochastic gravitational-wave background analysis core written in Rust
//! with Python bindings via [PyO3](https://pyo3.rs).
//!
//! ## Overview
//!
//! This crate provides the computational core of a cross-correlation
//! search for the stochastic gravitational-wave background:
//!
//! | Module     | Purpose                                                    |
//! |------------|------------------------------------------------------------|
//! | [`orf`]    | Overlap reduction functions for detector baselines         |
//! | [`notch`]  | Frequency notch lists - contaminated-bin rejection         |
//! | [`bessel`] | Spherical Bessel functions underlying the ORF expansion    |
//!
//! ## Python usage
//!
//! When compiled as a `cdylib` (with the `extension-module` feature), the
//! library exposes a Python module called `sgwb_core`:
//!
//! ```python
//! import sgwb_core
//!
//! orf = sgwb_core.calc_orf(freqs, h1_vertex, l1_vertex,
//!                          h1_xarm, l1_xarm, h1_yarm, l1_yarm,
//!                          polarization="tensor")
//!
//! notches = sgwb_core.power_lines(fundamental=60, nharmonics=40, df=0.2)
//! idxs, inv_idxs = notches.get_idxs(freqs)
//! ```

pub mod bessel;
pub mod notch;
pub mod orf;

// Re-export the most commonly used items at crate root for convenience.
pub use notch::{comb, power_lines, pulsar_injections, Notch, NotchError, NotchList};
pub use orf::{calc_orf, OrfError, Polarization, SPEED_OF_LIGHT};

use pyo3::prelude::*;

/// The top-level Python module exposed by this crate.
///
/// Registered classes:
/// - `Notch` - a single excluded frequency interval
/// - `NotchList` - a collection of notches with masking and persistence
///
/// Registered functions:
/// - `calc_orf` - overlap reduction function of a detector pair
/// - `power_lines`, `comb`, `pulsar_injections` - notch-list generators
#[pymodule]
fn sgwb_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Notch>()?;
    m.add_class::<NotchList>()?;

    m.add_function(wrap_pyfunction!(orf::py_calc_orf, m)?)?;
    m.add_function(wrap_pyfunction!(notch::py_power_lines, m)?)?;
    m.add_function(wrap_pyfunction!(notch::py_comb, m)?)?;
    m.add_function(wrap_pyfunction!(notch::py_pulsar_injections, m)?)?;

    // Module-level metadata
    m.add("__version__", "0.1.0")?;
    m.add(
        "__doc__",
        "Stochastic gravitational-wave background analysis core.",
    )?;

    Ok(())
}
