//! Frequency notch lists for contaminated-bin rejection.
//!
//! The low-frequency gravitational-wave band is crowded with instrumental
//! and environmental lines - power mains and their harmonics, calibration
//! lines, digital combs from electronics, and hardware pulsar injections.
//! Any stochastic-background search must exclude the affected frequency
//! bins before combining cross-correlation spectra, or a single coherent
//! line will dominate the broadband point estimate.
//!
//! This module provides a [`Notch`] value type (a closed frequency interval
//! with a provenance description), a [`NotchList`] collection with
//! membership queries and bulk bin masking, three generators for the common
//! line families, and text persistence in both the current and the legacy
//! archive format.
//!
//! # Bin masking
//!
//! [`NotchList::get_idxs`] does *not* test per-bin containment.  A finite
//! segment's spectral estimate leaks across neighbouring bins, so a bin is
//! rejected whenever the window reaching one bin-spacing to either neighbour
//! overlaps a notch.  The first and last bins use one-sided windows
//! extrapolated by one spacing beyond the array.  Downstream spectra depend
//! on this exact policy, asymmetries included.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use ndarray::Array1;
use pyo3::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while building or persisting notch lists.
#[derive(Debug, thiserror::Error)]
pub enum NotchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed notch entry: {0}")]
    MalformedNotchInput(String),

    #[error("cannot parse '{value}' as a frequency: {source}")]
    BadFrequency {
        value: String,
        source: std::num::ParseFloatError,
    },
}

impl From<NotchError> for PyErr {
    fn from(e: NotchError) -> PyErr {
        match e {
            NotchError::Io(_) => pyo3::exceptions::PyIOError::new_err(e.to_string()),
            _ => pyo3::exceptions::PyValueError::new_err(e.to_string()),
        }
    }
}

fn parse_frequency(field: &str) -> Result<f64, NotchError> {
    let trimmed = field.trim();
    trimmed.parse().map_err(|source| NotchError::BadFrequency {
        value: trimmed.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Notch
// ---------------------------------------------------------------------------

/// A single frequency interval excluded from analysis.
///
/// Callers are responsible for passing `minimum_frequency <=
/// maximum_frequency`; the bounds are not reordered or validated here.
#[pyclass(get_all, set_all)]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notch {
    /// Lower edge of the excluded interval, Hz.
    pub minimum_frequency: f64,

    /// Upper edge of the excluded interval, Hz.
    pub maximum_frequency: f64,

    /// Origin of the notch, e.g. `"Power Lines"` or `"Pulsar injection"`.
    pub description: String,
}

#[pymethods]
impl Notch {
    #[new]
    pub fn new(minimum_frequency: f64, maximum_frequency: f64, description: String) -> Self {
        Self {
            minimum_frequency,
            maximum_frequency,
            description,
        }
    }

    /// Whether `freq` lies inside the notch (closed interval).
    pub fn check_frequency(&self, freq: f64) -> bool {
        self.minimum_frequency <= freq && freq <= self.maximum_frequency
    }

    fn __repr__(&self) -> String {
        format!(
            "Notch({}-{} Hz, '{}')",
            self.minimum_frequency, self.maximum_frequency, self.description,
        )
    }
}

// ---------------------------------------------------------------------------
// NotchList
// ---------------------------------------------------------------------------

/// An ordered collection of [`Notch`]es.
///
/// Semantically a coverage set: duplicates are legal but meaningless.  The
/// list is non-decreasing by `minimum_frequency` after [`sort_list`]
/// (`save_to_txt` sorts as a side effect); mutation does not re-sort.
///
/// [`sort_list`]: NotchList::sort_list
#[pyclass]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotchList {
    notches: Vec<Notch>,
}

#[pymethods]
impl NotchList {
    /// Build a list from an optional sequence of `(min, max, description)`
    /// 3-tuples.  Any element that is not such a tuple fails the whole
    /// construction.
    #[new]
    #[pyo3(signature = (notch_list=None))]
    fn py_new(notch_list: Option<Vec<Bound<'_, PyAny>>>) -> PyResult<Self> {
        let mut list = Self::default();
        if let Some(entries) = notch_list {
            for entry in &entries {
                let (minimum, maximum, description) = entry
                    .extract::<(f64, f64, String)>()
                    .map_err(|_| NotchError::MalformedNotchInput(format!("{entry:?}")))?;
                list.notches.push(Notch::new(minimum, maximum, description));
            }
        }
        Ok(list)
    }

    /// Whether `freq` lies inside any contained notch.
    pub fn check_frequency(&self, freq: f64) -> bool {
        self.notches.iter().any(|notch| notch.check_frequency(freq))
    }

    /// Sort the notches by minimum frequency, ascending (stable, in place).
    pub fn sort_list(&mut self) {
        self.notches.sort_by(|a, b| {
            a.minimum_frequency
                .partial_cmp(&b.minimum_frequency)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// Mask a frequency array against the notch list from Python.
    ///
    /// Returns `(idxs, inv_idxs)`: booleans which are `True` for notched
    /// bins, and their elementwise negation.
    #[pyo3(name = "get_idxs")]
    fn py_get_idxs(&self, frequency_array: Vec<f64>) -> (Vec<bool>, Vec<bool>) {
        let (mask, inverse) = self.get_idxs(&Array1::from(frequency_array));
        (mask.to_vec(), inverse.to_vec())
    }

    /// Save the list to a text file (sorting it first) from Python.
    #[pyo3(name = "save_to_txt")]
    fn py_save_to_txt(&mut self, filename: &str) -> PyResult<()> {
        Ok(self.save_to_txt(filename)?)
    }

    /// Load a notch list written by `save_to_txt` from Python.
    #[staticmethod]
    #[pyo3(name = "load_from_file")]
    fn py_load_from_file(filename: &str) -> PyResult<Self> {
        Ok(Self::load_from_file(filename)?)
    }

    /// Load a notch list in the pre-pyGWB archive format from Python.
    #[staticmethod]
    #[pyo3(name = "load_from_file_pre_pyGWB")]
    fn py_load_from_file_pre_pygwb(filename: &str) -> PyResult<Self> {
        Ok(Self::load_from_file_pre_pygwb(filename)?)
    }

    /// Serialise the list to a JSON string for interoperability.
    pub fn to_json(&self) -> PyResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    #[getter(notches)]
    fn py_notches(&self) -> Vec<Notch> {
        self.notches.clone()
    }

    fn __len__(&self) -> usize {
        self.notches.len()
    }

    fn __repr__(&self) -> String {
        format!("NotchList({} notches)", self.notches.len())
    }
}

impl NotchList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from `(min, max, description)` triples.
    pub fn from_tuples<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, S)>,
        S: Into<String>,
    {
        Self {
            notches: entries
                .into_iter()
                .map(|(minimum, maximum, description)| {
                    Notch::new(minimum, maximum, description.into())
                })
                .collect(),
        }
    }

    /// The contained notches, in current order.
    pub fn notches(&self) -> &[Notch] {
        &self.notches
    }

    pub fn len(&self) -> usize {
        self.notches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notches.is_empty()
    }

    /// Boolean mask of the frequency bins whose reconstruction window
    /// overlaps a notch, plus its elementwise negation.
    ///
    /// Bin `i` is flagged when some notch is neither entirely below bin
    /// `i − 1` nor entirely above bin `i + 1`; the first and last bins use
    /// windows extrapolated one spacing beyond the array.  Bin values are
    /// rounded at the array's own spacing resolution before comparison, so
    /// float jitter in the sampled grid cannot flip a bin.
    ///
    /// # Panics
    /// If `frequency_array` has fewer than 3 bins (the spacing is read from
    /// bins 1 and 2, as in the reference pipeline).
    pub fn get_idxs(&self, frequency_array: &Array1<f64>) -> (Array1<bool>, Array1<bool>) {
        let n = frequency_array.len();
        let df = (frequency_array[2] - frequency_array[1]).abs();
        let precision = decimal_precision(df);
        let round_bin = |x: f64| round_to(x, precision);

        debug!(
            "Masking {} bins against {} notches (df = {}, precision = {})",
            n,
            self.notches.len(),
            df,
            precision,
        );

        let mask: Vec<bool> = (0..n)
            .into_par_iter()
            .map(|i| {
                let (window_low, window_high) = if i == 0 {
                    (round_bin(frequency_array[0]) - df, round_bin(frequency_array[1]))
                } else if i == n - 1 {
                    (round_bin(frequency_array[n - 2]), round_bin(frequency_array[n - 1]) + df)
                } else {
                    (round_bin(frequency_array[i - 1]), round_bin(frequency_array[i + 1]))
                };
                self.notches.iter().any(|notch| {
                    !(notch.maximum_frequency <= window_low)
                        && !(notch.minimum_frequency >= window_high)
                })
            })
            .collect();

        let inverse: Vec<bool> = mask.iter().map(|flagged| !flagged).collect();
        (Array1::from(mask), Array1::from(inverse))
    }

    /// Save the list to a text file, sorting it first (mutating side
    /// effect).
    ///
    /// One line per notch: minimum, maximum, and description as
    /// comma-separated left-justified fixed-width columns, the description
    /// column sized to the longest description.  Round-trips through
    /// [`NotchList::load_from_file`].
    pub fn save_to_txt<P: AsRef<Path>>(&mut self, path: P) -> Result<(), NotchError> {
        self.sort_list();

        let width = self
            .notches
            .iter()
            .map(|notch| notch.description.len())
            .max()
            .unwrap_or(0)
            + 5;

        let mut out = BufWriter::new(File::create(&path)?);
        for notch in &self.notches {
            writeln!(
                out,
                "{:<20}  ,  {:<20}  ,  {:<width$}",
                notch.minimum_frequency, notch.maximum_frequency, notch.description,
            )?;
        }
        out.flush()?;

        info!(
            "Saved {} notches to {}",
            self.notches.len(),
            path.as_ref().display(),
        );
        Ok(())
    }

    /// Load a notch list from a text file in the format produced by
    /// [`NotchList::save_to_txt`]: three comma-separated columns, single-
    /// and multi-row files alike.  Blank lines and `#` comments are skipped.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, NotchError> {
        let mut list = Self::new();
        for line in BufReader::new(File::open(&path)?).lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut columns = trimmed.splitn(3, ',');
            let (minimum, maximum, description) =
                match (columns.next(), columns.next(), columns.next()) {
                    (Some(minimum), Some(maximum), Some(description)) => {
                        (minimum, maximum, description)
                    }
                    _ => return Err(NotchError::MalformedNotchInput(line.clone())),
                };
            list.notches.push(Notch::new(
                parse_frequency(minimum)?,
                parse_frequency(maximum)?,
                description.trim().to_string(),
            ));
        }

        info!(
            "Loaded {} notches from {}",
            list.notches.len(),
            path.as_ref().display(),
        );
        Ok(list)
    }

    /// Load a notch list in the legacy pre-pyGWB archive layout.
    ///
    /// One header row, then rows whose first two whitespace-separated
    /// fields are the quote-wrapped minimum (one leading and one trailing
    /// character stripped) and the bracket-wrapped maximum (one trailing
    /// character stripped); the description is the second tab-separated
    /// field of the same row.  The stripping is tied to that one historical
    /// layout and is kept behind this loader only.
    pub fn load_from_file_pre_pygwb<P: AsRef<Path>>(path: P) -> Result<Self, NotchError> {
        let mut list = Self::new();
        for (row, line) in BufReader::new(File::open(&path)?).lines().enumerate() {
            let line = line?;
            if row == 0 || line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (raw_minimum, raw_maximum) = match (fields.next(), fields.next()) {
                (Some(minimum), Some(maximum)) => (minimum, maximum),
                _ => return Err(NotchError::MalformedNotchInput(line.clone())),
            };
            let minimum = raw_minimum
                .get(1..raw_minimum.len() - 1)
                .ok_or_else(|| NotchError::MalformedNotchInput(line.clone()))?;
            let maximum = raw_maximum
                .get(..raw_maximum.len() - 1)
                .ok_or_else(|| NotchError::MalformedNotchInput(line.clone()))?;

            let description = line
                .split('\t')
                .nth(1)
                .ok_or_else(|| NotchError::MalformedNotchInput(line.clone()))?;

            list.notches.push(Notch::new(
                parse_frequency(minimum)?,
                parse_frequency(maximum)?,
                description.trim().to_string(),
            ));
        }

        info!(
            "Loaded {} notches from legacy file {}",
            list.notches.len(),
            path.as_ref().display(),
        );
        Ok(list)
    }
}

/// Digits after the decimal point in the default rendering of `df`, i.e.
/// the resolution at which the frequency grid itself distinguishes bins.
fn decimal_precision(df: f64) -> i32 {
    let mut rendered = format!("{df}");
    if !rendered.contains('.') {
        rendered.push_str(".0");
    }
    let dot = rendered.find('.').unwrap();
    (rendered.len() - dot - 1) as i32
}

fn round_to(x: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (x * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Notches for the mains power line and its harmonics:
/// `k·fundamental` for `k = 1..=nharmonics`, each `df` wide.
pub fn power_lines(fundamental: f64, nharmonics: u32, df: f64) -> NotchList {
    let mut notches = NotchList::new();
    for k in 1..=nharmonics {
        let f0 = fundamental * k as f64;
        notches
            .notches
            .push(Notch::new(f0 - df / 2.0, f0 + df / 2.0, "Power Lines".to_string()));
    }
    notches
}

/// Notches for a frequency comb `f0 + n·f_spacing`, `n = 0..n_harmonics`,
/// each `df` wide.  `description` optionally names the known source of the
/// comb and is appended to the auto-generated description.
pub fn comb(
    f0: f64,
    f_spacing: f64,
    n_harmonics: u32,
    df: f64,
    description: Option<&str>,
) -> NotchList {
    let mut notches = NotchList::new();
    for n in 0..n_harmonics {
        let f = f0 + n as f64 * f_spacing;
        let mut total_description = format!("Comb with fundamental freq {f0} and spacing {f_spacing}");
        if let Some(extra) = description.filter(|extra| !extra.is_empty()) {
            total_description.push(' ');
            total_description.push_str(extra);
        }
        notches
            .notches
            .push(Notch::new(f - df / 2.0, f + df / 2.0, total_description));
    }
    notches
}

/// Notches for frequencies contaminated by hardware pulsar injections.
///
/// `path` points to a whitespace-delimited file of `t_ref f_ref f_dot`
/// rows (GPS reference time, reference frequency, spin-down).  Each
/// pulsar's frequency is extrapolated linearly to `t_start` and `t_end`,
/// widened symmetrically by the Doppler factor for the Earth's motion
/// (`v/c ≈ 1e-4`), and the swept band becomes one notch.
pub fn pulsar_injections<P: AsRef<Path>>(
    path: P,
    t_start: f64,
    t_end: f64,
    doppler: f64,
) -> Result<NotchList, NotchError> {
    let mut notches = NotchList::new();
    for line in BufReader::new(File::open(&path)?).lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut fields = trimmed.split_whitespace();
        let (t_ref, f_ref, f_dot) = match (fields.next(), fields.next(), fields.next()) {
            (Some(t_ref), Some(f_ref), Some(f_dot)) => (
                parse_frequency(t_ref)?,
                parse_frequency(f_ref)?,
                parse_frequency(f_dot)?,
            ),
            _ => return Err(NotchError::MalformedNotchInput(line.clone())),
        };

        let f_start = f_ref + f_dot * (t_start - t_ref);
        let f_end = f_ref + f_dot * (t_end - t_ref);
        let f1 = f_start * (1.0 + doppler);
        let f2 = f_end * (1.0 - doppler);
        let f0 = (f1 + f2) / 2.0;
        let df = f1 - f2;
        notches
            .notches
            .push(Notch::new(f0 - df / 2.0, f0 + df / 2.0, "Pulsar injection".to_string()));
    }

    info!(
        "Built {} pulsar-injection notches from {}",
        notches.notches.len(),
        path.as_ref().display(),
    );
    Ok(notches)
}

// ---------------------------------------------------------------------------
// Python-facing generator wrappers
// ---------------------------------------------------------------------------

/// Generate power-line harmonic notches from Python.
#[pyfunction]
#[pyo3(name = "power_lines")]
#[pyo3(signature = (fundamental=60.0, nharmonics=40, df=0.2))]
pub fn py_power_lines(fundamental: f64, nharmonics: u32, df: f64) -> NotchList {
    power_lines(fundamental, nharmonics, df)
}

/// Generate comb-line notches from Python.
#[pyfunction]
#[pyo3(name = "comb")]
#[pyo3(signature = (f0, f_spacing, n_harmonics, df, description=None))]
pub fn py_comb(
    f0: f64,
    f_spacing: f64,
    n_harmonics: u32,
    df: f64,
    description: Option<String>,
) -> NotchList {
    comb(f0, f_spacing, n_harmonics, df, description.as_deref())
}

/// Generate pulsar-injection notches from Python.
#[pyfunction]
#[pyo3(name = "pulsar_injections")]
#[pyo3(signature = (filename, t_start, t_end, doppler=1e-4))]
pub fn py_pulsar_injections(
    filename: &str,
    t_start: f64,
    t_end: f64,
    doppler: f64,
) -> PyResult<NotchList> {
    Ok(pulsar_injections(filename, t_start, t_end, doppler)?)
}
