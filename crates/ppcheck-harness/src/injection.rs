//! Injection table: the true parameter values of every simulated signal.
//!
//! The table is a JSON array with one object per injection, in the same order
//! as the posterior sample files. Column names follow either posterior naming
//! (`m1`, `dist`) or injection-table naming (`mass1`, `distance`); both are
//! normalized on load. Non-numeric columns are ignored.

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::fs;
use std::path::Path;

use ppcheck_error::{PpError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::params::{canonical_name, chirp_mass, mass_ratio, symmetric_mass_ratio};

const END_TIME: &str = "geocent_end_time";
const END_TIME_NS: &str = "geocent_end_time_ns";
const SPIN_COMPONENTS: [[&str; 3]; 2] = [
    ["spin1x", "spin1y", "spin1z"],
    ["spin2x", "spin2y", "spin2z"],
];

/// True parameter values of one injection, keyed by posterior name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InjectionRecord {
    values: BTreeMap<String, f64>,
}

impl InjectionRecord {
    /// Build a record from raw table columns.
    #[must_use]
    pub fn from_columns<I, K>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut values = BTreeMap::new();
        let mut end_time = None;
        let mut end_time_ns = None;
        for (column, value) in columns {
            let column = column.as_ref();
            match column.trim().to_ascii_lowercase().as_str() {
                END_TIME => end_time = Some(value),
                END_TIME_NS => end_time_ns = Some(value),
                _ => {
                    values.insert(canonical_name(column), value);
                }
            }
        }

        if let Some(seconds) = end_time {
            values
                .entry("time".to_owned())
                .or_insert_with(|| seconds + end_time_ns.unwrap_or(0.0) * 1e-9);
        }

        if let (Some(&m1), Some(&m2)) = (values.get("m1"), values.get("m2")) {
            values.entry("mc".to_owned()).or_insert_with(|| chirp_mass(m1, m2));
            values
                .entry("eta".to_owned())
                .or_insert_with(|| symmetric_mass_ratio(m1, m2));
            values.entry("q".to_owned()).or_insert_with(|| mass_ratio(m1, m2));
        }

        extend_spin_parameters(&mut values);

        Self { values }
    }

    /// True value of `parameter`, accepting either naming convention.
    #[must_use]
    pub fn value(&self, parameter: &str) -> Option<f64> {
        self.values
            .get(parameter)
            .or_else(|| self.values.get(&canonical_name(parameter)))
            .copied()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Cartesian spin of one body; `None` when the table has none of its columns.
fn spin_vector(values: &BTreeMap<String, f64>, names: [&str; 3]) -> Option<[f64; 3]> {
    if names.iter().all(|name| !values.contains_key(*name)) {
        return None;
    }
    Some(names.map(|name| values.get(name).copied().unwrap_or(0.0)))
}

/// Insert `a1`/`a2`, `tilt1`/`tilt2`, `phi12` and the non-precessing
/// `theta_jn` computed from the Cartesian spin columns where absent.
///
/// `phi_jl` and a precessing `theta_jn` depend on the orbital angular momentum
/// at the reference frequency and must come from explicit columns.
fn extend_spin_parameters(values: &mut BTreeMap<String, f64>) {
    let view: &BTreeMap<String, f64> = values;
    let spins = SPIN_COMPONENTS.map(|names| spin_vector(view, names));

    for (body, spin) in (1..).zip(spins) {
        let Some([x, y, z]) = spin else {
            continue;
        };
        let magnitude = (x * x + y * y + z * z).sqrt();
        let tilt = if magnitude > 0.0 {
            (z / magnitude).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };
        values.entry(format!("a{body}")).or_insert(magnitude);
        values.entry(format!("tilt{body}")).or_insert(tilt);
    }

    if let [Some([s1x, s1y, _]), Some([s2x, s2y, _])] = spins {
        values
            .entry("phi12".to_owned())
            .or_insert_with(|| (s2y.atan2(s2x) - s1y.atan2(s1x)).rem_euclid(TAU));
    }

    // J is parallel to L without in-plane spin.
    let aligned = spins
        .iter()
        .flatten()
        .all(|[x, y, _]| *x == 0.0 && *y == 0.0);
    if let Some(iota) = values.get("iota").copied().filter(|_| aligned) {
        values.entry("theta_jn".to_owned()).or_insert(iota);
    }
}

/// Ordered injection records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectionTable {
    records: Vec<InjectionRecord>,
}

impl InjectionTable {
    #[must_use]
    pub fn new(records: Vec<InjectionRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let table = Self::from_json_str(&text, path)?;
        debug!(path = %path.display(), injections = table.len(), "loaded injection table");
        Ok(table)
    }

    /// Parse a JSON array of injection objects. `path` is only used in errors.
    pub fn from_json_str(text: &str, path: &Path) -> Result<Self> {
        let rows: Vec<BTreeMap<String, Value>> =
            serde_json::from_str(text).map_err(|error| PpError::Parse {
                path: path.to_path_buf(),
                line: error.line(),
                detail: error.to_string(),
            })?;
        let records = rows
            .into_iter()
            .map(|row| {
                InjectionRecord::from_columns(
                    row.into_iter()
                        .filter_map(|(column, value)| value.as_f64().map(|v| (column, v))),
                )
            })
            .collect();
        Ok(Self { records })
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&InjectionRecord> {
        self.records.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
