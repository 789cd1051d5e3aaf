//! Parameter names, aliases, display labels and derived mass parameters.

use std::collections::BTreeMap;

/// Parameters tested when none are requested.
pub const DEFAULT_PARAMETERS: [&str; 18] = [
    "m1", "m2", "mc", "eta", "q", "theta_jn", "a1", "a2", "tilt1", "tilt2", "phi12", "phi_jl",
    "ra", "dec", "dist", "time", "phi_orb", "psi",
];

/// Injection-table and sample-file column names with a different posterior name.
const ALIASES: [(&str, &str); 9] = [
    ("mass1", "m1"),
    ("mass2", "m2"),
    ("mchirp", "mc"),
    ("distance", "dist"),
    ("longitude", "ra"),
    ("latitude", "dec"),
    ("coa_phase", "phi_orb"),
    ("polarization", "psi"),
    ("inclination", "iota"),
];

const LABELS: [(&str, &str); 23] = [
    ("m1", r"$m_1$"),
    ("m2", r"$m_2$"),
    ("eta", r"$\eta$"),
    ("q", r"$q$"),
    ("mc", r"$\mathcal{M}$"),
    ("dist", r"$d$"),
    ("time", r"$t$"),
    ("ra", r"$\alpha$"),
    ("dec", r"$\delta$"),
    ("phi_orb", r"$\phi_\mathrm{orb}$"),
    ("psi", r"$\psi$"),
    ("iota", r"$\iota$"),
    ("a1", r"$a_1$"),
    ("a2", r"$a_2$"),
    ("theta1", r"$\theta_1$"),
    ("theta2", r"$\theta_2$"),
    ("phi1", r"$\phi_1$"),
    ("phi2", r"$\phi_2$"),
    ("phi12", r"$\phi_{12}$"),
    ("phi_jl", r"$\phi_{jl}$"),
    ("theta_jn", r"$\theta_{jn}$"),
    ("tilt1", r"$\tau_1$"),
    ("tilt2", r"$\tau_2$"),
];

/// The default parameter list as owned names.
#[must_use]
pub fn default_parameters() -> Vec<String> {
    DEFAULT_PARAMETERS.iter().map(|name| (*name).to_owned()).collect()
}

/// Lowercase `column` and map known aliases onto posterior names.
#[must_use]
pub fn canonical_name(column: &str) -> String {
    let lower = column.trim().to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map_or(lower, |(_, name)| (*name).to_owned())
}

/// LaTeX label of a parameter; unknown parameters fall back to their name.
#[must_use]
pub fn latex_label(parameter: &str) -> &str {
    LABELS
        .iter()
        .find(|(name, _)| *name == parameter)
        .map_or(parameter, |(_, label)| *label)
}

#[must_use]
pub fn chirp_mass(m1: f64, m2: f64) -> f64 {
    (m1 * m2).powf(0.6) / (m1 + m2).powf(0.2)
}

#[must_use]
pub fn symmetric_mass_ratio(m1: f64, m2: f64) -> f64 {
    let total = m1 + m2;
    m1 * m2 / (total * total)
}

#[must_use]
pub fn mass_ratio(m1: f64, m2: f64) -> f64 {
    m2 / m1
}

/// Insert `mc`, `eta` and `q` computed from `m1`/`m2` where absent.
///
/// Works on scalar truths and sample columns alike: `values` maps a name to
/// a slice of equal-length columns (length 1 for a single record).
pub fn extend_mass_parameters(values: &mut BTreeMap<String, Vec<f64>>) {
    let (Some(m1), Some(m2)) = (values.get("m1"), values.get("m2")) else {
        return;
    };
    if m1.len() != m2.len() {
        return;
    }
    let derived: [(&str, fn(f64, f64) -> f64); 3] = [
        ("mc", chirp_mass),
        ("eta", symmetric_mass_ratio),
        ("q", mass_ratio),
    ];
    let columns: Vec<(&str, Vec<f64>)> = derived
        .iter()
        .filter(|(name, _)| !values.contains_key(*name))
        .map(|(name, f)| (*name, m1.iter().zip(m2).map(|(&a, &b)| f(a, b)).collect()))
        .collect();
    for (name, column) in columns {
        values.insert(name.to_owned(), column);
    }
}
