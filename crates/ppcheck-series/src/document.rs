//! Array-document encoding of a single series.
//!
//! Layout of [`ArrayBlock::columns`] for a series of `n` samples:
//!
//! | column | contents                 |
//! |--------|--------------------------|
//! | 0      | `i * delta`, `i in 0..n` |
//! | 1      | real part                |
//! | 2      | imaginary part (complex) |
//!
//! `dims[0]` describes the sample axis (unit, start, scale = delta) and
//! `dims[1]` names the stacked columns (`"Frequency,Real,Imaginary"`).

use ppcheck_error::{PpError, Result};
use serde::{Deserialize, Serialize};

use crate::gps::GpsTime;
use crate::series::{SeriesKind, SeriesSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dim {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayBlock {
    pub name: String,
    /// Units of the sample values.
    pub unit: String,
    pub dims: Vec<Dim>,
    pub columns: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDocument {
    /// `REAL8TimeSeries`, `COMPLEX16FrequencySeries`, ...
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub epoch: GpsTime,
    pub f0: f64,
    /// Set on PSD entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    pub array: ArrayBlock,
}

/// Encode `series` as a document, with an optional free-text comment.
pub fn build_series<S: SeriesKind>(series: &S, comment: Option<&str>) -> SeriesDocument {
    let axis = S::AXIS;
    let components = <S::Sample as SeriesSample>::COMPONENTS;
    let data = series.data();
    let delta = series.delta();

    let mut columns = Vec::with_capacity(1 + components.len());
    columns.push((0..data.len()).map(|i| i as f64 * delta).collect());
    for index in 0..components.len() {
        columns.push(data.iter().map(|sample| sample.component(index)).collect());
    }

    let mut stacked = axis.name().to_owned();
    for component in components {
        stacked.push(',');
        stacked.push_str(component);
    }

    SeriesDocument {
        kind: S::kind(),
        comment: comment.map(str::to_owned),
        epoch: series.epoch(),
        f0: series.f0(),
        instrument: None,
        array: ArrayBlock {
            name: series.name().to_owned(),
            unit: series.sample_units().to_owned(),
            dims: vec![
                Dim {
                    name: axis.name().to_owned(),
                    unit: Some(axis.unit().to_owned()),
                    start: Some(series.f0()),
                    scale: Some(delta),
                },
                Dim {
                    name: stacked,
                    unit: None,
                    start: None,
                    scale: None,
                },
            ],
            columns,
        },
    }
}

/// Decode a document into a series of the requested kind.
pub fn parse_series<S: SeriesKind>(document: &SeriesDocument) -> Result<S> {
    let expected = S::kind();
    let malformed = |detail: String| PpError::MalformedDocument {
        kind: expected.clone(),
        detail,
    };

    if document.kind != expected {
        return Err(malformed(format!("document kind is {}", document.kind)));
    }

    let components = <S::Sample as SeriesSample>::COMPONENTS.len();
    let columns = &document.array.columns;
    if columns.len() != 1 + components {
        return Err(malformed(format!(
            "expected {} columns, found {}",
            1 + components,
            columns.len()
        )));
    }
    let len = columns[0].len();
    if let Some(ragged) = columns.iter().position(|column| column.len() != len) {
        return Err(malformed(format!(
            "column {ragged} has {} entries, axis column has {len}",
            columns[ragged].len()
        )));
    }

    let axis_dim = document
        .array
        .dims
        .first()
        .ok_or_else(|| malformed("missing axis dimension".to_owned()))?;
    if axis_dim.name != S::AXIS.name() {
        return Err(malformed(format!(
            "axis dimension is {}, expected {}",
            axis_dim.name,
            S::AXIS.name()
        )));
    }
    let delta = axis_dim
        .scale
        .ok_or_else(|| malformed("axis dimension has no scale".to_owned()))?;

    let mut parts = vec![0.0; components];
    let data = (0..len)
        .map(|row| {
            for (slot, column) in parts.iter_mut().zip(&columns[1..]) {
                *slot = column[row];
            }
            <S::Sample as SeriesSample>::from_components(&parts)
        })
        .collect();

    Ok(S::assemble(
        document.array.name.clone(),
        document.epoch,
        document.f0,
        delta,
        document.array.unit.clone(),
        data,
    ))
}
