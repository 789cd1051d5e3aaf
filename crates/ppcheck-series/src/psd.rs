//! Multi-instrument PSD documents.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ppcheck_error::{PpError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{SeriesDocument, build_series, parse_series};
use crate::series::{Real8FrequencySeries, SeriesKind};

/// One real frequency series per instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PsdDocument {
    pub series: Vec<SeriesDocument>,
}

impl PsdDocument {
    /// Append every series of `other`.
    pub fn extend(&mut self, other: Self) {
        self.series.extend(other.series);
    }

    #[must_use]
    pub fn instruments(&self) -> Vec<&str> {
        self.series
            .iter()
            .filter_map(|doc| doc.instrument.as_deref())
            .collect()
    }
}

/// Build a PSD document from a per-instrument map. Entries come out in
/// instrument order.
#[must_use]
pub fn make_psd_document(psds: &BTreeMap<String, Real8FrequencySeries>) -> PsdDocument {
    let series = psds
        .iter()
        .map(|(instrument, psd)| {
            let mut doc = build_series(psd, None);
            doc.instrument = Some(instrument.clone());
            doc
        })
        .collect();
    PsdDocument { series }
}

/// Read every PSD out of a document. An instrument whose series has no
/// samples maps to `None`.
pub fn read_psd_document(
    document: &PsdDocument,
) -> Result<BTreeMap<String, Option<Real8FrequencySeries>>> {
    let mut out = BTreeMap::new();
    for doc in &document.series {
        if doc.kind != Real8FrequencySeries::kind() {
            debug!(kind = %doc.kind, "skipping non-PSD series");
            continue;
        }
        let instrument = doc.instrument.clone().ok_or_else(|| PpError::MalformedDocument {
            kind: doc.kind.clone(),
            detail: format!("series {:?} has no instrument", doc.array.name),
        })?;
        let series: Real8FrequencySeries = parse_series(doc)?;
        let entry = if series.data.is_empty() {
            None
        } else {
            Some(series)
        };
        out.insert(instrument, entry);
    }
    Ok(out)
}

pub fn write_psd_file(path: &Path, document: &PsdDocument) -> Result<()> {
    let text = serde_json::to_string_pretty(document)?;
    fs::write(path, text)?;
    info!(
        path = %path.display(),
        instruments = document.series.len(),
        "wrote PSD document"
    );
    Ok(())
}

pub fn read_psd_file(path: &Path) -> Result<BTreeMap<String, Option<Real8FrequencySeries>>> {
    let text = fs::read_to_string(path)?;
    let document: PsdDocument = serde_json::from_str(&text)?;
    debug!(path = %path.display(), entries = document.series.len(), "read PSD document");
    read_psd_document(&document)
}
