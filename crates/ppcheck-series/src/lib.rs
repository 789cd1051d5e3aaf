//! Time- and frequency-series containers and their array-document encoding.
//!
//! A series is stored as a [`SeriesDocument`]: a named array whose first
//! column is the sample axis (`index * delta`) followed by one column per
//! sample component (real, or real and imaginary). PSDs are collections of
//! real frequency series keyed by instrument.

pub mod document;
pub mod gps;
pub mod psd;
pub mod series;

pub use document::{ArrayBlock, Dim, SeriesDocument, build_series, parse_series};
pub use gps::GpsTime;
pub use psd::{PsdDocument, make_psd_document, read_psd_document, read_psd_file, write_psd_file};
pub use series::{
    Axis, Complex16FrequencySeries, Complex16TimeSeries, Complex64, FrequencySeries,
    Real8FrequencySeries, Real8TimeSeries, SeriesKind, SeriesSample, TimeSeries,
};
