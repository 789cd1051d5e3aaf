//! Series containers.

use serde::{Deserialize, Serialize};

use crate::gps::GpsTime;

/// Sample axis of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Time,
    Frequency,
}

impl Axis {
    /// Dimension name used in documents.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::Frequency => "Frequency",
        }
    }

    /// Unit of the axis spacing.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Time => "s",
            Self::Frequency => "s^-1",
        }
    }
}

/// Double-precision complex sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    #[must_use]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// A sample type that can be split into real-valued document columns.
pub trait SeriesSample: Copy {
    /// Type tag prefix of the document kind (`REAL8`, `COMPLEX16`).
    const TYPE_TAG: &'static str;
    /// Names of the value columns following the axis column.
    const COMPONENTS: &'static [&'static str];

    fn component(&self, index: usize) -> f64;

    /// Rebuild a sample from one value per entry of [`Self::COMPONENTS`].
    fn from_components(parts: &[f64]) -> Self;
}

impl SeriesSample for f64 {
    const TYPE_TAG: &'static str = "REAL8";
    const COMPONENTS: &'static [&'static str] = &["Real"];

    fn component(&self, _index: usize) -> f64 {
        *self
    }

    fn from_components(parts: &[f64]) -> Self {
        parts[0]
    }
}

impl SeriesSample for Complex64 {
    const TYPE_TAG: &'static str = "COMPLEX16";
    const COMPONENTS: &'static [&'static str] = &["Real", "Imaginary"];

    fn component(&self, index: usize) -> f64 {
        if index == 0 { self.re } else { self.im }
    }

    fn from_components(parts: &[f64]) -> Self {
        Self::new(parts[0], parts[1])
    }
}

/// Uniformly sampled time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<T> {
    pub name: String,
    pub epoch: GpsTime,
    /// Heterodyne frequency, Hz.
    pub f0: f64,
    /// Sample spacing, s.
    pub delta_t: f64,
    pub sample_units: String,
    pub data: Vec<T>,
}

/// Uniformly sampled frequency series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencySeries<T> {
    pub name: String,
    pub epoch: GpsTime,
    /// Frequency of the first bin, Hz.
    pub f0: f64,
    /// Bin spacing, Hz.
    pub delta_f: f64,
    pub sample_units: String,
    pub data: Vec<T>,
}

pub type Real8TimeSeries = TimeSeries<f64>;
pub type Complex16TimeSeries = TimeSeries<Complex64>;
pub type Real8FrequencySeries = FrequencySeries<f64>;
pub type Complex16FrequencySeries = FrequencySeries<Complex64>;

/// Common view over time and frequency series, used by the document codec.
pub trait SeriesKind: Sized {
    type Sample: SeriesSample;
    const AXIS: Axis;

    fn name(&self) -> &str;
    fn epoch(&self) -> GpsTime;
    fn f0(&self) -> f64;
    fn delta(&self) -> f64;
    fn sample_units(&self) -> &str;
    fn data(&self) -> &[Self::Sample];

    fn assemble(
        name: String,
        epoch: GpsTime,
        f0: f64,
        delta: f64,
        sample_units: String,
        data: Vec<Self::Sample>,
    ) -> Self;

    /// Document kind, e.g. `REAL8FrequencySeries`.
    fn kind() -> String {
        format!(
            "{}{}Series",
            <Self::Sample as SeriesSample>::TYPE_TAG,
            Self::AXIS.name()
        )
    }
}

macro_rules! impl_series_kind {
    ($ty:ident, $axis:expr, $delta:ident) => {
        impl<T: SeriesSample> SeriesKind for $ty<T> {
            type Sample = T;
            const AXIS: Axis = $axis;

            fn name(&self) -> &str {
                &self.name
            }
            fn epoch(&self) -> GpsTime {
                self.epoch
            }
            fn f0(&self) -> f64 {
                self.f0
            }
            fn delta(&self) -> f64 {
                self.$delta
            }
            fn sample_units(&self) -> &str {
                &self.sample_units
            }
            fn data(&self) -> &[T] {
                &self.data
            }

            fn assemble(
                name: String,
                epoch: GpsTime,
                f0: f64,
                delta: f64,
                sample_units: String,
                data: Vec<T>,
            ) -> Self {
                Self {
                    name,
                    epoch,
                    f0,
                    $delta: delta,
                    sample_units,
                    data,
                }
            }
        }
    };
}

impl_series_kind!(TimeSeries, Axis::Time, delta_t);
impl_series_kind!(FrequencySeries, Axis::Frequency, delta_f);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Real8TimeSeries::kind(), "REAL8TimeSeries");
        assert_eq!(Complex16TimeSeries::kind(), "COMPLEX16TimeSeries");
        assert_eq!(Real8FrequencySeries::kind(), "REAL8FrequencySeries");
        assert_eq!(Complex16FrequencySeries::kind(), "COMPLEX16FrequencySeries");
    }

    #[test]
    fn complex_components() {
        let z = Complex64::new(1.5, -2.0);
        assert_eq!(z.component(0), 1.5);
        assert_eq!(z.component(1), -2.0);
        assert_eq!(Complex64::from_components(&[1.5, -2.0]), z);
    }
}
