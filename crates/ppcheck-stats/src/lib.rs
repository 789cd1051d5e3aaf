//! Statistical core of the p-p coverage check.
//!
//! - [`rank`]: fractional rank of a true value inside a posterior sample set.
//! - [`kolmogorov`]: the one-sample KS statistic and the distribution of the
//!   two-sided statistic (exact for moderate `n`, asymptotic above).
//! - [`uniformity`]: KS test of pooled ranks against U(0, 1).
//! - [`pp_curve`]: p-p curve coordinates and seeded synthetic reference curves.

pub mod kolmogorov;
pub mod pp_curve;
pub mod rank;
pub mod uniformity;

pub use kolmogorov::{KsStatistic, PValueMethod, ks_statistic, ks_two_sided_pvalue};
pub use pp_curve::{PpCurve, synthetic_reference_curves};
pub use rank::fractional_rank;
pub use uniformity::{DEGENERATE_BELOW, UniformityTest, test_uniformity};
