//! Summaries of one-dimensional samples, as drawn by box-plots and violin-plots.
//!
//! Non-finite values are dropped from every sample before it is summarised.

use core::f64::consts::TAU;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::Error;

/// The finite values of `sample`, sorted ascending.
fn finite_sorted(sample: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = sample.iter().copied().filter(|x| x.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

#[expect(
    clippy::as_conversions,
    clippy::cast_precision_loss,
    reason = "Sample-sizes are far below 2^52."
)]
fn count_as_float(count: usize) -> f64 {
    count as f64
}

/// The `p`-quantile of an ascending sample.
///
/// Interpolates linearly between the two closest ranks (type 7 in Hyndman & Fan), so
/// `quantile(sorted, 0.5)` is the usual median. Returns `None` if `sorted` is empty or `p` lies
/// outside `0.0..=1.0`.
///
/// ```
/// use chart_numerics::distribution::quantile;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0];
/// assert_eq!(quantile(&sorted, 0.5), Some(2.5));
/// assert_eq!(quantile(&sorted, 1.0), Some(4.0));
/// assert_eq!(quantile(&[], 0.5), None);
/// ```
#[must_use]
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    debug_assert!(
        sorted.is_sorted_by(|a, b| a <= b),
        "Quantiles are only defined on sorted samples."
    );
    if !(0.0..=1.0).contains(&p) {
        return None;
    }
    let last = sorted.len().checked_sub(1)?;
    let position = p * count_as_float(last);
    let below = position.floor();
    #[expect(
        clippy::as_conversions,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "`below` lies in `0..=last`."
    )]
    let lower_ix = below as usize;
    let lower = *sorted.get(lower_ix)?;
    let upper = *sorted.get((lower_ix + 1).min(last))?;
    let fraction = position - below;
    if fraction <= 0.0 {
        return Some(lower);
    }
    // `upper - lower` can overflow for finite samples spanning more than `f64::MAX`.
    Some(lower.mul_add(1.0 - fraction, upper * fraction))
}

/// The five-number summary of a sample plus its outliers, everything a box-plot draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct BoxStats {
    /// The number of finite values summarised.
    pub count: usize,
    /// The smallest value, outlier or not.
    pub min: f64,
    /// The first quartile.
    pub q1: f64,
    /// The median.
    pub median: f64,
    /// The third quartile.
    pub q3: f64,
    /// The largest value, outlier or not.
    pub max: f64,
    /// The smallest value that is not an outlier.
    pub lower_whisker: f64,
    /// The largest value that is not an outlier.
    pub upper_whisker: f64,
    /// The values beyond the fences, ascending.
    pub outliers: SmallVec<[f64; 8]>,
}

impl BoxStats {
    /// Tukey's whisker-factor.
    pub const TUKEY: f64 = 1.5;

    /// Summarise a sample with Tukey's fences at `1.5` inter-quartile ranges.
    ///
    /// ```
    /// use chart_numerics::distribution::BoxStats;
    ///
    /// let stats = BoxStats::tukey(&[1.0, 2.0, 3.0, 4.0, 5.0, 40.0])?;
    /// assert_eq!(stats.median, 3.5);
    /// assert_eq!(stats.upper_whisker, 5.0);
    /// assert_eq!(stats.outliers.as_slice(), [40.0]);
    /// # Ok::<(), chart_numerics::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::EmptySample`] if the sample has no finite values.
    #[inline]
    pub fn tukey(sample: &[f64]) -> Result<Self, Error> {
        Self::new(sample, Self::TUKEY)
    }

    /// Summarise a sample, placing the fences `whisker_factor` inter-quartile ranges outside
    /// the box.
    ///
    /// # Errors
    /// Returns [`Error::EmptySample`] if the sample has no finite values, and
    /// [`Error::InvalidParameter`] if `whisker_factor` is negative or not finite.
    pub fn new(sample: &[f64], whisker_factor: f64) -> Result<Self, Error> {
        if !(whisker_factor.is_finite() && whisker_factor >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "whisker factor",
                value: whisker_factor,
            });
        }
        let sorted = finite_sorted(sample);
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Err(Error::EmptySample);
        };
        let quartile = |p| quantile(&sorted, p).ok_or(Error::EmptySample);
        let (q1, median, q3) = (quartile(0.25)?, quartile(0.5)?, quartile(0.75)?);

        let reach = whisker_factor * (q3 - q1);
        let (lower_fence, upper_fence) = (q1 - reach, q3 + reach);
        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|&x| x >= lower_fence)
            .unwrap_or(q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|&x| x <= upper_fence)
            .unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|&x| x < lower_fence || x > upper_fence)
            .collect();

        Ok(Self {
            count: sorted.len(),
            min,
            q1,
            median,
            q3,
            max,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }

    /// The inter-quartile range, i.e. the height of the box.
    #[inline]
    #[must_use]
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// A smoothing kernel for density estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Kernel {
    /// `3/4 (1 - u²)` on `[-1, 1]`.
    #[default]
    Epanechnikov,
    /// `35/32 (1 - u²)³` on `[-1, 1]`.
    Triweight,
    /// The standard normal density.
    Gaussian,
}

impl Kernel {
    /// The kernel's value at `u`, for unit bandwidth.
    #[inline]
    #[must_use]
    pub fn weight(self, u: f64) -> f64 {
        let inside = u.abs() <= 1.0;
        match self {
            Self::Epanechnikov if inside => 0.75 * u.mul_add(-u, 1.0),
            Self::Triweight if inside => 35.0 / 32.0 * u.mul_add(-u, 1.0).powi(3),
            Self::Epanechnikov | Self::Triweight => 0.0,
            Self::Gaussian => (-0.5 * u * u).exp() / TAU.sqrt(),
        }
    }
}

/// How wide a kernel is spread around each value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Bandwidth {
    /// A fixed bandwidth in data-units.
    Fixed(f64),
    /// Silverman's rule of thumb, `1.06 σ n^(-1/5)`.
    #[default]
    Silverman,
}

impl Bandwidth {
    /// The bandwidth for a sample.
    ///
    /// # Errors
    /// Returns [`Error::EmptySample`] if the sample has no finite values, and
    /// [`Error::InvalidParameter`] if the bandwidth would not be finite and positive. The latter
    /// happens for [`Bandwidth::Silverman`] when all values are equal.
    pub fn resolve(self, sample: &[f64]) -> Result<f64, Error> {
        let finite = sample
            .iter()
            .copied()
            .filter(|x| x.is_finite())
            .collect::<Array1<f64>>();
        if finite.is_empty() {
            return Err(Error::EmptySample);
        }
        let h = match self {
            Self::Fixed(h) => h,
            Self::Silverman => {
                let std_dev = finite.std(0.0);
                let n = count_as_float(finite.len());
                1.06 * std_dev * n.powf(-0.2)
            }
        };
        if h.is_finite() && h > 0.0 {
            Ok(h)
        } else {
            Err(Error::InvalidParameter {
                name: "bandwidth",
                value: h,
            })
        }
    }
}

/// A kernel density estimator, the outline of a violin-plot.
///
/// ```
/// use chart_numerics::distribution::{Bandwidth, Kde, Kernel};
///
/// let kde = Kde::new(Kernel::Epanechnikov, Bandwidth::Fixed(1.0));
/// assert_eq!(kde.density(&[0.0], 0.0)?, 0.75);
/// assert_eq!(kde.density(&[0.0], 1.5)?, 0.0);
/// # Ok::<(), chart_numerics::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Kde {
    /// The smoothing kernel.
    pub kernel: Kernel,
    /// The kernel's bandwidth.
    pub bandwidth: Bandwidth,
}

impl Kde {
    /// Share of the sample-range added as padding on either side by [`Kde::estimate_evenly`].
    pub const PADDING: f64 = 0.1;

    /// Create an estimator.
    #[inline]
    #[must_use]
    pub const fn new(kernel: Kernel, bandwidth: Bandwidth) -> Self {
        Self { kernel, bandwidth }
    }

    /// The finite values of the sample and the resolved bandwidth.
    fn prepare(&self, sample: &[f64]) -> Result<(Vec<f64>, f64), Error> {
        let h = self.bandwidth.resolve(sample)?;
        Ok((finite_sorted(sample), h))
    }

    fn density_at(&self, finite: &[f64], h: f64, x: f64) -> f64 {
        let total: f64 = finite
            .iter()
            .map(|&xi| self.kernel.weight((x - xi) / h))
            .sum();
        total / (count_as_float(finite.len()) * h)
    }

    /// The estimated density at `x`.
    ///
    /// # Errors
    /// Fails like [`Bandwidth::resolve`].
    #[inline]
    pub fn density(&self, sample: &[f64], x: f64) -> Result<f64, Error> {
        let (finite, h) = self.prepare(sample)?;
        Ok(self.density_at(&finite, h, x))
    }

    /// The estimated density at every point of `grid`, as `(x, density)`-pairs.
    ///
    /// # Errors
    /// Fails like [`Bandwidth::resolve`].
    pub fn estimate(&self, sample: &[f64], grid: &[f64]) -> Result<Vec<(f64, f64)>, Error> {
        let (finite, h) = self.prepare(sample)?;
        Ok(grid
            .iter()
            .map(|&x| (x, self.density_at(&finite, h, x)))
            .collect())
    }

    /// The estimated density at `points` evenly spaced positions.
    ///
    /// The positions span the sample's range, padded by [`Kde::PADDING`] of that range on each
    /// side, or by one bandwidth if all values are equal.
    ///
    /// # Errors
    /// Fails like [`Bandwidth::resolve`].
    pub fn estimate_evenly(&self, sample: &[f64], points: usize) -> Result<Vec<(f64, f64)>, Error> {
        let (finite, h) = self.prepare(sample)?;
        let (Some(&lo), Some(&hi)) = (finite.first(), finite.last()) else {
            return Err(Error::EmptySample);
        };
        let range = hi - lo;
        let pad = if range > 0.0 { range * Self::PADDING } else { h };
        Ok(Array1::linspace(lo - pad, hi + pad, points)
            .iter()
            .map(|&x| (x, self.density_at(&finite, h, x)))
            .collect())
    }
}
