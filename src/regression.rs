//! Least-squares trend-lines for scatter-plots.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A straight line `y = slope * x + intercept` fitted to a point-cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LinearFit {
    /// The line's gradient.
    pub slope: f64,
    /// The line's value at `x = 0`.
    pub intercept: f64,
    /// The coefficient of determination, between `0` and `1`.
    pub r_squared: f64,
    /// The number of finite points the line was fitted to.
    pub count: usize,
}

impl LinearFit {
    /// Fit a line by ordinary least squares, ignoring points with a non-finite coordinate.
    ///
    /// If all `y`-values are equal the line explains them perfectly, so `r_squared` is `1`.
    ///
    /// ```
    /// use chart_numerics::regression::LinearFit;
    ///
    /// let fit = LinearFit::least_squares(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)])?;
    /// assert_eq!((fit.slope, fit.intercept, fit.r_squared), (2.0, 1.0, 1.0));
    /// assert_eq!(fit.predict(10.0), 21.0);
    /// # Ok::<(), chart_numerics::Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::DegenerateSample`] if fewer than two finite points remain, or if they
    /// all share one `x`-value.
    pub fn least_squares(points: &[(f64, f64)]) -> Result<Self, Error> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = points
            .iter()
            .copied()
            .filter(|&(x, y)| x.is_finite() && y.is_finite())
            .unzip();
        if xs.len() < 2 {
            return Err(Error::DegenerateSample(
                "a trend-line needs at least two points",
            ));
        }
        let (xs, ys) = (Array1::from(xs), Array1::from(ys));
        let (Some(mean_x), Some(mean_y)) = (xs.mean(), ys.mean()) else {
            return Err(Error::DegenerateSample(
                "a trend-line needs at least two points",
            ));
        };
        let dx = xs - mean_x;
        let dy = ys - mean_y;
        let (sxx, sxy, syy) = (dx.dot(&dx), dx.dot(&dy), dy.dot(&dy));
        if sxx <= 0.0 {
            return Err(Error::DegenerateSample("all points share one x-value"));
        }

        let slope = sxy / sxx;
        let r_squared = if syy <= 0.0 {
            1.0
        } else {
            (sxy * sxy / (sxx * syy)).min(1.0)
        };
        Ok(Self {
            slope,
            intercept: slope.mul_add(-mean_x, mean_y),
            r_squared,
            count: dx.len(),
        })
    }

    /// The line's value at `x`.
    #[inline]
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope.mul_add(x, self.intercept)
    }

    /// The two end-points of the line drawn across `x_min..=x_max`.
    #[inline]
    #[must_use]
    pub fn segment(&self, x_min: f64, x_max: f64) -> [(f64, f64); 2] {
        [(x_min, self.predict(x_min)), (x_max, self.predict(x_max))]
    }
}
