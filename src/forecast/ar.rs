//! Autoregressive forecaster.
//!
//! Fits `y_t = c + φ_1 y_{t-1} + … + φ_p y_{t-p} + ε_t` by least squares, forecasts by
//! recursion, and derives 10%/90% quantile bounds from the residual variance
//! propagated through the model's impulse response:
//!
//! ```text
//! Var(h) = σ² Σ_{j<h} ψ_j²,   ψ_0 = 1,   ψ_j = Σ_{i=1..min(j,p)} φ_i ψ_{j-i}
//! ```

use nalgebra::{DMatrix, DVector};

use super::{Forecaster, ModelError};
use crate::data::{add_months, ForecastPoint, ForecastTable, Series};

/// Default autoregressive order (one year of monthly lags)
pub const DEFAULT_ORDER: usize = 12;

/// z-score of the 90% quantile of a standard normal
const Z_90: f64 = 1.281_551_565_544_600_4;

/// Smallest history the model accepts
const MIN_OBSERVATIONS: usize = 4;

/// Autoregressive model with Gaussian interval bounds
#[derive(Debug, Clone)]
pub struct ArForecaster {
    order: usize,
}

impl Default for ArForecaster {
    fn default() -> Self {
        Self::with_order(DEFAULT_ORDER)
    }
}

/// Fitted coefficients
#[derive(Debug, Clone)]
struct ArFit {
    intercept: f64,
    /// `phi[i]` multiplies `y_{t-1-i}`
    phi: Vec<f64>,
    sigma: f64,
}

impl ArForecaster {
    pub fn with_order(order: usize) -> Self {
        Self {
            order: order.max(1),
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Order actually used for `n` observations.
    ///
    /// Short histories get a smaller order so the regression keeps at least twice as
    /// many rows as lags.
    fn effective_order(&self, n: usize) -> usize {
        self.order.min((n - 1) / 3).max(1)
    }

    fn fit(&self, y: &[f64]) -> Result<ArFit, ModelError> {
        let p = self.effective_order(y.len());
        let rows = y.len() - p;
        let cols = p + 1;

        let mut x = DMatrix::<f64>::zeros(rows, cols);
        let mut target = DVector::<f64>::zeros(rows);
        for r in 0..rows {
            let t = p + r;
            x[(r, 0)] = 1.0;
            for lag in 1..=p {
                x[(r, lag)] = y[t - lag];
            }
            target[r] = y[t];
        }

        let beta = solve_least_squares(&x, &target)
            .ok_or_else(|| ModelError::FitFailed("least squares system is singular".to_string()))?;

        let residuals = &target - &x * &beta;
        let dof = rows.saturating_sub(cols).max(1);
        let sigma = (residuals.norm_squared() / dof as f64).sqrt();

        if !sigma.is_finite() {
            return Err(ModelError::FitFailed("non-finite residual variance".to_string()));
        }

        Ok(ArFit {
            intercept: beta[0],
            phi: beta.iter().skip(1).copied().collect(),
            sigma,
        })
    }
}

impl ArFit {
    /// Point forecasts for the next `horizon` steps
    fn recurse(&self, history: &[f64], horizon: usize) -> Vec<f64> {
        let mut extended = history.to_vec();
        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let n = extended.len();
            let next = self.intercept
                + self
                    .phi
                    .iter()
                    .enumerate()
                    .map(|(i, phi)| phi * extended[n - 1 - i])
                    .sum::<f64>();
            extended.push(next);
            out.push(next);
        }
        out
    }

    /// Forecast standard deviation for steps 1..=horizon
    fn step_std(&self, horizon: usize) -> Vec<f64> {
        let mut psi = vec![1.0];
        for j in 1..horizon {
            let value = (1..=j.min(self.phi.len()))
                .map(|i| self.phi[i - 1] * psi[j - i])
                .sum::<f64>();
            psi.push(value);
        }

        let mut cumulative = 0.0;
        psi.iter()
            .map(|w| {
                cumulative += w * w;
                self.sigma * cumulative.sqrt()
            })
            .collect()
    }
}

impl Forecaster for ArForecaster {
    fn forecast(&self, series: &Series, horizon: usize) -> Result<ForecastTable, ModelError> {
        if series.len() < MIN_OBSERVATIONS {
            return Err(ModelError::InsufficientHistory {
                needed: MIN_OBSERVATIONS,
                got: series.len(),
            });
        }
        let last_date = match series.last() {
            Some(last) => last.date,
            None => return Ok(ForecastTable::empty()),
        };

        let values = series.values();
        let fit = self.fit(&values)?;
        tracing::debug!(
            order = fit.phi.len(),
            sigma = fit.sigma,
            "fitted autoregressive model"
        );

        let points = fit.recurse(&values, horizon);
        let stds = fit.step_std(horizon);

        let mut table = Vec::with_capacity(horizon);
        for (step, (point, std)) in points.into_iter().zip(stds).enumerate() {
            if !point.is_finite() || !std.is_finite() {
                return Err(ModelError::FitFailed(format!(
                    "forecast diverged at step {}",
                    step + 1
                )));
            }
            let date = add_months(last_date, step as u32 + 1)
                .ok_or_else(|| ModelError::FitFailed("forecast date out of range".to_string()))?;
            let half_width = Z_90 * std;
            table.push(ForecastPoint {
                date,
                forecast: point,
                lower: point - half_width,
                upper: point + half_width,
            });
        }

        Ok(ForecastTable::new(table))
    }
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
