// ==============================================================================
// engine/logistic.rs - Logistic Regression
// ==============================================================================
// Description: Maximum likelihood logistic regression with Wald inference
// Author: Matt Barham
// Created: 2026-09-20
// Modified: 2026-10-18
// Version: 1.2.0
// ==============================================================================
// Algorithm (Newton-Raphson / IRLS):
//   μ = 1 / (1 + exp(-Xβ)),  W = diag(μ(1 - μ))
//   β ← β + Δ,  (XᵀWX) Δ = Xᵀ(y - μ)   until max |Δβ| < tolerance
//   SE(β_j) = sqrt([(XᵀWX)⁻¹]_jj) at the optimum
//   z_j = β_j / SE(β_j), two-sided p from the standard normal
// ==============================================================================

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use super::cholesky::CrossProductFactor;
use super::{Design, EngineConfig, EngineError, ModelStats, ResultGroup, TermResult};

fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// Fitted probabilities and the factored information matrix at `beta`
fn information(
    x: &Array2<f64>,
    beta: &Array1<f64>,
) -> Result<(Array1<f64>, CrossProductFactor), EngineError> {
    let mu = x.dot(beta).mapv(sigmoid);
    let weights = mu.mapv(|m| m * (1.0 - m));
    let weighted_x = x * &weights.view().insert_axis(Axis(1));
    let information = x.t().dot(&weighted_x);
    Ok((mu, CrossProductFactor::new(&information)?))
}

pub fn fit(design: &Design, config: &EngineConfig) -> Result<ResultGroup, EngineError> {
    let x = &design.x;
    let y = &design.y;

    if let Some(bad) = y.iter().find(|v| **v != 0.0 && **v != 1.0) {
        return Err(EngineError::NonBinaryOutcome(*bad));
    }

    let mut beta = Array1::<f64>::zeros(design.n_params());
    let mut converged = false;

    for iteration in 1..=config.max_iterations {
        let (mu, factor) = information(x, &beta)?;
        let score = x.t().dot(&(y - &mu));
        let step = factor.solve(&score);
        beta += &step;

        let largest = step.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if !largest.is_finite() {
            break;
        }
        if largest < config.tolerance {
            debug!("Logistic regression converged after {} iterations", iteration);
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(EngineError::NoConvergence(config.max_iterations));
    }

    let cov = information(x, &beta)?.1.inverse();

    let normal = Normal::new(0.0, 1.0).map_err(|e| EngineError::Distribution(e.to_string()))?;
    let critical = normal.inverse_cdf(config.upper_quantile());

    let terms = design
        .names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let coef = beta[j];
            let std_err = cov[[j, j]].sqrt();
            let statistic = coef / std_err;
            TermResult {
                name: name.clone(),
                coef,
                std_err,
                lower_ci: coef - critical * std_err,
                upper_ci: coef + critical * std_err,
                statistic,
                p_value: 2.0 * normal.sf(statistic.abs()),
            }
        })
        .collect();

    Ok(ResultGroup {
        terms,
        model: ModelStats {
            n_samples: design.n_samples(),
            r_squared: None,
            r_squared_adj: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn design(xs: &[f64], ys: &[f64]) -> Design {
        let mut x = Array2::<f64>::ones((xs.len(), 2));
        for (i, v) in xs.iter().enumerate() {
            x[[i, 1]] = *v;
        }
        Design {
            y: ys.iter().copied().collect(),
            x,
            names: vec!["intercept".to_string(), "grs".to_string()],
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-15);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }

    #[test]
    fn test_balanced_intercept_only_signal() {
        // Outcome independent of x and balanced: intercept 0, slope 0
        let d = design(
            &[-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0],
            &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
        );
        let group = fit(&d, &EngineConfig::default()).unwrap();

        let grs = group.term("grs").unwrap();
        assert_abs_diff_eq!(grs.coef, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(group.term("intercept").unwrap().coef, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(grs.p_value, 1.0, epsilon = 1e-9);
        assert!(group.model.r_squared.is_none());
        assert!(group.model.r_squared_adj.is_none());
    }

    #[test]
    fn test_positive_association() {
        // 2x2 table: x=0 -> 1/4 cases, x=1 -> 3/4 cases; slope = ln(9)
        let d = design(
            &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            &[1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
        );
        let group = fit(&d, &EngineConfig::default()).unwrap();
        let grs = group.term("grs").unwrap();

        assert_abs_diff_eq!(grs.coef, 9.0_f64.ln(), epsilon = 1e-6);
        assert_abs_diff_eq!(group.term("intercept").unwrap().coef, -(3.0_f64.ln()), epsilon = 1e-6);
        // SE = sqrt(1/1 + 1/3 + 1/3 + 1/1)
        let se = (8.0_f64 / 3.0).sqrt();
        assert_abs_diff_eq!(grs.std_err, se, epsilon = 1e-6);
        assert_abs_diff_eq!(grs.lower_ci, 9.0_f64.ln() - 1.959963985 * se, epsilon = 1e-6);
        assert!(grs.p_value > 0.0 && grs.p_value < 1.0);
    }

    #[test]
    fn test_non_binary_outcome() {
        let d = design(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 1.0]);
        assert!(matches!(
            fit(&d, &EngineConfig::default()).unwrap_err(),
            EngineError::NonBinaryOutcome(v) if v == 2.0
        ));
    }

    #[test]
    fn test_separated_data_does_not_converge() {
        let d = design(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let config = EngineConfig {
            max_iterations: 25,
            ..EngineConfig::default()
        };
        assert!(matches!(
            fit(&d, &config).unwrap_err(),
            EngineError::NoConvergence(25) | EngineError::SingularMatrix
        ));
    }
}
