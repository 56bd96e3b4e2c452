// ==============================================================================
// engine/linear.rs - Ordinary Least Squares
// ==============================================================================
// Description: Linear regression with t-based inference and adjusted R²
// Author: Matt Barham
// Created: 2026-09-19
// Modified: 2026-10-18
// Version: 1.2.0
// ==============================================================================
// Algorithm:
//   β solves (XᵀX) β = Xᵀy through the Cholesky factor of XᵀX
//   σ² = RSS / (n - p)
//   SE(β_j) = sqrt(σ² [(XᵀX)⁻¹]_jj)
//   t_j = β_j / SE(β_j), two-sided p from Student t with n - p df
//   R² = 1 - RSS / TSS,  adj R² = 1 - (1 - R²)(n - 1)/(n - p)
// ==============================================================================

use statrs::distribution::{ContinuousCDF, StudentsT};

use super::cholesky::CrossProductFactor;
use super::{Design, EngineConfig, EngineError, ModelStats, ResultGroup, TermResult};

pub fn fit(design: &Design, config: &EngineConfig) -> Result<ResultGroup, EngineError> {
    let x = &design.x;
    let y = &design.y;
    let n = design.n_samples();
    let p = design.n_params();

    let factor = CrossProductFactor::new(&x.t().dot(x))?;
    let beta = factor.solve(&x.t().dot(y));
    let xtx_inv = factor.inverse();

    let residuals = y - &x.dot(&beta);
    let rss = residuals.dot(&residuals);
    let df = (n - p) as f64;
    let sigma2 = rss / df;

    let mean_y = y.sum() / n as f64;
    let tss = y.iter().map(|v| (v - mean_y).powi(2)).sum::<f64>();
    if tss == 0.0 {
        return Err(EngineError::ConstantOutcome(mean_y));
    }
    let r_squared = 1.0 - rss / tss;
    let r_squared_adj = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df;

    let t_dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| EngineError::Distribution(e.to_string()))?;
    let critical = t_dist.inverse_cdf(config.upper_quantile());

    let terms = design
        .names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let coef = beta[j];
            let std_err = (sigma2 * xtx_inv[[j, j]]).sqrt();
            let statistic = coef / std_err;
            TermResult {
                name: name.clone(),
                coef,
                std_err,
                lower_ci: coef - critical * std_err,
                upper_ci: coef + critical * std_err,
                statistic,
                p_value: 2.0 * t_dist.sf(statistic.abs()),
            }
        })
        .collect();

    Ok(ResultGroup {
        terms,
        model: ModelStats {
            n_samples: n,
            r_squared: Some(r_squared),
            r_squared_adj: Some(r_squared_adj),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

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
    fn test_simple_regression_closed_form() {
        // Sxx = 10, Sxy = 19.9 -> slope 1.99, intercept 6.02 - 1.99 * 3 = 0.05
        let d = design(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.1, 3.9, 6.2, 7.8, 10.1]);
        let group = fit(&d, &EngineConfig::default()).unwrap();

        let grs = group.term("grs").unwrap();
        let intercept = group.term("intercept").unwrap();
        assert_abs_diff_eq!(grs.coef, 1.99, epsilon = 1e-9);
        assert_abs_diff_eq!(intercept.coef, 0.05, epsilon = 1e-9);

        // RSS = 0.107, TSS = 39.708, n = 5, p = 2
        let r2 = 1.0 - 0.107 / 39.708;
        let adj = 1.0 - (1.0 - r2) * 4.0 / 3.0;
        assert_abs_diff_eq!(group.model.r_squared.unwrap(), r2, epsilon = 1e-9);
        assert_abs_diff_eq!(group.model.r_squared_adj.unwrap(), adj, epsilon = 1e-9);

        // SE(slope) = sqrt(0.107 / 3 / 10)
        let se = (0.107_f64 / 30.0).sqrt();
        assert_abs_diff_eq!(grs.std_err, se, epsilon = 1e-9);
        // t(0.975, 3) = 3.182446
        assert_abs_diff_eq!(grs.lower_ci, 1.99 - 3.182446305 * se, epsilon = 1e-6);
        assert_abs_diff_eq!(grs.upper_ci, 1.99 + 3.182446305 * se, epsilon = 1e-6);
        assert!(grs.p_value > 0.0 && grs.p_value < 1e-3);
        assert_eq!(group.model.n_samples, 5);
    }

    #[test]
    fn test_null_effect_has_large_p_value() {
        let d = design(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1.0, -1.0, 1.0, -1.0, -1.0, 1.0]);
        let group = fit(&d, &EngineConfig::default()).unwrap();
        let grs = group.term("grs").unwrap();

        assert!(grs.p_value > 0.5);
        assert!(grs.lower_ci < 0.0 && grs.upper_ci > 0.0);
    }

    #[test]
    fn test_collinear_terms_fail() {
        let d = Design {
            y: array![1.0, 2.0, 3.0, 4.0],
            x: array![[1.0, 1.0, 2.0], [1.0, 2.0, 4.0], [1.0, 3.0, 6.0], [1.0, 4.0, 8.0]],
            names: vec!["intercept".into(), "grs".into(), "grs2".into()],
        };
        assert!(matches!(
            fit(&d, &EngineConfig::default()).unwrap_err(),
            EngineError::SingularMatrix
        ));
    }

    #[test]
    fn test_constant_outcome_is_rejected() {
        let d = design(&[1.0, 2.0, 3.0, 4.0], &[3.0, 3.0, 3.0, 3.0]);
        assert!(matches!(
            fit(&d, &EngineConfig::default()).unwrap_err(),
            EngineError::ConstantOutcome(v) if v == 3.0
        ));
    }

    #[test]
    fn test_wider_interval_for_higher_confidence() {
        let d = design(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.1, 3.9, 6.2, 7.8, 10.1]);
        let narrow = fit(&d, &EngineConfig::default()).unwrap();
        let wide = fit(
            &d,
            &EngineConfig {
                confidence_level: 0.99,
                ..EngineConfig::default()
            },
        )
        .unwrap();

        let width = |g: &ResultGroup| {
            let t = g.term("grs").unwrap();
            t.upper_ci - t.lower_ci
        };
        assert!(width(&wide) > width(&narrow));
    }
}
