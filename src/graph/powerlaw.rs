//! Power-law fitting of the degree distribution.
//!
//! Uses the continuous maximum-likelihood estimator with `xmin` chosen by
//! minimum Kolmogorov-Smirnov distance, then compares the fitted tail against
//! exponential and lognormal alternatives with Vuong's likelihood-ratio test.

use serde::Serialize;

const MIN_POINTS: usize = 10;

/// Log-likelihood comparison of the power law against an alternative.
///
/// A positive ratio favours the power law.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionComparison {
    pub log_likelihood_ratio: f64,
    pub normalized_ratio: f64,
    pub p_value: f64,
}

/// Degree distribution analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeDistribution {
    pub is_power_law: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xmin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_law_vs_exponential: Option<DistributionComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_law_vs_lognormal: Option<DistributionComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// All node degrees, zeros included.
    pub degrees: Vec<usize>,
}

impl DegreeDistribution {
    fn not_fitted(degrees: &[usize]) -> Self {
        Self {
            is_power_law: false,
            alpha: None,
            xmin: None,
            power_law_vs_exponential: None,
            power_law_vs_lognormal: None,
            message: None,
            error: None,
            degrees: degrees.to_vec(),
        }
    }
}

struct Fit {
    alpha: f64,
    xmin: f64,
    tail: Vec<f64>,
}

/// Fits a power law to the non-zero entries of `degrees`.
///
/// Never fails: too few points set `message`, a degenerate sample sets
/// `error`, and both report `is_power_law = false`.
pub fn analyze_degree_distribution(degrees: &[usize]) -> DegreeDistribution {
    let mut data: Vec<f64> = degrees
        .iter()
        .filter(|d| **d > 0)
        .map(|d| *d as f64)
        .collect();

    if data.len() < MIN_POINTS {
        return DegreeDistribution {
            message: Some("Not enough data points for power-law fitting".to_string()),
            ..DegreeDistribution::not_fitted(degrees)
        };
    }

    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let Some(fit) = fit_power_law(&data) else {
        tracing::warn!("degree sequence is degenerate; skipping power-law fit");
        return DegreeDistribution {
            error: Some("Degree sequence has no spread above any xmin".to_string()),
            ..DegreeDistribution::not_fitted(degrees)
        };
    };

    let power_ll: Vec<f64> = fit
        .tail
        .iter()
        .map(|x| power_law_log_pdf(*x, fit.alpha, fit.xmin))
        .collect();
    let vs_exponential = compare(&power_ll, &exponential_log_pdfs(&fit.tail, fit.xmin));
    let vs_lognormal = compare(&power_ll, &lognormal_log_pdfs(&fit.tail, fit.xmin));

    DegreeDistribution {
        is_power_law: vs_exponential.log_likelihood_ratio > 0.0
            && vs_lognormal.log_likelihood_ratio > 0.0,
        alpha: Some(fit.alpha),
        xmin: Some(fit.xmin),
        power_law_vs_exponential: Some(vs_exponential),
        power_law_vs_lognormal: Some(vs_lognormal),
        ..DegreeDistribution::not_fitted(degrees)
    }
}

/// Picks the `xmin` with the smallest KS distance. `data` must be sorted.
fn fit_power_law(data: &[f64]) -> Option<Fit> {
    let mut candidates: Vec<f64> = data.to_vec();
    candidates.dedup();

    let mut best: Option<(f64, Fit)> = None;
    for xmin in candidates {
        let tail: Vec<f64> = data.iter().copied().filter(|x| *x >= xmin).collect();
        let n = tail.len();
        let log_sum: f64 = tail.iter().map(|x| (x / xmin).ln()).sum();
        if n < 2 || log_sum <= 0.0 {
            continue;
        }
        let alpha = 1.0 + n as f64 / log_sum;
        let distance = ks_distance(&tail, alpha, xmin);

        if best.as_ref().is_none_or(|(d, _)| distance < *d) {
            best = Some((distance, Fit { alpha, xmin, tail }));
        }
    }
    best.map(|(_, fit)| fit)
}

/// Largest gap between the empirical and fitted CDFs over a sorted tail.
fn ks_distance(tail: &[f64], alpha: f64, xmin: f64) -> f64 {
    let n = tail.len() as f64;
    tail.iter()
        .enumerate()
        .map(|(i, x)| {
            let model = 1.0 - (x / xmin).powf(1.0 - alpha);
            let below = i as f64 / n;
            let above = (i + 1) as f64 / n;
            (model - below).abs().max((above - model).abs())
        })
        .fold(0.0, f64::max)
}

fn power_law_log_pdf(x: f64, alpha: f64, xmin: f64) -> f64 {
    ((alpha - 1.0) / xmin).ln() - alpha * (x / xmin).ln()
}

/// Exponential truncated at `xmin`, rate fitted by maximum likelihood.
fn exponential_log_pdfs(tail: &[f64], xmin: f64) -> Vec<f64> {
    let mean = tail.iter().sum::<f64>() / tail.len() as f64;
    let lambda = 1.0 / (mean - xmin).max(f64::EPSILON);
    tail.iter()
        .map(|x| lambda.ln() - lambda * (x - xmin))
        .collect()
}

/// Lognormal renormalized to `x >= xmin`, parameters fitted on `ln x`.
fn lognormal_log_pdfs(tail: &[f64], xmin: f64) -> Vec<f64> {
    let n = tail.len() as f64;
    let logs: Vec<f64> = tail.iter().map(|x| x.ln()).collect();
    let mu = logs.iter().sum::<f64>() / n;
    let sigma = (logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / n)
        .sqrt()
        .max(f64::EPSILON);

    let tail_mass = 0.5 * libm::erfc((xmin.ln() - mu) / (sigma * std::f64::consts::SQRT_2));
    let log_mass = tail_mass.max(f64::MIN_POSITIVE).ln();

    logs.iter()
        .map(|l| {
            let z = (l - mu) / sigma;
            -l - sigma.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln() - 0.5 * z * z - log_mass
        })
        .collect()
}

/// Vuong's test on per-point log-likelihoods.
fn compare(first: &[f64], second: &[f64]) -> DistributionComparison {
    let diffs: Vec<f64> = first.iter().zip(second).map(|(a, b)| a - b).collect();
    let n = diffs.len() as f64;
    let ratio: f64 = diffs.iter().sum();
    let mean = ratio / n;
    let sigma = (diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();

    if sigma == 0.0 {
        return DistributionComparison {
            log_likelihood_ratio: ratio,
            normalized_ratio: 0.0,
            p_value: 1.0,
        };
    }

    let normalized = ratio / (n.sqrt() * sigma);
    DistributionComparison {
        log_likelihood_ratio: ratio,
        normalized_ratio: normalized,
        p_value: libm::erfc(normalized.abs() / std::f64::consts::SQRT_2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_points_is_reported_not_failed() {
        let result = analyze_degree_distribution(&[0, 1, 2, 3, 0, 5]);

        assert!(!result.is_power_law);
        assert_eq!(
            result.message.as_deref(),
            Some("Not enough data points for power-law fitting")
        );
        assert_eq!(result.degrees, vec![0, 1, 2, 3, 0, 5]);
        assert!(result.alpha.is_none());
    }

    #[test]
    fn zeros_do_not_count_towards_minimum() {
        let mut degrees = vec![0; 20];
        degrees.extend([1, 2, 3]);
        let result = analyze_degree_distribution(&degrees);
        assert!(result.message.is_some());
    }

    #[test]
    fn constant_sequence_is_degenerate() {
        let result = analyze_degree_distribution(&[3; 12]);

        assert!(!result.is_power_law);
        assert!(result.error.is_some());
    }

    #[test]
    fn heavy_tailed_sequence_is_fitted() {
        let degrees: Vec<usize> = (1..=40usize).map(|k| (200 / (k * k)).max(1)).collect();
        let result = analyze_degree_distribution(&degrees);

        let alpha = result.alpha.expect("alpha should be fitted");
        assert!(alpha > 1.0);
        let xmin = result.xmin.unwrap();
        assert!(xmin >= 1.0);
        let p = result.power_law_vs_exponential.unwrap().p_value;
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn vuong_p_value_is_two_sided_normal_tail() {
        // diffs 1 and 3: ratio 4, sigma 1, normalized 2 * sqrt(2)
        let comparison = compare(&[1.0, 3.0], &[0.0, 0.0]);

        assert!((comparison.normalized_ratio - 2.0 * std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!((comparison.p_value - 0.004_677_734_981_047_27).abs() < 1e-12);
    }

    #[test]
    fn identical_fits_have_p_value_one() {
        let comparison = compare(&[0.5, 0.5], &[0.5, 0.5]);
        assert_eq!(comparison.p_value, 1.0);
    }
}
