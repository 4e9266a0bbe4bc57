use crate::combinatorics::{LogSum, PrecisionGuard, ThresholdSums, ln_add_exp, ln_pow2_minus_one};
use crate::dataset::Dataset;
use crate::quantities::{ItemQuantities, QuantityTable};
use crate::ranking::{ItemOrder, ItemRanking};

use log::debug;
use std::f64::consts::LN_2;

/// One exponential term of the MGF objective.
///
/// `ln_mass` is ln(1 + weight), where weight is the item's combinatorial sum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationPoint {
    /// multiplied by s² inside the exponential
    pub factor: f64,
    pub ln_mass: f64,
}

/// ln of the closed-form count m·(2^(k-m) - 1) + 2^(k-m)·(2^m - 1 - m), for k >= m.
pub fn ln_short_term(k: usize, m: usize) -> f64 {
    debug_assert!(k >= m);
    let d = (k - m) as u64;
    let own = if m == 0 {
        f64::NEG_INFINITY
    } else {
        (m as f64).ln() + ln_pow2_minus_one(d)
    };
    let rest = if m < 2 {
        f64::NEG_INFINITY
    } else {
        let m_f = m as f64;
        (d as f64 + m_f) * LN_2 + (-(m_f + 1.0) * (-m_f * LN_2).exp()).ln_1p()
    };
    ln_add_exp(own, rest)
}

/// ln of the weight an item contributes when nothing else shares its transaction.
pub fn ln_isolated_term(m: usize) -> f64 {
    if m <= 1 {
        f64::NEG_INFINITY
    } else {
        ((m - 1) as f64).ln()
    }
}

/// ln of the item's combinatorial sum over its (k, m, g) records.
pub fn ln_item_weight(quantities: &ItemQuantities, sums: &mut ThresholdSums) -> f64 {
    let mut total = LogSum::zero();
    for (&(k, m), &g) in quantities {
        let ln_term = if k == m {
            ln_isolated_term(m)
        } else if k >= sums.threshold() {
            sums.ln_sum(k)
        } else {
            ln_short_term(k, m)
        };
        total.add_ln(ln_term + (g as f64).ln());
    }
    total.ln()
}

/// Builds the objective's data points for one item-length threshold.
///
/// One point per item, ascending by id, then the synthetic point for the
/// transactions whose item-length reaches the threshold.
pub fn build_points(
    dataset: &Dataset,
    ranking: &ItemRanking,
    quantities: &QuantityTable,
    threshold: usize,
    replication_factor: u32,
    guard: PrecisionGuard,
) -> Vec<OptimizationPoint> {
    let n = dataset.len() as f64;
    let denom = 2.0 * n * n * f64::from(replication_factor);
    let mut sums = ThresholdSums::new(threshold, guard);
    let mut points = Vec::with_capacity(dataset.item_frequencies().len() + 1);

    for (&item, &frequency) in dataset.item_frequencies() {
        let ln_weight = quantities
            .for_item(item, ranking)
            .map(|q| ln_item_weight(q, &mut sums))
            .unwrap_or(f64::NEG_INFINITY);
        points.push(OptimizationPoint {
            factor: frequency as f64 / denom,
            ln_mass: ln_add_exp(0.0, ln_weight),
        });
    }

    // 1 + (2^n - 2) = 2^n - 1
    let long_transactions = dataset.count_at_least(threshold);
    points.push(OptimizationPoint {
        factor: long_transactions as f64 / denom,
        ln_mass: ln_pow2_minus_one(long_transactions),
    });

    debug!(
        "Built {} optimization points for threshold {} ({} long transactions)",
        points.len(),
        threshold,
        long_transactions
    );
    points
}
