//! Log-domain combinatorics.
//!
//! Binomial sums over long transactions exceed the f64 exponent range long
//! before they stop mattering, so every quantity here is carried as a natural
//! logarithm and combined with log-sum-exp.

use crate::constants::DEFAULT_PRECISION_GUARD;

use std::collections::HashMap;
use std::f64::consts::LN_2;

/// ln(e^a + e^b) without leaving the log domain.
pub fn ln_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// ln(2^n - 1), `-inf` for n = 0.
pub fn ln_pow2_minus_one(n: u64) -> f64 {
    if n == 0 {
        return f64::NEG_INFINITY;
    }
    n as f64 * LN_2 + (-(-(n as f64) * LN_2).exp()).ln_1p()
}

/// Running sum of non-negative terms, stored as ln(sum).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSum(f64);

impl Default for LogSum {
    fn default() -> Self {
        Self::zero()
    }
}

impl LogSum {
    pub fn zero() -> Self {
        Self(f64::NEG_INFINITY)
    }

    pub fn add_ln(&mut self, ln_term: f64) {
        self.0 = ln_add_exp(self.0, ln_term);
    }

    pub fn ln(&self) -> f64 {
        self.0
    }

    pub fn value(&self) -> f64 {
        self.0.exp()
    }
}

/// Row `n` of Pascal's triangle in log space, columns `0..=min(n, max_k)`.
pub fn ln_binomial_row(n: usize, max_k: usize) -> Vec<f64> {
    let width = max_k.min(n);
    let mut row = vec![f64::NEG_INFINITY; width + 1];
    row[0] = 0.0;
    for i in 1..=n {
        for j in (1..=i.min(width)).rev() {
            row[j] = ln_add_exp(row[j], row[j - 1]);
        }
    }
    row
}

/// C(n, k) through Pascal's rule. Zero when k > n.
pub fn binomial_coefficient(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    ln_binomial_row(n, k)[k].exp()
}

/// ln of the upper bound C(n, i) <= (n·e / i)^i.
pub fn ln_binomial_upper_bound(n: usize, i: usize) -> f64 {
    if i == 0 {
        return 0.0;
    }
    let (n, i) = (n as f64, i as f64);
    i * (n.ln() + 1.0 - i.ln())
}

/// Switch-over policy between exact binomial terms and the asymptotic bound.
///
/// The term C(k - 1, i) is computed exactly while `k * (i + 1) < limit`. The
/// exact path walks a Pascal row of width `i`, so the limit also caps the work
/// spent per distinct k.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionGuard {
    limit: u64,
}

impl Default for PrecisionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_PRECISION_GUARD)
    }
}

impl PrecisionGuard {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn is_exact(&self, k: usize, i: usize) -> bool {
        (k as u64).saturating_mul(i as u64 + 1) < self.limit
    }

    /// Largest `i <= max_i` such that every term `1..=i` is exact.
    pub fn exact_prefix(&self, k: usize, max_i: usize) -> usize {
        if k == 0 {
            return max_i;
        }
        let bound = (self.limit.saturating_sub(1) / k as u64).saturating_sub(1);
        usize::try_from(bound).unwrap_or(usize::MAX).min(max_i)
    }
}

/// Cached B(k) = Σ_{i=1}^{L-2} C(k - 1, i), in log space.
#[derive(Debug, Clone)]
pub struct ThresholdSums {
    threshold: usize,
    guard: PrecisionGuard,
    cache: HashMap<usize, f64>,
}

impl ThresholdSums {
    pub fn new(threshold: usize, guard: PrecisionGuard) -> Self {
        Self {
            threshold,
            guard,
            cache: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn ln_sum(&mut self, k: usize) -> f64 {
        if let Some(&cached) = self.cache.get(&k) {
            return cached;
        }
        let value = self.compute(k);
        self.cache.insert(k, value);
        value
    }

    fn compute(&self, k: usize) -> f64 {
        let n = k.saturating_sub(1);
        let upper = self.threshold.saturating_sub(2).min(n);
        if upper == 0 {
            return f64::NEG_INFINITY;
        }

        let exact_upto = self.guard.exact_prefix(k, upper);
        let mut sum = LogSum::zero();
        if exact_upto > 0 {
            let row = ln_binomial_row(n, exact_upto);
            for &term in &row[1..=exact_upto] {
                sum.add_ln(term);
            }
        }
        for i in (exact_upto + 1)..=upper {
            sum.add_ln(ln_binomial_upper_bound(n, i));
        }
        sum.ln()
    }
}
