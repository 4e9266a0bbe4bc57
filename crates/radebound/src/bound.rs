use crate::error::{RadeBoundError, Result};
use crate::optimize::{Minimum, SolverStatus};

use serde::Serialize;

/// sqrt(2·ln(2/δ) / (N·r))
pub fn concentration_term(delta: f64, dataset_size: usize, replication_factor: u32) -> f64 {
    let scaled = dataset_size as f64 * f64::from(replication_factor);
    (2.0 * (2.0 / delta).ln() / scaled).sqrt()
}

pub fn validate_delta(delta: f64) -> Result<()> {
    if delta > 0.0 && delta < 1.0 {
        Ok(())
    } else {
        Err(RadeBoundError::InvalidDelta(delta))
    }
}

/// Final bound together with the pieces it was assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundEstimate {
    pub threshold: usize,
    pub dataset_size: usize,
    pub delta: f64,
    /// minimizer s*
    pub scale: f64,
    /// f(s*), the Rademacher complexity bound
    pub rademacher: f64,
    pub concentration: f64,
    pub bound: f64,
    pub status: SolverStatus,
    pub iterations: u64,
}

/// Combines the optimizer's minimum with the concentration term:
/// bound = 2·f(s*) + sqrt(2·ln(2/δ) / (N·r)).
pub fn assemble(
    minimum: &Minimum,
    threshold: usize,
    delta: f64,
    dataset_size: usize,
    replication_factor: u32,
) -> Result<BoundEstimate> {
    if !minimum.status.is_success() {
        return Err(RadeBoundError::OptimizationFailed {
            code: minimum.status.code(),
            reason: format!("{:?}", minimum.status),
        });
    }
    validate_delta(delta)?;
    if dataset_size == 0 {
        return Err(RadeBoundError::EmptyDataset);
    }

    let concentration = concentration_term(delta, dataset_size, replication_factor);
    Ok(BoundEstimate {
        threshold,
        dataset_size,
        delta,
        scale: minimum.argument,
        rademacher: minimum.value,
        concentration,
        bound: 2.0 * minimum.value + concentration,
        status: minimum.status,
        iterations: minimum.iterations,
    })
}
