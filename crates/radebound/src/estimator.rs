use crate::bound::{BoundEstimate, assemble, validate_delta};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{RadeBoundError, Result};
use crate::optimize::{MgfObjective, Minimizer};
use crate::quantities::QuantityTable;
use crate::ranking::ItemRanking;
use crate::weights::{OptimizationPoint, build_points};

use log::{debug, info};
use std::path::Path;

/// A dataset after ingestion, ranking and aggregation.
///
/// None of these stages depend on the item-length threshold, so one prepared
/// dataset serves any number of [`PreparedDataset::estimate`] calls.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    dataset: Dataset,
    ranking: ItemRanking,
    quantities: QuantityTable,
}

impl PreparedDataset {
    pub fn new(dataset: Dataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(RadeBoundError::EmptyDataset);
        }
        let ranking = ItemRanking::build(&dataset)?;
        let quantities = QuantityTable::aggregate(&dataset, &ranking);
        Ok(Self {
            dataset,
            ranking,
            quantities,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dataset = Dataset::read(path)?;
        info!(
            "Loaded {} transactions with {} distinct items from {}",
            dataset.len(),
            dataset.item_frequencies().len(),
            path.display()
        );
        Self::new(dataset)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn ranking(&self) -> &ItemRanking {
        &self.ranking
    }

    pub fn quantities(&self) -> &QuantityTable {
        &self.quantities
    }

    pub fn points(&self, threshold: usize, config: &Config) -> Vec<OptimizationPoint> {
        build_points(
            &self.dataset,
            &self.ranking,
            &self.quantities,
            threshold,
            config.estimator.replication_factor,
            config.precision_guard(),
        )
    }

    /// Weights, optimizes and assembles the bound for one threshold.
    pub fn estimate<M: Minimizer>(
        &self,
        threshold: usize,
        delta: f64,
        config: &Config,
        minimizer: &M,
    ) -> Result<BoundEstimate> {
        validate_delta(delta)?;
        if threshold == 0 {
            return Err(RadeBoundError::InvalidThreshold(threshold));
        }
        config.validate()?;

        let points = self.points(threshold, config);
        let objective = MgfObjective::new(&points);
        let f = |s: f64| objective.value(s);
        let minimum = minimizer.minimize(
            &f,
            config.solver.initial_guess,
            config.bounds(),
            &config.tolerances(),
        );
        debug!(
            "Threshold {}: s* = {}, f(s*) = {}, status {:?} after {} iterations",
            threshold, minimum.argument, minimum.value, minimum.status, minimum.iterations
        );

        assemble(
            &minimum,
            threshold,
            delta,
            self.dataset.len(),
            config.estimator.replication_factor,
        )
    }
}

/// Runs the whole pipeline on a dataset file with the configured minimizer.
pub fn estimate_bound<P: AsRef<Path>>(
    path: P,
    delta: f64,
    threshold: usize,
    config: &Config,
) -> Result<BoundEstimate> {
    validate_delta(delta)?;
    if threshold == 0 {
        return Err(RadeBoundError::InvalidThreshold(threshold));
    }
    let prepared = PreparedDataset::load(path)?;
    prepared.estimate(threshold, delta, config, &config.minimizer())
}
