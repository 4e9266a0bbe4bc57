pub mod bound;
pub mod combinatorics;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod estimator;
pub mod optimize;
pub mod quantities;
pub mod ranking;
pub mod sweep;
pub mod weights;

pub use bound::{BoundEstimate, assemble, concentration_term};
pub use combinatorics::{PrecisionGuard, binomial_coefficient};
pub use config::Config;
pub use dataset::{Dataset, ItemId, LengthProfile, Transaction};
pub use error::{RadeBoundError, Result};
pub use estimator::{PreparedDataset, estimate_bound};
pub use optimize::{
    Bounds, MgfObjective, Minimizer, Minimum, NelderMeadMinimizer, SolverStatus, Tolerances,
};
pub use quantities::QuantityTable;
pub use ranking::{ItemOrder, ItemRanking};
pub use sweep::{ReportFormat, SweepReport, ThresholdRange, sweep};
pub use weights::OptimizationPoint;
