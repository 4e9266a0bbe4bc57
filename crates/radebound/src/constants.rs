/// Dataset sentinels
pub const ITEMSET_END: i64 = -1; // closes an itemset inside a line
pub const SEQUENCE_END: i64 = -2; // closes the transaction

/// Precision guard: exact binomial terms only while k * (i + 1) stays below this
pub const DEFAULT_PRECISION_GUARD: u64 = 500_000;

/// Replicated sampling multiplier
pub const DEFAULT_REPLICATION_FACTOR: u32 = 1;

/// Solver defaults
pub const DEFAULT_INITIAL_GUESS: f64 = 1000.0;
pub const DEFAULT_INITIAL_STEP: f64 = 100.0;
pub const DEFAULT_LOWER_BOUND: f64 = 1.0;
pub const DEFAULT_PARAM_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_OBJECTIVE_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_MAX_ITERS: u64 = 10_000;

/// Threshold sweep defaults (offset above the average length, absolute cap)
pub const DEFAULT_SWEEP_MIN_OFFSET: usize = 0;
pub const DEFAULT_SWEEP_MAX_THRESHOLD: usize = usize::MAX;

/// Largest item id span (max_id - min_id + 1) the dense rank table accepts
pub const MAX_ITEM_SLOTS: usize = 1 << 22;
