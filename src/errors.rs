use crate::core::energy_supply::energy_supply::EnergySupplyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoolsimError {
    #[error("Request was considered invalid due to error: {0}")]
    InvalidRequest(#[from] anyhow::Error),
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("All {attempted} attempted runs in the batch failed; first failure: {first_failure}")]
    AllRunsFailed {
        attempted: usize,
        first_failure: RunError,
    },
    #[error(transparent)]
    EmptyBatch(#[from] EmptyBatchError),
    #[error("Could not build the worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Error during output of results: {0}")]
    ErrorInOutput(anyhow::Error),
}

/// An error in the configuration supplied for a batch. These are always detected before any run
/// starts.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{0}")]
pub struct ConfigurationError(String);

impl ConfigurationError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An error confined to a single run of a batch.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RunError {
    #[error("Climate generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("Numerical divergence at t = {time_in_seconds}s: {reason}")]
    NumericalDivergence {
        time_in_seconds: f64,
        reason: String,
    },
    #[error("Energy metering failed: {0}")]
    Metering(#[from] EnergySupplyError),
    #[error("Run was cancelled before completion")]
    Cancelled,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("The historical climate ensemble contains no series")]
    EmptyEnsemble,
    #[error("Historical series '{label}' has {actual} hourly samples but {expected} were expected")]
    SeriesLength {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("Climate trajectory contains a non-finite temperature at hour {hour}")]
    NonFiniteTemperature { hour: usize },
    #[error("Sampled daily temperature range for day {day} stayed negative after {attempts} draws")]
    NegativeRange { day: usize, attempts: usize },
}

/// Aggregation was attempted over a batch with no successful runs.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
#[error("Cannot summarise a batch with zero successful runs")]
pub struct EmptyBatchError;
