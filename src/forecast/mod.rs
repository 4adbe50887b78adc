//! Forecasting collaborators
//!
//! The orchestrator only sees the [`Forecaster`] trait. The model itself is held in a
//! [`LazyModel`] owned by the caller, so it is built at most once per process and only
//! when a forecast actually has to be generated.

mod ar;

pub use ar::{ArForecaster, DEFAULT_ORDER};

use once_cell::unsync::OnceCell;
use thiserror::Error;

use crate::data::{ForecastTable, Series};

/// Number of months forecast by both binaries
pub const DEFAULT_HORIZON: usize = 120;

/// Errors raised by a forecasting model
#[derive(Debug, Error)]
pub enum ModelError {
    /// The model could not be constructed
    #[error("Model initialization failed: {0}")]
    Init(String),

    /// Not enough history to fit the model
    #[error("Need at least {needed} observations, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// The fit or the recursion produced unusable numbers
    #[error("Model fit failed: {0}")]
    FitFailed(String),
}

/// A model producing point and interval forecasts from a monthly series
pub trait Forecaster {
    /// Forecasts the `horizon` months following the last point of `series`
    fn forecast(&self, series: &Series, horizon: usize) -> Result<ForecastTable, ModelError>;
}

type ModelInit<M> = Box<dyn Fn() -> Result<M, ModelError>>;

/// A lazily-initialized model handle
///
/// The initializer runs on the first [`LazyModel::get`]; a successful result is kept for
/// the lifetime of the handle. A failed initialization is not cached, so a later call
/// retries.
pub struct LazyModel<M> {
    cell: OnceCell<M>,
    init: ModelInit<M>,
}

impl<M> LazyModel<M> {
    pub fn new(init: impl Fn() -> Result<M, ModelError> + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            init: Box::new(init),
        }
    }

    /// Wraps an already-built model
    pub fn ready(model: M) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(model);
        Self {
            cell,
            init: Box::new(|| Err(ModelError::Init("model handle was pre-built".to_string()))),
        }
    }

    /// Returns the model, building it on first use
    pub fn get(&self) -> Result<&M, ModelError> {
        self.cell.get_or_try_init(|| {
            tracing::info!("initializing forecasting model");
            (self.init)()
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_lazy_model_initializes_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handle = LazyModel::new(move || {
            counter.set(counter.get() + 1);
            Ok(ArForecaster::default())
        });

        assert!(!handle.is_initialized());
        assert!(handle.get().is_ok());
        assert!(handle.get().is_ok());
        assert!(handle.is_initialized());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_lazy_model_retries_after_failed_init() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let handle: LazyModel<ArForecaster> = LazyModel::new(move || {
            counter.set(counter.get() + 1);
            Err(ModelError::Init("weights unavailable".to_string()))
        });

        assert!(handle.get().is_err());
        assert!(handle.get().is_err());
        assert!(!handle.is_initialized());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_ready_handle_skips_initializer() {
        let handle = LazyModel::ready(ArForecaster::with_order(3));
        assert!(handle.is_initialized());
        assert_eq!(handle.get().unwrap().order(), 3);
    }
}
