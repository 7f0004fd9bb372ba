//! Synthetic survey observations of astrophysical transients
//!
//! Given a light-curve model, a parameter set, and a survey schedule, this
//! crate produces the noisy photometry a survey would record: one
//! observation per pointing, classified as a detection or an upper limit.
//!
//! ```no_run
//! use transient_simulator::{simulate, CadenceConfig, ParameterSet, SimulationConfig};
//!
//! let survey = CadenceConfig::new(60000.0)
//!     .with_band("g", 20, 2.0, 0.3, 24.5)
//!     .with_band("r", 20, 2.0, 0.3, 24.0);
//! let params = ParameterSet::new()
//!     .with("log10_f0", 0.5)
//!     .with("alpha", 1.2)
//!     .with("beta", 0.8);
//!
//! let config = SimulationConfig::new("power_law", params, survey)
//!     .with_explosion_time(59999.0)
//!     .with_seed(42);
//! let result = simulate(&config)?;
//! result.save("grb_demo")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod detection;
pub mod models;
pub mod observation;
pub mod photometry;
pub mod prior;
pub mod shared_args;
pub mod simulation;
pub mod storage;
pub mod survey;
pub mod transient;

pub use detection::{DetectionEngine, Measurement, DEFAULT_SNR_THRESHOLD};
pub use models::{ModelError, ModelOptions, ParameterSet, TransientModel};
pub use observation::{DataMode, ObservationRecord, SimulationResult};
pub use photometry::Band;
pub use prior::{default_prior, Distribution1D, Prior, PriorDict, PriorError};
pub use simulation::{
    simulate, simulate_population, ModelSource, PointingSource, SimulationConfig, SimulationError,
};
pub use storage::{SimulationStore, StorageError};
pub use survey::{CadenceConfig, Pointing, PointingTable, SurveyError};
pub use transient::TransientData;
