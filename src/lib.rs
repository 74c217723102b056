//! Discrete-event simulator for hard real-time scheduling on a
//! multiprocessor, with first-class Mixed-Criticality support.

pub mod config;
pub mod engine;
pub mod error;
pub mod etm;
pub mod feasibility;
pub mod job;
pub mod monitor;
pub mod processor;
pub mod report;
pub mod scheduler;
pub mod task;
pub mod time;

pub use config::{BuiltSimulation, SimulationConfig};
pub use engine::Engine;
pub use error::{ConfigError, SimError};
pub use report::Report;
