use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulator.
///
/// `Configuration` errors are fatal at build time (spec §7: non-positive
/// period, `wcet > wcet_hi`, a non-MC task set under an MC scheduler, an
/// empty or non-positive Apriori trace). `Protocol` errors are fatal
/// mid-run: an internal invariant was broken (an ETM was asked about a job
/// it has no state for, a processor's running pointer disagreed with a
/// job's own `cpu` back-reference). The core never silently continues from
/// an inconsistent state, so these always abort the run rather than being
/// logged and ignored.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("task {0}: period must be > 0")]
    NonPositivePeriod(u32),

    #[error("task {0}: deadline must be > 0")]
    NonPositiveDeadline(u32),

    #[error("task {0}: wcet must be > 0")]
    NonPositiveWcet(u32),

    #[error("task {0}: wcet ({wcet}) must be <= wcet_hi ({wcet_hi})")]
    WcetExceedsWcetHi { task: u32, wcet: f64, wcet_hi: f64 },

    #[error("task {0} references unknown processor {1}")]
    UnknownProcessor(u32, u32),

    #[error("scheduler '{scheduler}' requires all tasks to be Mixed-Criticality, but task {task} is not")]
    NotMixedCriticality { scheduler: String, task: u32 },

    #[error("scheduler '{scheduler}' does not support Mixed-Criticality tasks, but task {task} is")]
    McNotAllowed { scheduler: String, task: u32 },

    #[error("task {0}: unrecognized criticality level '{1}' (expected LO or HI)")]
    InvalidCriticality(u32, String),

    #[error("apriori execution-time trace must be non-empty")]
    EmptyAprioriTrace,

    #[error("apriori execution-time trace entry must be > 0, found {0}")]
    NonPositiveAprioriEntry(f64),

    #[error("unknown etm kind '{0}'")]
    UnknownEtmKind(String),

    #[error("unknown scheduler kind '{0}'")]
    UnknownSchedulerKind(String),

    #[error("cycles_per_ms must be > 0")]
    NonPositiveCyclesPerMs,

    #[error("no processors configured")]
    NoProcessors,

    #[error("no tasks configured")]
    NoTasks,

    #[error("processor ids must be contiguous starting at 0, got {0:?}")]
    NonContiguousProcessorIds(Vec<u32>),

    #[error("task ids must be contiguous starting at 0, got {0:?}")]
    NonContiguousTaskIds(Vec<u32>),
}
