use thiserror::Error;

/// Everything that can stop a trajectory from starting
///
/// Once a trajectory runs, faults are invariant violations and panic instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unknown pricing policy `{0}`")]
    UnknownPolicy(String),

    #[error("unknown explore/exploit variant `{0}`")]
    UnknownVariant(String),

    #[error("unknown sweep parameter `{0}`")]
    UnknownSweepParameter(String),

    #[error("pricing policy `{policy}` requires `{parameter}`")]
    MissingParameter {
        policy: &'static str,
        parameter: &'static str,
    },

    #[error("percentile table has no entry for load {load}%, depth {depth}")]
    TableGap { load: u32, depth: u32 },

    #[error("percentile table entry ({load}, {depth}) = {value} is outside 0..=100")]
    TableValue { load: u32, depth: u32, value: f64 },

    #[error("distribution `{name}`: {reason}")]
    Distribution { name: &'static str, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
