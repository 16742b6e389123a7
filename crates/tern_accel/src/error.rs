use thiserror::Error;

/// Rejected accelerator configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("leaf_threshold must be at least 1")]
    LeafThreshold,

    #[error("max_split_tries must be at least 2, got {0}")]
    SplitTries(usize),

    #[error("max_depth must be in 1..={limit}, got {depth}")]
    MaxDepth { depth: usize, limit: usize },
}

/// Errors that can occur when building an accelerator.
#[derive(Error, Debug)]
pub enum AccelError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for accelerator construction.
pub type AccelResult<T> = Result<T, AccelError>;
