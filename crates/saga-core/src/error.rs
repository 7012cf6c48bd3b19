use thiserror::Error;

/// Typed failure conditions for engine operations.
///
/// Every failure is synchronous and local to the failing call: the
/// triggering operation performs no partial mutation, so prior state is
/// always intact afterwards.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("buffer not found: {0}")]
    BufferNotFound(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("version or tag not found: {0}")]
    RefNotFound(String),

    #[error("buffer already exists: {0}")]
    BufferExists(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("tag already exists: {0}")]
    TagExists(String),

    #[error("buffer {0} has uncommitted changes; commit or discard first")]
    DirtyState(String),

    #[error("nothing to commit in buffer {0}")]
    NothingToCommit(String),

    #[error("buffer item cap exceeded: {requested} items, cap is {limit}")]
    CapacityExceeded { requested: usize, limit: usize },

    #[error("branch limit reached: buffer already has {limit} branches")]
    BranchLimitExceeded { limit: usize },

    #[error("cannot rollback {steps} steps: only {available} available")]
    CannotRollback { steps: usize, available: usize },

    #[error("cannot delete the current branch: {0}")]
    IsCurrentBranch(String),

    #[error("the main branch cannot be deleted")]
    CannotDeleteMain,

    #[error("invalid name: {0}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
