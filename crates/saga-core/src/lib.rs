pub mod branch;
pub mod diff;
pub mod error;
pub mod id;
pub mod merge;
pub mod types;
pub mod version;

pub use branch::{validate_branch_name, validate_buffer_name, Branch};
pub use diff::{diff_contents, Diff, DiffEntry};
pub use error::{EngineError, Result};
pub use merge::{combine, Conflict, MergeResult, MergeStrategy};
pub use types::*;
pub use version::Version;
